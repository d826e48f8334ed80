//! Application bootstrap.
//!
//! Resolves configuration, wires the optional datasource subsystems and
//! builds the router. A fully initialized [`ApplicationContext`] is the
//! handle the binary serves and the integration tests assert on.

use std::future::Future;

use axum::Router;
use figment::Provider;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::config::{ConfigError, ConfigLoader, DataSourceConfig, PlatformConfig, Subsystem};
use crate::db;
use crate::routes;
use crate::state::AppState;

/// Any failure while initializing the application context.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("datasource.url is not set and the datasource is not excluded")]
    MissingDataSourceUrl,

    #[error("datasource unavailable: {0}")]
    DataSource(#[source] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[source] sqlx::Error),

    #[error("schema validation failed: {0}")]
    SchemaCheck(#[source] sqlx::Error),

    #[error("schema validation failed: missing tables {0:?}")]
    MissingTables(Vec<String>),
}

/// The wired application.
pub struct ApplicationContext {
    state: AppState,
    router: Router,
}

impl ApplicationContext {
    /// Load configuration through `loader` with `overrides` on top, then
    /// initialize.
    pub async fn initialize(
        loader: &ConfigLoader,
        overrides: impl Provider,
    ) -> Result<Self, ContextError> {
        let config = loader.load(overrides)?;
        Self::from_config(config).await
    }

    /// Initialize from an already resolved configuration.
    pub async fn from_config(config: PlatformConfig) -> Result<Self, ContextError> {
        tracing::info!(
            profile = ?config.profile,
            excluded = ?config.autoconfigure.exclude,
            policy = ?config.security.policy,
            "initializing application context"
        );

        let pool = if config.is_enabled(Subsystem::DataSource) {
            if config.datasource.configured_url().is_none() {
                return Err(ContextError::MissingDataSourceUrl);
            }
            Some(wire_datasource(&config, &config.datasource).await?)
        } else {
            tracing::info!("datasource excluded by autoconfigure.exclude");
            None
        };

        let state = match pool {
            Some(pool) => AppState::with_pool(config, pool),
            None => AppState::without_datasource(config),
        };
        let router = routes::build_router(state.clone());

        tracing::info!("application context initialized");
        Ok(Self { state, router })
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.state.config
    }

    pub fn pool(&self) -> Option<&PgPool> {
        self.state.pool.as_ref()
    }

    /// A clone of the router, ready for `oneshot` or `axum::serve`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` resolves, then close the pool.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(shutdown)
            .await?;
        self.close().await;
        Ok(())
    }

    /// Release the datasource, if any.
    pub async fn close(&self) {
        if let Some(pool) = &self.state.pool {
            pool.close().await;
            tracing::info!("datasource closed");
        }
    }
}

async fn wire_datasource(
    config: &PlatformConfig,
    datasource: &DataSourceConfig,
) -> Result<PgPool, ContextError> {
    tracing::info!(
        max_connections = datasource.max_connections,
        "connecting to PostgreSQL"
    );
    let pool = db::connect(datasource)
        .await
        .map_err(ContextError::DataSource)?;

    if config.is_enabled(Subsystem::Migration) {
        db::migrate(&pool).await.map_err(ContextError::Migration)?;
    }

    if config.is_enabled(Subsystem::Orm) {
        let missing = db::validate_schema(&pool)
            .await
            .map_err(ContextError::SchemaCheck)?;
        if !missing.is_empty() {
            return Err(ContextError::MissingTables(missing));
        }
    }

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Figment;
    use figment::providers::{Format, Serialized, Toml};

    const NO_DATABASE: &str = "datasource,orm,migration";

    fn loader() -> ConfigLoader {
        ConfigLoader::new("/nonexistent/pdx-config").with_env(false)
    }

    fn overrides(pairs: &[(&str, &str)]) -> Figment {
        pairs.iter().fold(Figment::new(), |figment, (key, value)| {
            figment.merge(Serialized::default(key, value))
        })
    }

    #[tokio::test]
    async fn missing_url_fails_initialization() {
        let err = ApplicationContext::from_config(PlatformConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ContextError::MissingDataSourceUrl));
    }

    #[tokio::test]
    async fn excluded_datasource_boots_without_url() {
        let exclude = overrides(&[("autoconfigure.exclude", NO_DATABASE)]);
        let context = ApplicationContext::initialize(&loader(), exclude)
            .await
            .unwrap();
        assert!(context.pool().is_none());
        assert_eq!(context.config().server.port, 8080);
    }

    #[tokio::test]
    async fn excluded_datasource_is_not_connected() {
        // Unreachable port: connecting would fail if the datasource were wired.
        let context = ApplicationContext::initialize(
            &loader(),
            overrides(&[
                ("datasource.url", "postgres://nobody@127.0.0.1:1/none"),
                ("autoconfigure.exclude", NO_DATABASE),
            ]),
        )
        .await
        .unwrap();
        assert!(context.pool().is_none());
    }

    #[tokio::test]
    async fn invalid_configuration_fails_initialization() {
        let bad_port = overrides(&[("server.port", "not-a-port")]);
        let err = ApplicationContext::initialize(&loader(), bad_port)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ContextError::Config(_)));
    }

    #[tokio::test]
    async fn failing_override_provider_fails_initialization() {
        let broken = Figment::from(Toml::string("[datasource\nurl = "));
        let err = ApplicationContext::initialize(&loader(), broken)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ContextError::Config(ConfigError::Load(_))));
    }
}
