//! Shared application state for the Axum server.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::PlatformConfig;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Resolved configuration.
    pub config: Arc<PlatformConfig>,
    /// PostgreSQL connection pool (None when the datasource is excluded).
    pub pool: Option<PgPool>,
}

impl AppState {
    /// State backed by a PostgreSQL pool.
    pub fn with_pool(config: PlatformConfig, pool: PgPool) -> Self {
        Self {
            config: Arc::new(config),
            pool: Some(pool),
        }
    }

    /// State without a datasource.
    pub fn without_datasource(config: PlatformConfig) -> Self {
        Self {
            config: Arc::new(config),
            pool: None,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::without_datasource(PlatformConfig::default())
    }
}
