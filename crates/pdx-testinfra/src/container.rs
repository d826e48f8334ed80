//! Ephemeral PostgreSQL container lifecycle.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::Mutex;

use crate::error::{HarnessError, HarnessResult};
use crate::settings::ContainerSettings;

const POSTGRES_PORT: u16 = 5432;

/// Lifecycle and coordinates of a database the harness owns.
///
/// `start` and `stop` are serialized by the implementation; coordinate
/// accessors are cheap and may be called from any thread once started.
#[async_trait]
pub trait DatabaseContainer: Send + Sync {
    /// Start the database and block until it accepts connections. A no-op
    /// when already running.
    async fn start(&self) -> HarnessResult<()>;

    fn is_running(&self) -> bool;

    /// `jdbc:postgresql://<host>:<port>/<database>`.
    fn jdbc_url(&self) -> HarnessResult<String>;

    fn username(&self) -> HarnessResult<String>;

    fn password(&self) -> HarnessResult<String>;

    /// Terminate the database and release its resources. Idempotent.
    async fn stop(&self) -> HarnessResult<()>;
}

/// Where a started database can be reached.
#[derive(Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinates")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Coordinates {
    pub fn jdbc_url(&self) -> String {
        format!(
            "jdbc:postgresql://{}:{}/{}",
            self.host, self.port, self.database
        )
    }
}

/// PostgreSQL in a testcontainers-managed Docker container.
pub struct PostgresContainer {
    settings: ContainerSettings,
    container: Mutex<Option<ContainerAsync<Postgres>>>,
    coordinates: RwLock<Option<Coordinates>>,
}

impl PostgresContainer {
    pub fn new(settings: ContainerSettings) -> Self {
        Self {
            settings,
            container: Mutex::new(None),
            coordinates: RwLock::new(None),
        }
    }

    /// Container configured from `TEST_DATASOURCE_*`.
    pub fn from_env() -> Self {
        Self::new(ContainerSettings::from_env())
    }

    fn project<T>(
        &self,
        what: &'static str,
        f: impl FnOnce(&Coordinates) -> T,
    ) -> HarnessResult<T> {
        self.coordinates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(f)
            .ok_or(HarnessError::NotStarted(what))
    }
}

#[async_trait]
impl DatabaseContainer for PostgresContainer {
    async fn start(&self) -> HarnessResult<()> {
        let mut guard = self.container.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        tracing::info!(
            image = %self.settings.image,
            database = %self.settings.database,
            "starting PostgreSQL container"
        );
        let container = Postgres::default()
            .with_db_name(&self.settings.database)
            .with_user(&self.settings.username)
            .with_password(&self.settings.password)
            .with_name(self.settings.image.name.clone())
            .with_tag(self.settings.image.tag.clone())
            .start()
            .await
            .map_err(HarnessError::environment)?;

        let host = container
            .get_host()
            .await
            .map_err(HarnessError::environment)?
            .to_string();
        let port = container
            .get_host_port_ipv4(POSTGRES_PORT)
            .await
            .map_err(HarnessError::environment)?;
        tracing::info!(%host, port, "PostgreSQL container ready");

        *self
            .coordinates
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Coordinates {
            host,
            port,
            database: self.settings.database.clone(),
            username: self.settings.username.clone(),
            password: self.settings.password.clone(),
        });
        *guard = Some(container);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.coordinates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn jdbc_url(&self) -> HarnessResult<String> {
        self.project("jdbc url", Coordinates::jdbc_url)
    }

    fn username(&self) -> HarnessResult<String> {
        self.project("username", |c| c.username.clone())
    }

    fn password(&self) -> HarnessResult<String> {
        self.project("password", |c| c.password.clone())
    }

    async fn stop(&self) -> HarnessResult<()> {
        let mut guard = self.container.lock().await;
        self.coordinates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(container) = guard.take() {
            tracing::info!(id = container.id(), "removing PostgreSQL container");
            container.rm().await.map_err(HarnessError::environment)?;
        }
        Ok(())
    }
}
