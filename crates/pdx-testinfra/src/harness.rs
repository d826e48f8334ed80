//! Boots a full application context against a harness-owned database.
//!
//! Order of operations mirrors a test-class lifecycle:
//!
//! 1. static properties are registered,
//! 2. the bridge starts the container (if needed) and registers its
//!    coordinates,
//! 3. the `on_container_ready` hook runs,
//! 4. the context initializes, reading the registry before any other
//!    configuration source.

use std::path::PathBuf;
use std::sync::Arc;

use pdx_platform::config::ConfigLoader;
use pdx_platform::context::ApplicationContext;

use crate::bridge::register_datasource_properties;
use crate::container::{DatabaseContainer, PostgresContainer};
use crate::error::{HarnessError, HarnessResult};
use crate::registry::DynamicPropertyRegistry;

/// Profile activated by default for integration tests.
pub const TEST_PROFILE: &str = "test";

/// Configuration directory shipped with `pdx-platform`.
pub fn platform_config_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../pdx-platform/config"))
}

type ReadyHook<C> = Box<dyn FnOnce(&C) + Send>;

pub struct HarnessBuilder<C = PostgresContainer> {
    container: Arc<C>,
    read_env: bool,
    properties: Vec<(String, String)>,
    on_container_ready: Option<ReadyHook<C>>,
}

impl HarnessBuilder<PostgresContainer> {
    /// PostgreSQL configured from `TEST_DATASOURCE_*`, `test` profile.
    pub fn postgres() -> Self {
        Self::with_container(Arc::new(PostgresContainer::from_env()))
    }
}

impl<C> HarnessBuilder<C>
where
    C: DatabaseContainer + 'static,
{
    pub fn with_container(container: Arc<C>) -> Self {
        Self {
            container,
            read_env: true,
            properties: Vec::new(),
            on_container_ready: None,
        }
    }

    /// Toggle the environment-variable configuration layer.
    pub fn read_env(mut self, read_env: bool) -> Self {
        self.read_env = read_env;
        self
    }

    /// Static property, registered before the datasource suppliers.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    /// Runs once the container is verified running, before the context
    /// initializes.
    pub fn on_container_ready(mut self, hook: impl FnOnce(&C) + Send + 'static) -> Self {
        self.on_container_ready = Some(Box::new(hook));
        self
    }

    pub async fn boot(self) -> HarnessResult<IntegrationHarness<C>> {
        let mut registry = DynamicPropertyRegistry::new();
        for (key, value) in self.properties {
            registry.add_value(key, value);
        }

        register_datasource_properties(&self.container, &mut registry).await?;
        if !self.container.is_running() {
            return Err(HarnessError::NotStarted("running container"));
        }
        if let Some(hook) = self.on_container_ready {
            hook(self.container.as_ref());
        }
        registry.validate()?;

        let loader = ConfigLoader::new(platform_config_dir())
            .with_profile(TEST_PROFILE)
            .with_env(self.read_env);
        let context = ApplicationContext::initialize(&loader, registry.clone()).await?;

        Ok(IntegrationHarness {
            container: self.container,
            registry,
            context,
        })
    }
}

/// A booted application plus the database it runs against.
pub struct IntegrationHarness<C = PostgresContainer> {
    container: Arc<C>,
    registry: DynamicPropertyRegistry,
    context: ApplicationContext,
}

impl<C> IntegrationHarness<C>
where
    C: DatabaseContainer + 'static,
{
    pub fn context(&self) -> &ApplicationContext {
        &self.context
    }

    pub fn container(&self) -> &Arc<C> {
        &self.container
    }

    pub fn registry(&self) -> &DynamicPropertyRegistry {
        &self.registry
    }

    /// Close the context's datasource, then stop the container.
    pub async fn shutdown(self) -> HarnessResult<()> {
        self.context.close().await;
        self.container.stop().await
    }
}
