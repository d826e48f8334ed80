//! Integration-test infrastructure for the Pokedex platform.
//!
//! - [`container`]: ephemeral PostgreSQL lifecycle (testcontainers).
//! - [`registry`]: key → supplier map consulted during context bootstrap.
//! - [`bridge`]: publishes container coordinates into the registry,
//!   starting the container first when needed.
//! - [`harness`]: boots a full `ApplicationContext` against the container.

pub mod bridge;
pub mod container;
pub mod error;
pub mod harness;
pub mod registry;
pub mod settings;

#[cfg(test)]
mod testing;

pub use bridge::register_datasource_properties;
pub use container::{Coordinates, DatabaseContainer, PostgresContainer};
pub use error::{HarnessError, HarnessResult};
pub use harness::{HarnessBuilder, IntegrationHarness};
pub use registry::DynamicPropertyRegistry;
pub use settings::{ContainerSettings, ImageRef};
