//! Publishes database coordinates into a [`DynamicPropertyRegistry`].
//!
//! Bootstrap may evaluate the registered suppliers before any lifecycle hook
//! has started the container, so registration starts it first. The suppliers
//! are plain projections of the container handle.

use std::sync::Arc;

use crate::container::DatabaseContainer;
use crate::error::HarnessResult;
use crate::registry::DynamicPropertyRegistry;

pub const DATASOURCE_URL: &str = "datasource.url";
pub const DATASOURCE_USERNAME: &str = "datasource.username";
pub const DATASOURCE_PASSWORD: &str = "datasource.password";

/// Ensure `container` is running, then register the datasource suppliers.
///
/// A start failure is returned as is and nothing is registered.
pub async fn register_datasource_properties<C>(
    container: &Arc<C>,
    registry: &mut DynamicPropertyRegistry,
) -> HarnessResult<()>
where
    C: DatabaseContainer + 'static,
{
    if !container.is_running() {
        tracing::info!("database container not running yet, starting it before registration");
        container.start().await?;
    }

    let c = Arc::clone(container);
    registry.add(DATASOURCE_URL, move || c.jdbc_url());
    let c = Arc::clone(container);
    registry.add(DATASOURCE_USERNAME, move || c.username());
    let c = Arc::clone(container);
    registry.add(DATASOURCE_PASSWORD, move || c.password());

    Ok(())
}
