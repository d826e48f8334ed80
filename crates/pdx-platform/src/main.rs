//! Pokedex platform — liveness and actuator HTTP service.
//!
//! Configuration is profile-selected (`PLATFORM_PROFILE`) and read from
//! `PLATFORM_CONFIG_DIR` (default `config/`), overridable by `PLATFORM_*`
//! environment variables. The datasource needs `datasource.url` unless
//! `autoconfigure.exclude` switches it off.

use figment::Figment;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use pdx_platform::config::ConfigLoader;
use pdx_platform::context::ApplicationContext;
use pdx_platform::shutdown;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "pdx-platform starting");

    let loader = ConfigLoader::from_env();
    let context = ApplicationContext::initialize(&loader, Figment::new()).await?;

    let addr = context.config().server.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    context.serve(listener, shutdown::signal()).await?;

    tracing::info!("pdx-platform stopped");
    Ok(())
}
