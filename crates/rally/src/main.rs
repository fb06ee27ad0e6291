use rally::{RallyServerBuilder, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), rally::RallyError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::load()?;
    tracing::info!(
        listen_addr = %config.listen_addr,
        status_addr = ?config.status_addr,
        "Rally server starting"
    );

    let server = RallyServerBuilder::from_config(&config).build().await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    }
}
