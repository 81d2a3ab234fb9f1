//! Scribe - shared document sync server
//!
//! Serves one shared rich-text document over WebSocket. Configuration comes
//! from `SCRIBE_*` environment variables, log filtering from `RUST_LOG`.

use anyhow::Context;
use collab::server::{CollaborationServer, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env().context("invalid server configuration")?;
    tracing::info!(
        "Starting Scribe on {} (typing timeout {:?})",
        config.socket_addr(),
        config.typing_timeout
    );

    let server = CollaborationServer::new(config);

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, shutting down");
                shutdown.shutdown();
            }
            Err(e) => tracing::error!("Failed to listen for interrupt: {}", e),
        }
    });

    server.run().await?;
    Ok(())
}
