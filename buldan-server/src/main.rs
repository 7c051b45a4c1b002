//! Buldan Server
//!
//! Serves the word game over WebSocket until Ctrl-C.

use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use buldan::{network::GameServer, ServerConfig, VERSION};

/// How long open connections get to flush the shutdown notice.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    info!("Buldan Server v{}", VERSION);
    info!(
        "Event queue capacity: {}, max connections: {}",
        config.event_queue_capacity, config.max_connections
    );

    let server = GameServer::new(config);

    tokio::select! {
        result = server.run() => {
            result.context("game server stopped")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            info!("Ctrl-C received, shutting down");
            server.shutdown();
            if !server.drain(SHUTDOWN_GRACE).await {
                warn!("Closing with {} connections still open", server.connection_count().await);
            }
        }
    }

    Ok(())
}
