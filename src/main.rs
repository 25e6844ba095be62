use std::sync::Arc;

use anyhow::anyhow;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ant_arena_server::metrics::Metrics;
use ant_arena_server::{GameServer, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Ant Arena Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ServerConfig::load_or_default();
    config.validate().map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    info!(
        "Configuration loaded: {}:{}, grid {}x{}, tick {:?}, max_players={}",
        config.bind_address,
        config.port,
        config.game.grid_width,
        config.game.grid_height,
        config.game.tick_interval,
        config.game.max_players
    );
    if config.allowed_origins.is_empty() {
        info!("No origin allow-list configured, accepting any origin");
    }

    let metrics = Arc::new(Metrics::new());
    let server = GameServer::new(config, metrics);
    info!("Server ready on ws://{}/ws", server.bind_addr());

    // Shutdown signal handler
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    if let Err(e) = server.run(shutdown).await {
        error!("Server error: {}", e);
        return Err(e);
    }

    info!("Server stopped");
    Ok(())
}
