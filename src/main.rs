//! Cube Relay Server
//!
//! WebSocket relay for the multiplayer cube demo. Keeps every browser
//! client's view of the other players in sync.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cube_relay::{PlayerRegistry, RelayConfig, ServerConfig, WebSocketServer, CONFIG_FILE};

/// Cube Relay Server
///
/// WebSocket relay for multiplayer player state
#[derive(Parser, Debug)]
#[command(name = "cube-relay")]
#[command(version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Path to the relay configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging, RUST_LOG takes precedence over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Cube Relay v{}", env!("CARGO_PKG_VERSION"));

    if !args.config.exists() {
        warn!(
            "Config file {} not found, using built-in map",
            args.config.display()
        );
    }
    let relay_config = RelayConfig::load(&args.config)?;
    info!(
        "{} spawn points, {} objectives, respawn cooldown {}ms, join policy {:?}",
        relay_config.spawn_points.len(),
        relay_config.objectives.len(),
        relay_config.respawn_cooldown_ms,
        relay_config.join_policy
    );

    let registry = Arc::new(PlayerRegistry::new(&relay_config));
    let server_config = ServerConfig::new(args.bind, args.port);

    // Create and start the WebSocket server
    let server = Arc::new(WebSocketServer::new(server_config, registry));
    let server_handle = Arc::clone(&server);

    // Spawn shutdown signal handler
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Initiating graceful shutdown...");
        server_handle.shutdown();
    });

    // Run the server
    server.run().await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
