//! fennecd - a small IRC-style chat daemon with DCC file transfers.

mod config;
mod error;
mod handlers;
mod network;
mod state;
mod transfer;

use crate::config::Config;
use crate::network::Gateway;
use crate::state::Engine;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(listen = %config.server.listen, "Starting fennecd");

    let engine = Arc::new(Engine::new(&config));

    // Periodic sweep for finished transfers
    let reaper_engine = Arc::clone(&engine);
    let reap_interval = Duration::from_secs(config.transfer.reap_interval);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(reap_interval);
        loop {
            ticker.tick().await;
            reaper_engine.transfers.reap();
        }
    });

    let gateway = Gateway::bind(config.server.listen, Arc::clone(&engine)).await?;
    tokio::select! {
        result = gateway.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!(
                active_transfers = engine.transfers.active_count(),
                "Shutting down"
            );
            engine.transfers.abort_all();
            Ok(())
        }
    }
}
