//! Transfers Dashboard binary entry point
//!
//! Loads configuration once, builds the dashboard and serves it until
//! SIGINT.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*};

use transfers_dashboard::{config::log_filter, DashboardConfig, TransfersDashboard};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        // A missing .env is normal outside local development
        if !e.not_found() {
            eprintln!("Failed to read .env: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(log_filter())
        .init();

    info!("═══════════════════════════════════════════════════════════════");
    info!("  Token Transfers Dashboard - Starting");
    info!("  v{}", env!("CARGO_PKG_VERSION"));
    info!("═══════════════════════════════════════════════════════════════");

    let config = DashboardConfig::load().context("Failed to load dashboard configuration")?;
    let addr = config.socket_addr()?;

    info!("[MAIN] Warehouse: {}", config.warehouse.describe());
    info!(
        "[MAIN] Cache: {} entries, TTL {}s",
        config.cache.capacity, config.cache.ttl_seconds
    );

    let dashboard = Arc::new(
        TransfersDashboard::with_config(&config).context("Failed to create dashboard")?,
    );

    if !dashboard.is_healthy().await {
        warn!("[MAIN] Warehouse is not reachable yet; pages will show the error until it is");
    }

    dashboard
        .start(addr)
        .await
        .context("Dashboard server error")?;

    info!("═══════════════════════════════════════════════════════════════");
    info!("  SHUTDOWN COMPLETE");
    info!("═══════════════════════════════════════════════════════════════");

    Ok(())
}
