//! Token Transfers Dashboard
//!
//! Browser dashboard over the warehouse token transfer table.
//!
//! This provider:
//! - Runs `SELECT *` against `EZ_TOKEN_TRANSFERS`, optionally restricted to a
//!   date range bound as query parameters
//! - Shows the rows as a table, or rolls them up per hour into a bar+line chart
//! - Caches result sets per date range with a capacity and TTL bound
//! - Serves JSON copies of both views and a health check
//!
//! Configuration via `secrets.toml` or environment variables:
//! - DASHBOARD__WAREHOUSE__*: warehouse host, account, credentials, schema
//! - DASHBOARD__SERVER__*: bind address, port, page title
//! - DASHBOARD__CACHE__*: cache capacity and TTL

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod error;
pub mod presenter;
pub mod provider;
pub mod reader;
pub mod server;
pub mod state;

pub use aggregator::{aggregate_hourly, HourlyBucket};
pub use cache::{CacheStats, QueryCache, TransferSet};
pub use config::{CacheConfig, DashboardConfig, ServerConfig};
pub use error::DashboardError;
pub use presenter::Presenter;
pub use provider::TransfersDashboard;
pub use reader::{TransferQuery, TransferReader, TransferSource};
pub use state::{DisplayData, DisplayMode, ViewQuery, ViewState};

// Re-export common types
pub use warehouse_common::{
    DateRange, TransferRecord, WarehouseBackend, WarehouseConfig, WarehouseError,
};
