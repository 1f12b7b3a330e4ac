//! Dashboard configuration
//!
//! Layered lowest to highest priority:
//! 1. Built-in defaults
//! 2. Secrets file (`secrets.toml`, override with `DASHBOARD_SECRETS_PATH`)
//! 3. Environment variables, `DASHBOARD__<SECTION>__<KEY>`
//!    (e.g. `DASHBOARD__WAREHOUSE__PASSWORD`)
//!
//! The secrets file mirrors the environment layout:
//!
//! ```toml
//! [warehouse]
//! host = "warehouse.internal"
//! account = "analytics"
//! user = "dashboard"
//! password = "..."
//! ```

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroUsize;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use warehouse_common::WarehouseConfig;

use crate::error::DashboardError;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DASHBOARD";

/// Environment variable naming the secrets file
pub const SECRETS_PATH_VAR: &str = "DASHBOARD_SECRETS_PATH";

/// Secrets file used when `DASHBOARD_SECRETS_PATH` is unset
pub const DEFAULT_SECRETS_PATH: &str = "secrets.toml";

/// Log directives used when `RUST_LOG` is unset or invalid
pub const DEFAULT_LOG_DIRECTIVES: &str = "transfers_dashboard=info,warehouse_common=info";

/// Log filter from `RUST_LOG`, falling back to [`DEFAULT_LOG_DIRECTIVES`]
pub fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES))
}

/// HTTP surface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Page title
    pub title: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8501,
            title: "Token Transfers Data".to_string(),
        }
    }
}

/// Query cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of distinct date ranges kept
    pub capacity: usize,
    /// Entry lifetime; 0 disables reuse
    pub ttl_seconds: u64,
}

impl CacheConfig {
    pub fn capacity(&self) -> Result<NonZeroUsize, DashboardError> {
        NonZeroUsize::new(self.capacity).ok_or_else(|| {
            DashboardError::Config("Cache capacity must be greater than 0".to_string())
        })
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 32,
            ttl_seconds: 600,
        }
    }
}

/// Complete dashboard configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub warehouse: WarehouseConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
}

impl DashboardConfig {
    /// Load from the secrets file named by `DASHBOARD_SECRETS_PATH` (or
    /// `secrets.toml`) and the environment.
    pub fn load() -> Result<Self, DashboardError> {
        let secrets_path =
            env::var(SECRETS_PATH_VAR).unwrap_or_else(|_| DEFAULT_SECRETS_PATH.to_string());
        Self::load_from(&secrets_path)
    }

    /// Load from an explicit secrets file path. A missing file is not an error;
    /// missing credentials are.
    pub fn load_from(secrets_path: &str) -> Result<Self, DashboardError> {
        let config = Config::builder()
            .add_source(Config::try_from(&DashboardConfig::default())?)
            .add_source(File::with_name(secrets_path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let dashboard_config: DashboardConfig = config.try_deserialize()?;
        dashboard_config.validate()?;

        Ok(dashboard_config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), DashboardError> {
        self.warehouse.validate()?;
        self.cache.capacity()?;
        self.socket_addr()?;
        Ok(())
    }

    /// Address the HTTP server binds to
    pub fn socket_addr(&self) -> Result<SocketAddr, DashboardError> {
        let ip: IpAddr = self.server.bind_address.parse().map_err(|e| {
            DashboardError::Config(format!(
                "Invalid bind address '{}': {}",
                self.server.bind_address, e
            ))
        })?;
        Ok(SocketAddr::new(ip, self.server.port))
    }
}
