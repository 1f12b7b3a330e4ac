//! Error types for warehouse access

use thiserror::Error;

/// Warehouse operation errors
///
/// The first three variants are the failure taxonomy surfaced to dashboard
/// users. `Config` only occurs at start-up.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WarehouseError {
    /// Cannot reach or authenticate to the warehouse
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Statement execution, fetch or row decoding error
    #[error("Query error: {0}")]
    QueryError(String),

    /// Malformed or inverted date range
    #[error("Filter error: {0}")]
    FilterError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl WarehouseError {
    /// Whether the failure originated in the warehouse itself (as opposed to
    /// user input or configuration).
    pub fn is_warehouse_failure(&self) -> bool {
        matches!(
            self,
            WarehouseError::ConnectionError(_) | WarehouseError::QueryError(_)
        )
    }

    /// Human-readable message shown on the dashboard
    pub fn user_message(&self) -> String {
        match self {
            WarehouseError::ConnectionError(cause) => {
                format!("Could not connect to the warehouse: {}", cause)
            }
            WarehouseError::QueryError(cause) => {
                format!("Failed to load token transfers: {}", cause)
            }
            WarehouseError::FilterError(cause) => format!("Invalid date range: {}", cause),
            WarehouseError::ConfigError(cause) => {
                format!("Dashboard is misconfigured: {}", cause)
            }
        }
    }
}

// Statement-level DuckDB failures. Connection set-up maps its own errors
// explicitly to `ConnectionError`.
impl From<duckdb::Error> for WarehouseError {
    fn from(err: duckdb::Error) -> Self {
        WarehouseError::QueryError(err.to_string())
    }
}
