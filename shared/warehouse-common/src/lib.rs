//! Warehouse Common Library
//!
//! Shared configuration, connection handling, table layout and record types
//! for reading token transfers from the warehouse. The dashboard provider
//! builds on these; nothing here holds state between queries.

pub mod config;
pub mod connection;
pub mod error;
pub mod schemas;
pub mod types;

// Re-export commonly used types
pub use config::{WarehouseBackend, WarehouseConfig};
pub use connection::{create_warehouse_connection, ping};
pub use error::WarehouseError;
pub use schemas::{
    create_token_transfers_table_sql, quote_identifier, validate_identifier,
    BLOCK_TIMESTAMP_COLUMN, TOKEN_TRANSFERS_TABLE, TRANSFER_COLUMNS, TRANSFER_COLUMN_COUNT,
};
pub use types::{DateRange, TransferRecord, DATE_FORMAT};

/// Result type alias for warehouse operations
pub type Result<T> = std::result::Result<T, WarehouseError>;
