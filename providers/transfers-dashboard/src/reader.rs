//! Warehouse reader for token transfers
//!
//! Runs the single transfer query against the warehouse and labels the rows
//! with the positional transfer layout. One connection per fetch, released
//! when the blocking task returns on every path.

use async_trait::async_trait;
use duckdb::params_from_iter;
use duckdb::types::{TimeUnit, Value};
use tracing::{debug, error, info, instrument};
use warehouse_common::{
    connection::{create_warehouse_connection, ping},
    quote_identifier, DateRange, TransferRecord, WarehouseConfig, WarehouseError,
    BLOCK_TIMESTAMP_COLUMN, TRANSFER_COLUMN_COUNT,
};

/// Source of transfer records.
///
/// The dashboard only ever talks to the warehouse through this seam.
#[async_trait]
pub trait TransferSource: Send + Sync {
    /// Fetch every transfer inside `range`, or every transfer when `None`.
    ///
    /// Implementations log failures once and return them without retrying.
    async fn fetch_transfers(
        &self,
        range: Option<DateRange>,
    ) -> Result<Vec<TransferRecord>, WarehouseError>;

    /// Whether the warehouse currently answers
    async fn is_healthy(&self) -> bool;
}

/// SQL text plus positional parameters
#[derive(Debug, Clone)]
pub struct TransferQuery {
    pub sql: String,
    pub parameters: Vec<Value>,
}

impl TransferQuery {
    /// Build the transfer statement. The range predicate is always bound,
    /// never interpolated.
    pub fn new(qualified_table: &str, range: Option<&DateRange>) -> Self {
        match range {
            None => Self {
                sql: format!("SELECT * FROM {}", qualified_table),
                parameters: Vec::new(),
            },
            Some(range) => Self {
                sql: format!(
                    "SELECT * FROM {table} WHERE {col} >= ? AND {col} < ?",
                    table = qualified_table,
                    col = quote_identifier(BLOCK_TIMESTAMP_COLUMN),
                ),
                parameters: vec![
                    timestamp_param(range.lower_bound()),
                    timestamp_param(range.upper_bound_exclusive()),
                ],
            },
        }
    }
}

fn timestamp_param(ts: chrono::NaiveDateTime) -> Value {
    Value::Timestamp(TimeUnit::Microsecond, ts.and_utc().timestamp_micros())
}

/// DuckDB-backed transfer reader
pub struct TransferReader {
    config: WarehouseConfig,
}

impl TransferReader {
    /// Create a new reader
    pub fn new(config: WarehouseConfig) -> Self {
        Self { config }
    }

    /// Statement for the given range against the configured table
    pub fn query_for(&self, range: Option<&DateRange>) -> TransferQuery {
        TransferQuery::new(&self.config.qualified_table(), range)
    }

    fn fetch_sync(
        config: &WarehouseConfig,
        query: &TransferQuery,
    ) -> Result<Vec<TransferRecord>, WarehouseError> {
        let start = std::time::Instant::now();
        debug!("Executing transfer query: {}", query.sql);

        let conn = create_warehouse_connection(config)?;
        let mut stmt = conn.prepare(&query.sql)?;
        let mut rows = stmt.query(params_from_iter(query.parameters.iter()))?;

        let column_count = rows.as_ref().map(|s| s.column_count()).unwrap_or(0);
        if column_count != TRANSFER_COLUMN_COUNT {
            return Err(WarehouseError::QueryError(format!(
                "expected {} columns, warehouse returned {}",
                TRANSFER_COLUMN_COUNT, column_count
            )));
        }

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(TransferRecord::from_row(row, column_count)?);
        }

        info!(
            "Transfer query returned {} rows in {}ms",
            records.len(),
            start.elapsed().as_millis()
        );
        Ok(records)
    }
}

#[async_trait]
impl TransferSource for TransferReader {
    #[instrument(skip(self), fields(fetch_id = %uuid::Uuid::new_v4()))]
    async fn fetch_transfers(
        &self,
        range: Option<DateRange>,
    ) -> Result<Vec<TransferRecord>, WarehouseError> {
        let config = self.config.clone();
        let query = self.query_for(range.as_ref());

        let result = tokio::task::spawn_blocking(move || Self::fetch_sync(&config, &query))
            .await
            .unwrap_or_else(|e| {
                Err(WarehouseError::QueryError(format!(
                    "query task failed: {}",
                    e
                )))
            });

        if let Err(e) = &result {
            error!("Error loading token data: {}", e);
        }
        result
    }

    async fn is_healthy(&self) -> bool {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || {
            create_warehouse_connection(&config).and_then(|conn| ping(&conn))
        })
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false)
    }
}
