//! Warehouse connection management
//!
//! Every query opens its own DuckDB connection and drops it when done. There
//! is no pool and no connection outlives the request that created it.
//!
//! Remote warehouses are attached through the DuckDB postgres extension:
//! 1. Configure session settings (memory, threads, temp/extension directory)
//! 2. Install and load the postgres extension
//! 3. ATTACH the warehouse read-only under the account alias

use duckdb::{AccessMode, Config, Connection};
use tracing::{debug, info};

use crate::config::{WarehouseBackend, WarehouseConfig};
use crate::error::WarehouseError;
use crate::Result;

/// Open a read-only connection to the configured warehouse.
///
/// Failures are returned as `ConnectionError` and only logged at debug level
/// here; the caller owns error reporting.
pub fn create_warehouse_connection(config: &WarehouseConfig) -> Result<Connection> {
    config.validate()?;
    info!(">>> CONN: Opening warehouse connection: {}", config.describe());

    let conn = match config.backend {
        WarehouseBackend::Local => open_local(config)?,
        WarehouseBackend::Postgres => attach_postgres(config)?,
    };

    info!(">>> CONN: ✓ Warehouse connection established");
    Ok(conn)
}

fn open_local(config: &WarehouseConfig) -> Result<Connection> {
    let path = config.path.as_deref().unwrap_or_default();

    let flags = Config::default()
        .access_mode(AccessMode::ReadOnly)
        .map_err(connection_error("Failed to build DuckDB config"))?;
    let conn = Connection::open_with_flags(path, flags)
        .map_err(connection_error("Failed to open DuckDB database"))?;

    configure_session(&conn, config, false)?;
    Ok(conn)
}

fn attach_postgres(config: &WarehouseConfig) -> Result<Connection> {
    let conn = Connection::open_in_memory()
        .map_err(connection_error("Failed to create DuckDB connection"))?;

    // extension_directory must be set before INSTALL; containers often lack a writable HOME
    configure_session(&conn, config, true)?;

    debug!(">>> CONN: Installing postgres extension...");
    conn.execute_batch("INSTALL postgres; LOAD postgres;")
        .map_err(connection_error("Failed to load postgres extension"))?;

    // ATTACH takes no bind parameters, the connection string is escaped as a literal
    let attach_sql = format!(
        "ATTACH '{}' AS {} (TYPE postgres, READ_ONLY);",
        config.connection_string().replace('\'', "''"),
        config.catalog_alias()
    );
    conn.execute_batch(&attach_sql)
        .map_err(connection_error("Failed to attach warehouse"))?;
    debug!(">>> CONN: ✓ Warehouse attached as {}", config.catalog_alias());

    Ok(conn)
}

fn configure_session(
    conn: &Connection,
    config: &WarehouseConfig,
    with_extensions: bool,
) -> Result<()> {
    let mut settings = format!(
        "SET memory_limit = '{}MB';
         SET threads = {};
         SET temp_directory = '{}';",
        config.memory_limit_mb,
        config.threads,
        config.temp_directory.replace('\'', "''")
    );
    if with_extensions {
        settings.push_str(&format!(
            "SET extension_directory = '{}/.duckdb_extensions';",
            config.temp_directory.replace('\'', "''")
        ));
    }

    conn.execute_batch(&settings)
        .map_err(connection_error("Failed to configure DuckDB"))?;
    debug!(
        ">>> CONN: ✓ DuckDB settings configured (memory={}MB, threads={})",
        config.memory_limit_mb, config.threads
    );
    Ok(())
}

/// Run a trivial statement to check the warehouse answers
pub fn ping(conn: &Connection) -> Result<()> {
    conn.execute_batch("SELECT 1;")?;
    Ok(())
}

fn connection_error(step: &'static str) -> impl Fn(duckdb::Error) -> WarehouseError {
    move |e| {
        debug!(">>> CONN: {} failed: {}", step, e);
        WarehouseError::ConnectionError(format!("{}: {}", step, e))
    }
}
