//! Warehouse connection configuration
//!
//! Built once at process start (see the dashboard's config loader) and passed
//! by reference into every connection. Credentials are never defaulted; they
//! come from the secrets file or the environment.
//!
//! ## Backends
//!
//! - `postgres`: a Postgres-protocol warehouse attached read-only through the
//!   DuckDB postgres extension. The account identifier becomes the catalog
//!   alias and the compute-resource name is reported as `application_name`.
//! - `local`: a DuckDB database file opened read-only.

use serde::{Deserialize, Serialize};

use crate::error::WarehouseError;
use crate::schemas::{quote_identifier, validate_identifier, TOKEN_TRANSFERS_TABLE};

/// Which engine serves the transfer table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseBackend {
    #[default]
    Postgres,
    Local,
}

/// Warehouse configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub backend: WarehouseBackend,

    // Remote warehouse
    /// Warehouse host
    pub host: String,
    /// Warehouse port
    pub port: u16,
    /// Account identifier, used as the attached catalog name
    pub account: String,
    /// Login user
    pub user: String,
    /// Login password
    #[serde(skip_serializing)]
    pub password: String,
    /// Database holding the transfer schema
    pub database: String,
    /// Schema holding the transfer table
    pub schema: String,
    /// Compute resource the session is attributed to
    pub compute_warehouse: String,
    /// Transfer table name
    pub table: String,

    // Local warehouse
    /// DuckDB database file for the `local` backend
    pub path: Option<String>,

    // DuckDB settings
    /// Memory limit in MB per connection
    pub memory_limit_mb: usize,
    /// Number of threads per connection
    pub threads: usize,
    /// Temporary directory for DuckDB spill files and extensions
    pub temp_directory: String,
}

impl WarehouseConfig {
    /// Configuration for a local DuckDB file using the default schema/table names
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            backend: WarehouseBackend::Local,
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), WarehouseError> {
        validate_identifier(&self.schema)?;
        validate_identifier(&self.table)?;

        if self.memory_limit_mb == 0 {
            return Err(WarehouseError::ConfigError(
                "Memory limit must be greater than 0".to_string(),
            ));
        }
        if self.threads == 0 {
            return Err(WarehouseError::ConfigError(
                "Thread count must be greater than 0".to_string(),
            ));
        }

        match self.backend {
            WarehouseBackend::Local => {
                if self.path.as_deref().map(str::is_empty).unwrap_or(true) {
                    return Err(WarehouseError::ConfigError(
                        "Local warehouse requires a database path".to_string(),
                    ));
                }
            }
            WarehouseBackend::Postgres => {
                let required = [
                    ("host", &self.host),
                    ("account", &self.account),
                    ("user", &self.user),
                    ("password", &self.password),
                    ("database", &self.database),
                ];
                for (name, value) in required {
                    if value.is_empty() {
                        return Err(WarehouseError::ConfigError(format!(
                            "Warehouse {} cannot be empty",
                            name
                        )));
                    }
                }
                if self.port == 0 {
                    return Err(WarehouseError::ConfigError(
                        "Warehouse port must be greater than 0".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// libpq keyword/value connection string for the postgres backend
    pub fn connection_string(&self) -> String {
        [
            ("host", self.host.clone()),
            ("port", self.port.to_string()),
            ("dbname", self.database.clone()),
            ("user", self.user.clone()),
            ("password", self.password.clone()),
            ("application_name", self.compute_warehouse.clone()),
        ]
        .iter()
        .map(|(key, value)| format!("{}={}", key, libpq_quote(value)))
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Catalog alias the remote warehouse is attached under
    pub fn catalog_alias(&self) -> String {
        quote_identifier(&self.account)
    }

    /// Fully qualified, quoted transfer table reference
    pub fn qualified_table(&self) -> String {
        let schema_table = format!(
            "{}.{}",
            quote_identifier(&self.schema),
            quote_identifier(&self.table)
        );
        match self.backend {
            WarehouseBackend::Postgres => format!("{}.{}", self.catalog_alias(), schema_table),
            WarehouseBackend::Local => schema_table,
        }
    }

    /// Short description for logs (never includes credentials)
    pub fn describe(&self) -> String {
        match self.backend {
            WarehouseBackend::Postgres => format!(
                "postgres://{}@{}:{}/{} as {} [{}]",
                self.user, self.host, self.port, self.database, self.account, self.compute_warehouse
            ),
            WarehouseBackend::Local => {
                format!("duckdb://{}", self.path.as_deref().unwrap_or_default())
            }
        }
    }
}

fn libpq_quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            backend: WarehouseBackend::Postgres,
            host: "localhost".to_string(),
            port: 5432,
            account: "warehouse".to_string(),
            user: String::new(),
            password: String::new(),
            database: "ALLIUM_ASSIGNMENT".to_string(),
            schema: "TOKEN_TRANSFERS".to_string(),
            compute_warehouse: "COMPUTE_WH".to_string(),
            table: TOKEN_TRANSFERS_TABLE.to_string(),
            path: None,
            memory_limit_mb: 512,
            threads: 4,
            temp_directory: "/tmp/transfers-dashboard".to_string(),
        }
    }
}

impl std::fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("compute_warehouse", &self.compute_warehouse)
            .field("table", &self.table)
            .field("path", &self.path)
            .field("memory_limit_mb", &self.memory_limit_mb)
            .field("threads", &self.threads)
            .field("temp_directory", &self.temp_directory)
            .finish()
    }
}
