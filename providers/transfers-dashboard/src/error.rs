//! Error types for the dashboard service

use thiserror::Error;
use warehouse_common::WarehouseError;

/// Dashboard errors
#[derive(Error, Debug)]
pub enum DashboardError {
    /// Warehouse, filter or warehouse-config failure
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    /// Template registration or rendering failure
    #[error("Template error: {0}")]
    Template(String),

    /// Configuration loading failure
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<handlebars::RenderError> for DashboardError {
    fn from(err: handlebars::RenderError) -> Self {
        DashboardError::Template(err.to_string())
    }
}

impl From<handlebars::TemplateError> for DashboardError {
    fn from(err: handlebars::TemplateError) -> Self {
        DashboardError::Template(err.to_string())
    }
}

impl From<config::ConfigError> for DashboardError {
    fn from(err: config::ConfigError) -> Self {
        DashboardError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Template(err.to_string())
    }
}
