//! Transfers dashboard provider
//!
//! Owns the transfer source, the query cache and the presenter, and serves
//! the HTTP surface until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};
use warehouse_common::{DateRange, WarehouseError};

use crate::aggregator::{aggregate_hourly, HourlyBucket};
use crate::cache::{QueryCache, TransferSet};
use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::presenter::Presenter;
use crate::reader::{TransferReader, TransferSource};
use crate::server;
use crate::state::{DisplayMode, RangeInput, ViewQuery, ViewState};

/// Token transfers dashboard
pub struct TransfersDashboard {
    source: Arc<dyn TransferSource>,
    cache: QueryCache,
    presenter: Presenter,
}

impl TransfersDashboard {
    /// Create a dashboard reading from the configured warehouse
    pub fn with_config(config: &DashboardConfig) -> Result<Self, DashboardError> {
        info!(
            "Creating transfers dashboard for {}",
            config.warehouse.describe()
        );

        let source = Arc::new(TransferReader::new(config.warehouse.clone()));
        let cache = QueryCache::from_config(&config.cache)?;
        let presenter = Presenter::new(config.server.title.clone())?;

        Ok(Self::new(source, cache, presenter))
    }

    pub fn new(source: Arc<dyn TransferSource>, cache: QueryCache, presenter: Presenter) -> Self {
        Self {
            source,
            cache,
            presenter,
        }
    }

    /// Transfers for `range`, from the cache when still fresh
    pub async fn load(&self, range: Option<DateRange>) -> Result<TransferSet, WarehouseError> {
        let source = Arc::clone(&self.source);
        self.cache
            .get_or_fetch(range, || async move { source.fetch_transfers(range).await })
            .await
    }

    /// Run one interaction through the view state machine
    pub async fn view(&self, mode: DisplayMode, query: &ViewQuery) -> ViewState {
        let state = ViewState::from_input(mode, query);

        match state.pending_fetch() {
            Some(range) => {
                debug!("Fetching transfers for {:?} view, range {:?}", mode, range);
                let result = self.load(range).await;
                state.complete(result)
            }
            None => state,
        }
    }

    /// Render the page for one interaction
    pub async fn render(
        &self,
        mode: DisplayMode,
        query: &ViewQuery,
    ) -> Result<String, DashboardError> {
        let state = self.view(mode, query).await;
        self.presenter.render(mode, query, &state)
    }

    /// Records for the JSON API. Both dates or neither are required.
    pub async fn transfers(&self, query: &ViewQuery) -> Result<TransferSet, WarehouseError> {
        let range = match query.range()? {
            RangeInput::Empty => None,
            RangeInput::Valid(range) => Some(range),
            RangeInput::Partial => {
                return Err(WarehouseError::FilterError(
                    "both start and end dates are required".to_string(),
                ))
            }
        };
        self.load(range).await
    }

    /// Hourly series for the JSON API
    pub async fn hourly(&self, query: &ViewQuery) -> Result<Vec<HourlyBucket>, WarehouseError> {
        let records = self.transfers(query).await?;
        Ok(aggregate_hourly(&records))
    }

    pub async fn is_healthy(&self) -> bool {
        self.source.is_healthy().await
    }

    /// Serve the dashboard on `addr` until Ctrl-C
    pub async fn start(self: Arc<Self>, addr: SocketAddr) -> Result<(), DashboardError> {
        let routes = server::routes(Arc::clone(&self));

        let (bound, serving) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(addr, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for shutdown signal: {}", e);
                }
            })
            .map_err(|e| DashboardError::Config(format!("Cannot bind {}: {}", addr, e)))?;

        info!("Dashboard listening on http://{}", bound);
        serving.await;

        let stats = self.cache.stats().await;
        info!(
            "Dashboard stopped (cache hits: {}, misses: {})",
            stats.hits, stats.misses
        );
        Ok(())
    }
}
