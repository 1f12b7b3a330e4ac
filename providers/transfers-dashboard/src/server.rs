//! HTTP routes
//!
//! HTML pages always answer 200; failures are part of the page. The JSON
//! endpoints map bad ranges to 400 and warehouse failures to 502.

use std::convert::Infallible;
use std::sync::Arc;

use serde_json::json;
use tracing::error;
use warp::http::{StatusCode, Uri};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};
use warehouse_common::WarehouseError;

use crate::provider::TransfersDashboard;
use crate::state::{DisplayMode, ViewQuery};

/// All dashboard routes
pub fn routes(
    dashboard: Arc<TransfersDashboard>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .map(|| warp::redirect::see_other(Uri::from_static("/table")));

    let table = warp::path!("table")
        .and(warp::get())
        .and(warp::query::<ViewQuery>())
        .and(with_dashboard(dashboard.clone()))
        .and_then(|query: ViewQuery, dashboard: Arc<TransfersDashboard>| {
            page(DisplayMode::Table, query, dashboard)
        });

    let chart = warp::path!("chart")
        .and(warp::get())
        .and(warp::query::<ViewQuery>())
        .and(with_dashboard(dashboard.clone()))
        .and_then(|query: ViewQuery, dashboard: Arc<TransfersDashboard>| {
            page(DisplayMode::Chart, query, dashboard)
        });

    let api_transfers = warp::path!("api" / "transfers")
        .and(warp::get())
        .and(warp::query::<ViewQuery>())
        .and(with_dashboard(dashboard.clone()))
        .and_then(transfers_json);

    let api_hourly = warp::path!("api" / "hourly")
        .and(warp::get())
        .and(warp::query::<ViewQuery>())
        .and(with_dashboard(dashboard.clone()))
        .and_then(hourly_json);

    let health = warp::path!("health")
        .and(with_dashboard(dashboard))
        .and_then(health_check);

    index
        .or(table)
        .or(chart)
        .or(api_transfers)
        .or(api_hourly)
        .or(health)
        .with(warp::trace::request())
}

fn with_dashboard(
    dashboard: Arc<TransfersDashboard>,
) -> impl Filter<Extract = (Arc<TransfersDashboard>,), Error = Infallible> + Clone {
    warp::any().map(move || dashboard.clone())
}

async fn page(
    mode: DisplayMode,
    query: ViewQuery,
    dashboard: Arc<TransfersDashboard>,
) -> Result<Response, Infallible> {
    match dashboard.render(mode, &query).await {
        Ok(html) => Ok(warp::reply::html(html).into_response()),
        Err(e) => {
            error!("Failed to render {:?} page: {}", mode, e);
            Ok(warp::reply::with_status(
                "Internal Server Error",
                StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into_response())
        }
    }
}

async fn transfers_json(
    query: ViewQuery,
    dashboard: Arc<TransfersDashboard>,
) -> Result<Response, Infallible> {
    Ok(match dashboard.transfers(&query).await {
        Ok(records) => warp::reply::json(&*records).into_response(),
        Err(e) => error_response(&e),
    })
}

async fn hourly_json(
    query: ViewQuery,
    dashboard: Arc<TransfersDashboard>,
) -> Result<Response, Infallible> {
    Ok(match dashboard.hourly(&query).await {
        Ok(buckets) => warp::reply::json(&buckets).into_response(),
        Err(e) => error_response(&e),
    })
}

async fn health_check(dashboard: Arc<TransfersDashboard>) -> Result<Response, Infallible> {
    Ok(if dashboard.is_healthy().await {
        warp::reply::with_status("OK", StatusCode::OK).into_response()
    } else {
        warp::reply::with_status("Warehouse unavailable", StatusCode::SERVICE_UNAVAILABLE)
            .into_response()
    })
}

fn error_response(err: &WarehouseError) -> Response {
    let status = match err {
        WarehouseError::FilterError(_) => StatusCode::BAD_REQUEST,
        e if e.is_warehouse_failure() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warp::reply::with_status(
        warp::reply::json(&json!({ "error": err.user_message() })),
        status,
    )
    .into_response()
}
