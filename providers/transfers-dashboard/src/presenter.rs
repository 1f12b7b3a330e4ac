//! HTML rendering for the table and chart views

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::{json, Value};
use warehouse_common::{DateRange, TransferRecord, TRANSFER_COLUMNS};

use crate::aggregator::HourlyBucket;
use crate::error::DashboardError;
use crate::state::{DisplayData, DisplayMode, ViewQuery, ViewState};

const DASHBOARD_TEMPLATE: &str = "dashboard";

/// Line shown under the page title
pub const DESCRIPTION: &str =
    "This app retrieves token transfer data from the warehouse and displays it.";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Serialize)]
struct TableView {
    summary: String,
    columns: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

#[derive(Serialize)]
struct ChartView {
    summary: String,
    /// Plotly figure JSON, safe to embed in a script element
    figure: String,
}

#[derive(Serialize)]
struct PageContext<'a> {
    title: &'a str,
    description: &'static str,
    action: &'static str,
    is_table: bool,
    is_chart: bool,
    start: &'a str,
    end: &'a str,
    prompt: Option<&'a str>,
    error: Option<&'a str>,
    table: Option<TableView>,
    chart: Option<ChartView>,
}

/// Renders dashboard pages
pub struct Presenter {
    templates: Handlebars<'static>,
    title: String,
}

impl Presenter {
    pub fn new(title: impl Into<String>) -> Result<Self, DashboardError> {
        let mut templates = Handlebars::new();
        templates.set_strict_mode(false);
        templates.register_template_string(
            DASHBOARD_TEMPLATE,
            include_str!("../templates/dashboard.hbs"),
        )?;

        Ok(Self {
            templates,
            title: title.into(),
        })
    }

    /// Render the page for `state`.
    ///
    /// A failed state renders its message and nothing else: no grid, no chart.
    pub fn render(
        &self,
        mode: DisplayMode,
        query: &ViewQuery,
        state: &ViewState,
    ) -> Result<String, DashboardError> {
        let mut context = PageContext {
            title: &self.title,
            description: DESCRIPTION,
            action: match mode {
                DisplayMode::Table => "/table",
                DisplayMode::Chart => "/chart",
            },
            is_table: mode == DisplayMode::Table,
            is_chart: mode == DisplayMode::Chart,
            start: query.start.as_deref().unwrap_or(""),
            end: query.end.as_deref().unwrap_or(""),
            prompt: None,
            error: None,
            table: None,
            chart: None,
        };

        match state {
            ViewState::Idle { prompt } => context.prompt = Some(*prompt),
            ViewState::Fetching { .. } => context.prompt = Some("Loading token transfers..."),
            ViewState::Failed { message } => context.error = Some(message.as_str()),
            ViewState::Displaying(DisplayData::Table { records, range }) => {
                context.table = Some(TableView {
                    summary: transfer_summary(records.len(), range.as_ref()),
                    columns: TRANSFER_COLUMNS.to_vec(),
                    rows: table_rows(records),
                });
            }
            ViewState::Displaying(DisplayData::Chart { buckets, range }) => {
                context.chart = Some(ChartView {
                    summary: chart_summary(buckets, range),
                    figure: embeddable_json(&chart_figure(buckets))?,
                });
            }
        }

        Ok(self.templates.render(DASHBOARD_TEMPLATE, &context)?)
    }
}

/// "N transfers", with the range when one was applied
pub fn transfer_summary(count: usize, range: Option<&DateRange>) -> String {
    let noun = if count == 1 { "transfer" } else { "transfers" };
    match range {
        Some(range) => format!("{} {} from {}", count, noun, range),
        None => format!("{} {}", count, noun),
    }
}

fn chart_summary(buckets: &[HourlyBucket], range: &DateRange) -> String {
    let transactions: usize = buckets.iter().map(|b| b.transaction_count).sum();
    let total_usd: f64 = buckets.iter().map(|b| b.total_usd).sum();
    format!(
        "{} transactions worth ${:.2} from {}",
        transactions, total_usd, range
    )
}

/// Grid cells for each record, in column order. Missing values render empty.
pub fn table_rows(records: &[TransferRecord]) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|r| {
            vec![
                r.blockchain.clone(),
                r.block_timestamp.format(TIMESTAMP_FORMAT).to_string(),
                r.block_number.to_string(),
                r.block_hash.clone(),
                r.transaction_hash.clone(),
                r.event_index.to_string(),
                r.from_address.clone(),
                r.to_address.clone(),
                r.token_address.clone(),
                r.raw_amount
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
                r.amount.map(|v| v.to_string()).unwrap_or_default(),
                r.amount_usd.map(|v| format!("{:.2}", v)).unwrap_or_default(),
            ]
        })
        .collect()
}

/// Plotly figure: transaction count bars on the left axis, USD total line on
/// the right axis, one shared time axis with unified hover.
pub fn chart_figure(buckets: &[HourlyBucket]) -> Value {
    let hours: Vec<String> = buckets
        .iter()
        .map(|b| b.bucket_start.format(TIMESTAMP_FORMAT).to_string())
        .collect();
    let transactions: Vec<usize> = buckets.iter().map(|b| b.transaction_count).collect();
    let total_usd: Vec<f64> = buckets.iter().map(|b| b.total_usd).collect();

    json!({
        "data": [
            {
                "type": "bar",
                "name": "Transactions",
                "x": hours,
                "y": transactions,
                "yaxis": "y",
            },
            {
                "type": "scatter",
                "mode": "lines+markers",
                "name": "Total USD",
                "x": hours,
                "y": total_usd,
                "yaxis": "y2",
            },
        ],
        "layout": {
            "title": { "text": "Hourly Token Transfers" },
            "xaxis": { "title": { "text": "Hour" }, "type": "date" },
            "yaxis": { "title": { "text": "Transactions" } },
            "yaxis2": {
                "title": { "text": "Total USD" },
                "overlaying": "y",
                "side": "right",
            },
            "hovermode": "x unified",
            "legend": { "orientation": "h" },
        },
    })
}

/// Serialize for inline `<script>` use; `<` is escaped so no value can close
/// the element.
fn embeddable_json(value: &Value) -> Result<String, DashboardError> {
    Ok(serde_json::to_string(value)?.replace('<', "\\u003c"))
}
