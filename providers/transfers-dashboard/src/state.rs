//! Dashboard view state
//!
//! Each interaction walks `Idle -> Fetching -> {Displaying, Failed}`:
//! - table mode starts fetching only when the fetch button was pressed
//! - chart mode starts fetching as soon as both dates form a valid range
//!
//! A failed interaction simply ends; the next request starts from `Idle`
//! again. Nothing here retries.

use serde::{Deserialize, Serialize};
use warehouse_common::{DateRange, WarehouseError};

use crate::aggregator::{aggregate_hourly, HourlyBucket};
use crate::cache::TransferSet;

/// Prompt shown before the table has been requested
pub const TABLE_PROMPT: &str = "Press \"Fetch Data\" to load token transfers.";

/// Prompt shown while chart mode has no usable range
pub const CHART_PROMPT: &str = "Select a start and an end date to see hourly activity.";

/// Prompt shown when only one side of the range is filled in
pub const PARTIAL_RANGE_PROMPT: &str = "Select both a start and an end date, or clear both.";

/// Which view is being rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    Table,
    Chart,
}

/// Raw form input (query string of `/table` and `/chart`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    /// Present when the fetch button was pressed
    pub fetch: Option<String>,
}

/// Outcome of reading the date inputs
#[derive(Debug, Clone, PartialEq)]
pub enum RangeInput {
    /// Neither date given
    Empty,
    /// Only one date given
    Partial,
    Valid(DateRange),
}

impl ViewQuery {
    pub fn new(start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            start: start.map(str::to_string),
            end: end.map(str::to_string),
            fetch: None,
        }
    }

    /// Mark the fetch button as pressed
    pub fn with_fetch(mut self) -> Self {
        self.fetch = Some("1".to_string());
        self
    }

    pub fn fetch_requested(&self) -> bool {
        self.fetch.is_some()
    }

    /// Interpret the date inputs. Blank fields count as missing.
    pub fn range(&self) -> Result<RangeInput, WarehouseError> {
        let start = non_blank(self.start.as_deref());
        let end = non_blank(self.end.as_deref());

        match (start, end) {
            (None, None) => Ok(RangeInput::Empty),
            (Some(start), Some(end)) => DateRange::parse(start, end).map(RangeInput::Valid),
            _ => Ok(RangeInput::Partial),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Data ready to render
#[derive(Debug, Clone)]
pub enum DisplayData {
    Table {
        records: TransferSet,
        range: Option<DateRange>,
    },
    Chart {
        buckets: Vec<HourlyBucket>,
        range: DateRange,
    },
}

/// Per-interaction view state
#[derive(Debug, Clone)]
pub enum ViewState {
    /// Waiting for user input; carries the guidance to show
    Idle { prompt: &'static str },
    /// A warehouse fetch has been triggered
    Fetching {
        mode: DisplayMode,
        range: Option<DateRange>,
    },
    Displaying(DisplayData),
    /// The interaction ended with an error message
    Failed { message: String },
}

impl ViewState {
    /// Decide what a request asks for before any data is loaded
    pub fn from_input(mode: DisplayMode, input: &ViewQuery) -> Self {
        let range = match input.range() {
            Ok(range) => range,
            Err(e) => return ViewState::Failed {
                message: e.user_message(),
            },
        };

        match (mode, range) {
            (DisplayMode::Table, _) if !input.fetch_requested() => ViewState::Idle {
                prompt: TABLE_PROMPT,
            },
            (DisplayMode::Table, RangeInput::Empty) => ViewState::Fetching { mode, range: None },
            (DisplayMode::Table, RangeInput::Partial) => ViewState::Idle {
                prompt: PARTIAL_RANGE_PROMPT,
            },
            (DisplayMode::Chart, RangeInput::Empty | RangeInput::Partial) => ViewState::Idle {
                prompt: CHART_PROMPT,
            },
            (_, RangeInput::Valid(range)) => ViewState::Fetching {
                mode,
                range: Some(range),
            },
        }
    }

    /// Range to fetch, when this state is `Fetching`
    pub fn pending_fetch(&self) -> Option<Option<DateRange>> {
        match self {
            ViewState::Fetching { range, .. } => Some(*range),
            _ => None,
        }
    }

    /// Finish a fetch. States other than `Fetching` are returned unchanged.
    pub fn complete(self, result: Result<TransferSet, WarehouseError>) -> Self {
        let (mode, range) = match self {
            ViewState::Fetching { mode, range } => (mode, range),
            other => return other,
        };

        let records = match result {
            Ok(records) => records,
            Err(e) => {
                return ViewState::Failed {
                    message: e.user_message(),
                }
            }
        };

        match (mode, range) {
            (DisplayMode::Chart, Some(range)) => ViewState::Displaying(DisplayData::Chart {
                buckets: aggregate_hourly(&records),
                range,
            }),
            (DisplayMode::Chart, None) => ViewState::Idle {
                prompt: CHART_PROMPT,
            },
            (DisplayMode::Table, range) => {
                ViewState::Displaying(DisplayData::Table { records, range })
            }
        }
    }
}
