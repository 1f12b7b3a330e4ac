//! Type definitions shared by the dashboard and its tests
//!
//! `TransferRecord` is the row shape of the token transfer table and
//! `DateRange` is the only user-supplied query input.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use duckdb::types::{TimeUnit, Value};
use num_bigint::BigInt;
use num_traits::FromPrimitive;
use serde::{Serialize, Serializer};

use crate::error::WarehouseError;
use crate::schemas::{TRANSFER_COLUMNS, TRANSFER_COLUMN_COUNT};

/// Date format accepted from the date picker
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One token transfer event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferRecord {
    pub blockchain: String,
    /// UTC, without offset
    pub block_timestamp: NaiveDateTime,
    pub block_number: i64,
    pub block_hash: String,
    pub transaction_hash: String,
    pub event_index: i64,
    pub from_address: String,
    pub to_address: String,
    pub token_address: String,
    /// Amount in the token's smallest unit
    #[serde(serialize_with = "serialize_raw_amount")]
    pub raw_amount: Option<BigInt>,
    /// Amount scaled by the token's decimals
    pub amount: Option<f64>,
    /// USD value at transfer time; absent when no price was known
    pub amount_usd: Option<f64>,
}

impl TransferRecord {
    /// Decode a positional warehouse row.
    ///
    /// `column_count` is the width of the statement result and must match the
    /// transfer layout exactly.
    pub fn from_row(row: &duckdb::Row<'_>, column_count: usize) -> Result<Self, WarehouseError> {
        if column_count != TRANSFER_COLUMN_COUNT {
            return Err(WarehouseError::QueryError(format!(
                "expected {} columns, warehouse returned {}",
                TRANSFER_COLUMN_COUNT, column_count
            )));
        }

        let values = (0..TRANSFER_COLUMN_COUNT)
            .map(|idx| row.get::<_, Value>(idx))
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_values(values)
    }

    /// Decode already-fetched column values in warehouse order
    pub fn from_values(values: Vec<Value>) -> Result<Self, WarehouseError> {
        let values: [Value; TRANSFER_COLUMN_COUNT] = values.try_into().map_err(|v: Vec<Value>| {
            WarehouseError::QueryError(format!(
                "expected {} columns, got {}",
                TRANSFER_COLUMN_COUNT,
                v.len()
            ))
        })?;
        let [blockchain, block_timestamp, block_number, block_hash, transaction_hash, event_index, from_address, to_address, token_address, raw_amount, amount, amount_usd] =
            values;

        Ok(Self {
            blockchain: text(0, blockchain)?,
            block_timestamp: timestamp(1, block_timestamp)?,
            block_number: integer(2, block_number)?,
            block_hash: text(3, block_hash)?,
            transaction_hash: text(4, transaction_hash)?,
            event_index: integer(5, event_index)?,
            from_address: text(6, from_address)?,
            to_address: text(7, to_address)?,
            token_address: text(8, token_address)?,
            raw_amount: big_integer(9, raw_amount)?,
            amount: decimal(10, amount)?,
            amount_usd: decimal(11, amount_usd)?,
        })
    }
}

fn serialize_raw_amount<S: Serializer>(value: &Option<BigInt>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => s.serialize_str(&v.to_string()),
        None => s.serialize_none(),
    }
}

fn decode_error(idx: usize, expected: &str, value: &Value) -> WarehouseError {
    WarehouseError::QueryError(format!(
        "column {} ({}): expected {}, got {:?}",
        idx, TRANSFER_COLUMNS[idx], expected, value
    ))
}

fn text(idx: usize, value: Value) -> Result<String, WarehouseError> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(decode_error(idx, "text", &other)),
    }
}

fn integer(idx: usize, value: Value) -> Result<i64, WarehouseError> {
    let out = match &value {
        Value::TinyInt(v) => Some(*v as i64),
        Value::SmallInt(v) => Some(*v as i64),
        Value::Int(v) => Some(*v as i64),
        Value::BigInt(v) => Some(*v),
        Value::UTinyInt(v) => Some(*v as i64),
        Value::USmallInt(v) => Some(*v as i64),
        Value::UInt(v) => Some(*v as i64),
        Value::UBigInt(v) => i64::try_from(*v).ok(),
        Value::HugeInt(v) => i64::try_from(*v).ok(),
        Value::Decimal(v) => v.to_string().parse().ok(),
        Value::Text(v) => v.trim().parse().ok(),
        _ => None,
    };
    out.ok_or_else(|| decode_error(idx, "integer", &value))
}

fn big_integer(idx: usize, value: Value) -> Result<Option<BigInt>, WarehouseError> {
    let out = match &value {
        Value::Null => return Ok(None),
        Value::TinyInt(v) => BigInt::from(*v),
        Value::SmallInt(v) => BigInt::from(*v),
        Value::Int(v) => BigInt::from(*v),
        Value::BigInt(v) => BigInt::from(*v),
        Value::HugeInt(v) => BigInt::from(*v),
        Value::UTinyInt(v) => BigInt::from(*v),
        Value::USmallInt(v) => BigInt::from(*v),
        Value::UInt(v) => BigInt::from(*v),
        Value::UBigInt(v) => BigInt::from(*v),
        // DECIMAL(38, 0) and VARCHAR are both common carriers for uint256 amounts
        Value::Decimal(v) => parse_big_integer(&v.to_string())
            .ok_or_else(|| decode_error(idx, "integer amount", &value))?,
        Value::Text(v) => {
            parse_big_integer(v).ok_or_else(|| decode_error(idx, "integer amount", &value))?
        }
        // Unconstrained postgres NUMERIC arrives as DOUBLE through the postgres extension
        Value::Double(v) => integral_float(*v)
            .ok_or_else(|| decode_error(idx, "integer amount", &value))?,
        Value::Float(v) => integral_float(*v as f64)
            .ok_or_else(|| decode_error(idx, "integer amount", &value))?,
        _ => return Err(decode_error(idx, "integer amount", &value)),
    };
    Ok(Some(out))
}

fn integral_float(v: f64) -> Option<BigInt> {
    if v.is_finite() && v.fract() == 0.0 {
        BigInt::from_f64(v)
    } else {
        None
    }
}

fn parse_big_integer(s: &str) -> Option<BigInt> {
    let s = s.trim();
    // Decimal renderings of integral values may carry a zero fraction
    let s = match s.split_once('.') {
        Some((whole, frac)) if frac.chars().all(|c| c == '0') => whole,
        Some(_) => return None,
        None => s,
    };
    s.parse().ok()
}

fn decimal(idx: usize, value: Value) -> Result<Option<f64>, WarehouseError> {
    let out = match &value {
        Value::Null => return Ok(None),
        Value::Float(v) => *v as f64,
        Value::Double(v) => *v,
        Value::TinyInt(v) => *v as f64,
        Value::SmallInt(v) => *v as f64,
        Value::Int(v) => *v as f64,
        Value::BigInt(v) => *v as f64,
        Value::HugeInt(v) => *v as f64,
        Value::UTinyInt(v) => *v as f64,
        Value::USmallInt(v) => *v as f64,
        Value::UInt(v) => *v as f64,
        Value::UBigInt(v) => *v as f64,
        Value::Decimal(v) => v
            .to_string()
            .parse()
            .map_err(|_| decode_error(idx, "decimal", &value))?,
        Value::Text(v) => v
            .trim()
            .parse()
            .map_err(|_| decode_error(idx, "decimal", &value))?,
        _ => return Err(decode_error(idx, "decimal", &value)),
    };
    Ok(Some(out))
}

fn timestamp(idx: usize, value: Value) -> Result<NaiveDateTime, WarehouseError> {
    let out = match &value {
        Value::Timestamp(unit, v) => {
            let micros = match unit {
                TimeUnit::Second => v.checked_mul(1_000_000),
                TimeUnit::Millisecond => v.checked_mul(1_000),
                TimeUnit::Microsecond => Some(*v),
                TimeUnit::Nanosecond => Some(v / 1_000),
            };
            micros
                .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_micros)
                .map(|dt| dt.naive_utc())
        }
        Value::Date32(days) => NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(*days as i64)))
            .map(|d| d.and_time(NaiveTime::MIN)),
        Value::Text(s) => parse_timestamp(s),
        _ => None,
    };
    out.ok_or_else(|| decode_error(idx, "timestamp", &value))
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

/// Inclusive calendar-day range selected in the date picker.
///
/// `start <= end` always holds; construction rejects inverted ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, WarehouseError> {
        if start > end {
            return Err(WarehouseError::FilterError(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse `YYYY-MM-DD` strings from the date picker
    pub fn parse(start: &str, end: &str) -> Result<Self, WarehouseError> {
        let start = NaiveDate::parse_from_str(start.trim(), DATE_FORMAT).map_err(|e| {
            WarehouseError::FilterError(format!("start date '{}': {}", start.trim(), e))
        })?;
        let end = NaiveDate::parse_from_str(end.trim(), DATE_FORMAT).map_err(|e| {
            WarehouseError::FilterError(format!("end date '{}': {}", end.trim(), e))
        })?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// First instant inside the range (start date, midnight)
    pub fn lower_bound(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// First instant after the range (day after end date, midnight)
    pub fn upper_bound_exclusive(&self) -> NaiveDateTime {
        self.end
            .checked_add_days(Days::new(1))
            .map(|d| d.and_time(NaiveTime::MIN))
            .unwrap_or(NaiveDateTime::MAX)
    }

    /// Whether a block timestamp falls on one of the selected days
    pub fn contains(&self, ts: &NaiveDateTime) -> bool {
        let day = ts.date();
        day >= self.start && day <= self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}
