//! Timestamp and numeric coercion for event columns.
//!
//! Event tables arrive with timestamps as text, dates or native Datetime
//! columns. Everything is brought to `NaiveDateTime` here; values that cannot
//! be parsed become missing and are counted, never fatal.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use cts_common::{any_to_f64, any_to_string_non_empty};
use polars::prelude::*;

use crate::error::{AlignError, Result};

/// Days between 0001-01-01 and 1970-01-01, for Polars `Date` values.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Time of day assigned to date-only values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateAnchor {
    #[default]
    Midnight,
    /// Procedure dates carry no time of day; noon keeps them inside the day.
    Midday,
}

impl DateAnchor {
    pub fn from_midday(midday: bool) -> Self {
        if midday { Self::Midday } else { Self::Midnight }
    }

    fn time(self) -> NaiveTime {
        match self {
            Self::Midnight => NaiveTime::MIN,
            Self::Midday => NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// A raw value that could not be coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionIssue {
    pub row: usize,
    pub raw: String,
}

/// Result of coercing one column: a value per row plus what failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced<T> {
    pub values: Vec<Option<T>>,
    pub issues: Vec<CoercionIssue>,
}

impl<T> Coerced<T> {
    fn with_capacity(len: usize) -> Self {
        Self {
            values: Vec::with_capacity(len),
            issues: Vec::new(),
        }
    }

    /// One-line summary of the failures, if any.
    pub fn summary(&self, column: &str) -> Option<String> {
        let first = self.issues.first()?;
        Some(format!(
            "{} unparseable value(s) in '{column}' treated as missing (first at row {})",
            self.issues.len(),
            first.row
        ))
    }
}

/// Parse a single timestamp string.
///
/// # Examples
///
/// ```
/// use cts_align::{DateAnchor, parse_timestamp};
///
/// let noon = parse_timestamp("2150-03-01", DateAnchor::Midday).unwrap();
/// assert_eq!(noon.to_string(), "2150-03-01 12:00:00");
/// assert!(parse_timestamp("yesterday", DateAnchor::Midnight).is_none());
/// ```
pub fn parse_timestamp(value: &str, anchor: DateAnchor) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date.and_time(anchor.time()));
        }
    }
    None
}

fn epoch_to_naive(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let utc = match unit {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
    };
    utc.map(|dt| dt.naive_utc())
}

/// Convert a non-null cell to a timestamp.
pub fn any_to_timestamp(value: AnyValue<'_>, anchor: DateAnchor) -> Option<NaiveDateTime> {
    match value {
        AnyValue::Datetime(v, unit, _) => epoch_to_naive(v, unit),
        AnyValue::Date(days) => {
            NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
                .map(|date| date.and_time(anchor.time()))
        }
        AnyValue::String(s) => parse_timestamp(s, anchor),
        AnyValue::StringOwned(s) => parse_timestamp(&s, anchor),
        _ => None,
    }
}

fn is_blank(value: &AnyValue<'_>) -> bool {
    match value {
        AnyValue::Null => true,
        AnyValue::String(s) => s.trim().is_empty(),
        AnyValue::StringOwned(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Coerce a column to timestamps. Nulls and blanks stay missing without an issue.
pub fn coerce_timestamps(
    column: &Column,
    anchor: DateAnchor,
) -> PolarsResult<Coerced<NaiveDateTime>> {
    let mut coerced = Coerced::with_capacity(column.len());
    for row in 0..column.len() {
        let value = column.get(row)?;
        if is_blank(&value) {
            coerced.values.push(None);
            continue;
        }
        let raw = value.to_string();
        let parsed = any_to_timestamp(value, anchor);
        if parsed.is_none() {
            coerced.issues.push(CoercionIssue { row, raw });
        }
        coerced.values.push(parsed);
    }
    Ok(coerced)
}

/// Coerce a column to `f64`. NaN counts as missing.
pub fn coerce_numbers(column: &Column) -> PolarsResult<Coerced<f64>> {
    let mut coerced = Coerced::with_capacity(column.len());
    for row in 0..column.len() {
        let value = column.get(row)?;
        if is_blank(&value) {
            coerced.values.push(None);
            continue;
        }
        let raw = value.to_string();
        let is_float = matches!(value, AnyValue::Float32(_) | AnyValue::Float64(_));
        let parsed = any_to_f64(value);
        if parsed.is_none() && !is_float {
            coerced.issues.push(CoercionIssue { row, raw });
        }
        coerced.values.push(parsed);
    }
    Ok(coerced)
}

/// Read a label column. Blank labels are missing.
pub fn coerce_labels(column: &Column) -> PolarsResult<Vec<Option<String>>> {
    (0..column.len())
        .map(|row| column.get(row).map(any_to_string_non_empty))
        .collect()
}

/// Build a Datetime column from timestamps.
///
/// Nanosecond precision when every value fits in an `i64` of nanoseconds
/// (years 1677 to 2262), microseconds otherwise.
pub fn timestamp_column(name: &str, values: &[Option<NaiveDateTime>]) -> Column {
    let nanos: Option<Vec<Option<i64>>> = values
        .iter()
        .map(|value| match value {
            Some(ts) => ts.and_utc().timestamp_nanos_opt().map(Some),
            None => Some(None),
        })
        .collect();
    let (epoch, unit) = match nanos {
        Some(nanos) => (nanos, TimeUnit::Nanoseconds),
        None => (
            values
                .iter()
                .map(|value| value.map(|ts| ts.and_utc().timestamp_micros()))
                .collect(),
            TimeUnit::Microseconds,
        ),
    };
    Int64Chunked::new(name.into(), &epoch)
        .into_datetime(unit, None)
        .into_column()
}

/// Build a Float64 column from optional numbers.
pub fn number_column(name: &str, values: &[Option<f64>]) -> Column {
    Column::new(name.into(), values)
}

pub(crate) fn has_column(frame: &DataFrame, name: &str) -> bool {
    frame.get_column_names().iter().any(|col| col.as_str() == name)
}

pub(crate) fn require_column<'f>(frame: &'f DataFrame, name: &str) -> Result<&'f Column> {
    if !has_column(frame, name) {
        return Err(AlignError::missing_column(name));
    }
    Ok(frame.column(name)?)
}
