//! Normalization of domain values into backend-safe records.
//!
//! Every write that crosses the [`BackendClient`](crate::domain::ports::BackendClient)
//! boundary goes through [`to_record`]: serde turns enums into their scalar
//! names and timestamps into RFC 3339 strings, and null-valued keys are
//! dropped at every nesting level.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::domain::{DomainError, Result};

/// A single backend row.
pub type Record = serde_json::Map<String, Value>;

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

pub fn to_record<T: Serialize>(value: &T) -> Result<Record> {
    match strip_nulls(serde_json::to_value(value)?) {
        Value::Object(map) => Ok(map),
        other => Err(DomainError::internal(format!(
            "expected a record, got {}",
            kind_of(&other)
        ))),
    }
}

/// Recursively removes null-valued keys from objects. Nulls inside arrays
/// are kept so positional data is not shifted.
pub fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        scalar => scalar,
    }
}

pub fn canonical_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses the date formats clients commonly send. Timestamps without an
/// offset are taken as UTC.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DomainError::validation("empty date"));
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(seconds) = input.parse::<i64>() {
        if let Some(ts) = Utc.timestamp_opt(seconds, 0).single() {
            return Ok(ts);
        }
    }

    Err(DomainError::validation(format!("unrecognized date: {input}")))
}

/// Parses and re-emits a date in canonical form.
pub fn normalize_timestamp(input: &str) -> Result<String> {
    parse_timestamp(input).map(|ts| canonical_timestamp(&ts))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
