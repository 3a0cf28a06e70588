//! Timestamp normalization.
//!
//! Every source reports time differently: ISO-8601 strings with an offset,
//! epoch milliseconds, or epoch seconds (some stores mix the two across
//! schema versions). Everything is converted to UTC epoch seconds as `f64`.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde_json::Value;
use thiserror::Error;

/// Numeric timestamps above this magnitude are epoch milliseconds.
pub const MILLIS_THRESHOLD: f64 = 1_000_000_000_000.0;

/// Formats accepted besides RFC 3339 (`git log --format=%ai` style).
const EXTRA_OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%dT%H:%M:%S%.f%z"];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimestampError {
    #[error("timestamp is missing")]
    Missing,
    #[error("unparseable timestamp: {0}")]
    Unparseable(String),
    #[error("timestamp out of range: {0}")]
    OutOfRange(f64),
}

/// Parse an ISO-8601 timestamp carrying `Z` or an explicit offset.
///
/// Naive timestamps (no offset) are rejected: the wall clock they were
/// recorded in is unknown.
pub fn parse_iso8601(s: &str) -> Result<f64, TimestampError> {
    parse_with_offset(s).map(|dt| datetime_to_epoch(&dt.with_timezone(&Utc)))
}

/// Parse an ISO-8601 timestamp, keeping its original offset.
pub fn parse_with_offset(s: &str) -> Result<DateTime<FixedOffset>, TimestampError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(TimestampError::Missing);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt);
    }
    EXTRA_OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| TimestampError::Unparseable(trimmed.to_string()))
}

/// Normalize a bare epoch number, applying the milliseconds heuristic per value.
pub fn from_epoch_number(value: f64) -> Result<f64, TimestampError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TimestampError::OutOfRange(value));
    }
    let seconds = if value > MILLIS_THRESHOLD {
        value / 1000.0
    } else {
        value
    };
    epoch_to_datetime(seconds)
        .map(|_| seconds)
        .ok_or(TimestampError::OutOfRange(value))
}

/// Accept a numeric value only when it has millisecond magnitude.
///
/// Some fields hold small relative durations next to absolute times; only
/// values that are unambiguously epoch milliseconds are trusted there.
pub fn from_epoch_millis(value: f64) -> Option<f64> {
    (value.is_finite() && value > MILLIS_THRESHOLD)
        .then(|| from_epoch_number(value).ok())
        .flatten()
}

/// Normalize a JSON timestamp value (string or number).
pub fn normalize_value(value: Option<&Value>) -> Result<f64, TimestampError> {
    match value {
        None | Some(Value::Null) => Err(TimestampError::Missing),
        Some(Value::String(s)) => parse_iso8601(s),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| TimestampError::Unparseable(n.to_string()))
            .and_then(from_epoch_number),
        Some(other) => Err(TimestampError::Unparseable(other.to_string())),
    }
}

/// Convert epoch seconds to a UTC datetime.
#[expect(
    clippy::cast_possible_truncation,
    reason = "range is checked by chrono; sub-microsecond precision is irrelevant"
)]
pub fn epoch_to_datetime(epoch_seconds: f64) -> Option<DateTime<Utc>> {
    if !epoch_seconds.is_finite() {
        return None;
    }
    DateTime::from_timestamp_micros((epoch_seconds * 1_000_000.0).round() as i64)
}

#[expect(
    clippy::cast_precision_loss,
    reason = "epoch microseconds fit comfortably in an f64 mantissa"
)]
pub fn datetime_to_epoch(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp_micros() as f64 / 1_000_000.0
}

/// UTC calendar date of an epoch value.
pub fn utc_date(epoch_seconds: f64) -> Option<NaiveDate> {
    epoch_to_datetime(epoch_seconds).map(|dt| dt.date_naive())
}

/// Round to the nearest whole second; the dedup key shared across sources.
#[expect(
    clippy::cast_possible_truncation,
    reason = "validated epochs are far inside the i64 range"
)]
pub fn rounded_epoch(epoch_seconds: f64) -> i64 {
    epoch_seconds.round() as i64
}
