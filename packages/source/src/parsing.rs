//! Shared parsing utilities for raw source records.
//!
//! Timestamp, number, and nested-field helpers used by record
//! normalization.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Looks up a dotted path (`"geo.lat"`) in a JSON object.
#[must_use]
pub fn get_path<'a>(record: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.')
        .try_fold(record, |value, segment| value.get(segment))
        .filter(|value| !value.is_null())
}

/// Gets a non-empty string at a dotted path.
#[must_use]
pub fn get_str<'a>(record: &'a serde_json::Value, path: &str) -> Option<&'a str> {
    get_path(record, path)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Gets a number at a dotted path, accepting numeric strings.
#[must_use]
pub fn get_f64(record: &serde_json::Value, path: &str) -> Option<f64> {
    value_as_f64(get_path(record, path)?)
}

/// Interprets a JSON number or numeric string as `f64`.
#[must_use]
pub fn value_as_f64(value: &serde_json::Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
}

/// Parses an ISO 8601 datetime. Accepts RFC 3339 with an offset, or a
/// naive datetime (interpreted as UTC) with optional fractional seconds.
#[must_use]
pub fn parse_iso_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    None
}

/// Converts epoch nanoseconds to a UTC datetime.
#[must_use]
pub fn from_epoch_nanos(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(nanos)
}

/// Converts epoch milliseconds to a UTC datetime.
#[must_use]
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Reads an integer epoch value, accepting JSON integers, floats, and
/// numeric strings.
#[must_use]
pub fn value_as_i64(value: &serde_json::Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    if let Some(s) = value.as_str() {
        return s.trim().parse::<i64>().ok();
    }
    let f = value.as_f64()?;
    if !f.is_finite() || f.abs() >= 9.2e18 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(f as i64)
}
