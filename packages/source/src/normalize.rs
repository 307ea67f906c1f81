//! Raw JSON record → [`RawEvent`] normalization.
//!
//! A record is rejected only when it has no usable timestamp; every other
//! attribute is optional at this stage. Coordinate validity is checked
//! downstream, where rejected events are counted per cycle.

use event_map_event_models::{Sentiment, SentimentLabel};
use event_map_geography_models::GeoPoint;
use serde_json::Value;

use crate::RawEvent;
use crate::parsing::{
    from_epoch_millis, from_epoch_nanos, get_f64, get_path, get_str, parse_iso_datetime,
    value_as_f64, value_as_i64,
};
use crate::source_def::{FieldMapping, TimestampField};

/// Why a record could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The record is not a JSON object.
    #[error("record is not an object")]
    NotAnObject,

    /// No timestamp field was present.
    #[error("missing timestamp")]
    MissingTimestamp,

    /// A timestamp field was present but could not be parsed.
    #[error("unparseable timestamp: {value}")]
    UnparseableTimestamp {
        /// The raw value as JSON text.
        value: String,
    },
}

/// Normalizes one record. `fallback_id` is used when the record carries no
/// identifier.
///
/// # Errors
///
/// Returns [`RecordError`] if the record is not an object or has no
/// parseable timestamp.
pub fn normalize_record(
    record: &Value,
    fields: &FieldMapping,
    fallback_id: impl FnOnce() -> String,
) -> Result<RawEvent, RecordError> {
    if !record.is_object() {
        return Err(RecordError::NotAnObject);
    }

    let timestamp = extract_timestamp(record, &fields.timestamp)?;

    let id = fields
        .id
        .iter()
        .find_map(|field| {
            let value = get_path(record, field)?;
            value
                .as_str()
                .map(String::from)
                .or_else(|| value.as_i64().map(|n| n.to_string()))
        })
        .unwrap_or_else(fallback_id);

    let lat = first_f64(record, &fields.lat);
    let lon = first_f64(record, &fields.lon);
    let geo = match (lat, lon) {
        (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
        _ => None,
    };

    let text_parts: Vec<&str> = fields
        .text
        .iter()
        .filter_map(|field| get_str(record, field))
        .collect();
    let free_text = if text_parts.is_empty() {
        None
    } else {
        Some(text_parts.join(" "))
    };

    let structured_category = fields
        .category
        .iter()
        .find_map(|field| get_str(record, field))
        .map(String::from);

    let sentiment = fields
        .sentiment
        .as_deref()
        .and_then(|path| get_path(record, path))
        .and_then(extract_sentiment);

    let intensity = first_f64(record, &fields.intensity).filter(|v| v.is_finite());

    Ok(RawEvent {
        id,
        timestamp,
        geo,
        free_text,
        structured_category,
        sentiment,
        intensity,
    })
}

/// Normalizes a list of records, returning the events and the number of
/// rejected records.
#[must_use]
pub fn normalize_records(
    source_id: &str,
    records: &[Value],
    fields: &FieldMapping,
) -> (Vec<RawEvent>, usize) {
    let mut events = Vec::with_capacity(records.len());
    let mut rejected = 0;

    for (index, record) in records.iter().enumerate() {
        match normalize_record(record, fields, || format!("{source_id}:{index}")) {
            Ok(event) => events.push(event),
            Err(e) => {
                log::debug!("{source_id}: rejected record {index}: {e}");
                rejected += 1;
            }
        }
    }

    if rejected > 0 {
        log::warn!(
            "{source_id}: rejected {rejected} of {} records",
            records.len()
        );
    }

    (events, rejected)
}

fn first_f64(record: &Value, fields: &[String]) -> Option<f64> {
    fields.iter().find_map(|field| get_f64(record, field))
}

fn extract_timestamp(
    record: &Value,
    field: &TimestampField,
) -> Result<chrono::DateTime<chrono::Utc>, RecordError> {
    let unparseable = |value: &Value| RecordError::UnparseableTimestamp {
        value: value.to_string(),
    };

    match field {
        TimestampField::Iso { fields } => {
            let value = fields
                .iter()
                .find_map(|f| get_path(record, f))
                .ok_or(RecordError::MissingTimestamp)?;
            value
                .as_str()
                .and_then(parse_iso_datetime)
                .ok_or_else(|| unparseable(value))
        }
        TimestampField::EpochNanos { field } => {
            let value = get_path(record, field).ok_or(RecordError::MissingTimestamp)?;
            value_as_i64(value)
                .map(from_epoch_nanos)
                .ok_or_else(|| unparseable(value))
        }
        TimestampField::EpochMillis { field } => {
            let value = get_path(record, field).ok_or(RecordError::MissingTimestamp)?;
            value_as_i64(value)
                .and_then(from_epoch_millis)
                .ok_or_else(|| unparseable(value))
        }
    }
}

fn extract_sentiment(value: &Value) -> Option<Sentiment> {
    let label = value
        .get("label")?
        .as_str()?
        .trim()
        .parse::<SentimentLabel>()
        .ok()?;
    let score = value.get("score").and_then(value_as_f64).unwrap_or(0.0);
    Some(Sentiment { label, score })
}
