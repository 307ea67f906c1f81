//! Scoring, ordering, and flat export of aggregate buckets.

use std::cmp::Ordering;
use std::io;

use event_map_analytics_models::{ExportRecord, ScoredBucket, SortKey};

use crate::aggregate::AggregateMap;
use crate::severity::SeverityRule;

/// Errors writing the CSV export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Flushing the writer failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The CSV output was not valid UTF-8.
    #[error("CSV output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Scores every bucket of `map` with `rule`, in key order.
#[must_use]
pub fn score_buckets(map: &AggregateMap, rule: &SeverityRule) -> Vec<ScoredBucket> {
    map.buckets()
        .map(|bucket| ScoredBucket {
            tier: rule.score(bucket),
            mean_intensity: bucket.mean_intensity(),
            dominant_ratio: bucket.dominant_sentiment_ratio(),
            bucket: bucket.clone(),
        })
        .collect()
}

/// Newest first, then larger count, then location and category ascending.
fn default_order(a: &ScoredBucket, b: &ScoredBucket) -> Ordering {
    b.bucket
        .last_timestamp
        .cmp(&a.bucket.last_timestamp)
        .then_with(|| b.bucket.count.cmp(&a.bucket.count))
        .then_with(|| a.bucket.location.cmp(&b.bucket.location))
        .then_with(|| a.bucket.category.as_ref().cmp(b.bucket.category.as_ref()))
}

fn intensity_order(a: &ScoredBucket, b: &ScoredBucket) -> Ordering {
    match (a.mean_intensity, b.mean_intensity) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Orders `items` by `sort`. Ties under the chosen key fall back to the
/// recency order, so the result is fully determined by the bucket values.
pub fn sort_buckets(items: &mut [ScoredBucket], sort: SortKey) {
    items.sort_by(|a, b| {
        let primary = match sort {
            SortKey::Recency => Ordering::Equal,
            SortKey::Severity => b.tier.rank().cmp(&a.tier.rank()),
            SortKey::Intensity => intensity_order(a, b),
            SortKey::Category => a.bucket.category.as_ref().cmp(b.bucket.category.as_ref()),
            SortKey::Count => b.bucket.count.cmp(&a.bucket.count),
        };
        primary.then_with(|| default_order(a, b))
    });
}

/// Scores and orders the buckets of one cycle.
#[must_use]
pub fn assemble(map: &AggregateMap, rule: &SeverityRule, sort: SortKey) -> Vec<ScoredBucket> {
    let mut items = score_buckets(map, rule);
    sort_buckets(&mut items, sort);
    items
}

/// Flattens scored buckets into export rows, preserving order.
#[must_use]
pub fn export_records(items: &[ScoredBucket]) -> Vec<ExportRecord> {
    items.iter().map(ExportRecord::from).collect()
}

/// Writes `items` as CSV with a header row. The header is written even
/// when there are no items.
///
/// # Errors
///
/// * If serialization or the underlying writer fails
pub fn write_csv<W: io::Write>(writer: W, items: &[ScoredBucket]) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if items.is_empty() {
        csv_writer.write_record(ExportRecord::HEADER)?;
    }
    for record in export_records(items) {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Renders `items` as a CSV string.
///
/// # Errors
///
/// * If serialization fails
pub fn to_csv_string(items: &[ScoredBucket]) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, items)?;
    Ok(String::from_utf8(buffer)?)
}
