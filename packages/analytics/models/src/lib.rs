#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Resolved event, aggregate bucket, and snapshot types.
//!
//! These are the values that flow out of the aggregation pipeline: events
//! annotated with a location and category, per-(location, category)
//! buckets, scored buckets, and the per-domain [`Snapshot`] that readers
//! consume.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use event_map_event_models::{Category, Domain, SentimentLabel, Tier};
use event_map_geography_models::{GeoPoint, MatchKind};
use event_map_source_models::{BatchOrigin, RawEvent};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A raw event annotated with its resolved location and category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedEvent {
    /// The original event.
    pub event: RawEvent,
    /// Location label (gazetteer name or formatted coordinate).
    pub location: String,
    /// Distance to the nearest gazetteer entry.
    pub distance_km: Option<f64>,
    /// How the label was produced.
    pub match_kind: MatchKind,
    /// Assigned category.
    pub category: Category,
    /// Representative coordinates for the location label.
    pub anchor: Option<GeoPoint>,
}

impl ResolvedEvent {
    /// The aggregation key for this event.
    #[must_use]
    pub fn key(&self) -> BucketKey {
        BucketKey {
            location: self.location.clone(),
            category: self.category,
        }
    }
}

/// Aggregation key: one bucket per (location, category).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    /// Location label.
    pub location: String,
    /// Category.
    pub category: Category,
}

/// Per-bucket count of sentiment labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentTally {
    /// Events labeled positive.
    pub positive: u64,
    /// Events labeled neutral or carrying no sentiment.
    pub neutral: u64,
    /// Events labeled negative.
    pub negative: u64,
}

impl SentimentTally {
    /// Counts one event. Missing sentiment counts as neutral.
    pub const fn record(&mut self, label: Option<SentimentLabel>) {
        match label {
            Some(SentimentLabel::Positive) => self.positive += 1,
            Some(SentimentLabel::Negative) => self.negative += 1,
            Some(SentimentLabel::Neutral) | None => self.neutral += 1,
        }
    }

    /// Sum of all three components.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.positive + self.neutral + self.negative
    }

    /// Adds another tally into this one.
    pub const fn merge(&mut self, other: &Self) {
        self.positive += other.positive;
        self.neutral += other.neutral;
        self.negative += other.negative;
    }
}

/// Accumulated statistics for one (location, category) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateBucket {
    /// Location label.
    pub location: String,
    /// Category.
    pub category: Category,
    /// Number of events.
    pub count: u64,
    /// Sentiment label counts; components sum to `count`.
    pub sentiment: SentimentTally,
    /// Sum of finite intensities.
    pub intensity_sum: f64,
    /// Number of events that carried a finite intensity.
    pub intensity_count: u64,
    /// Newest event timestamp.
    pub last_timestamp: DateTime<Utc>,
    /// Representative coordinates, where available.
    pub coordinates: Option<GeoPoint>,
}

impl AggregateBucket {
    /// Starts a bucket from its first event.
    #[must_use]
    pub fn from_event(event: &ResolvedEvent) -> Self {
        let mut bucket = Self {
            location: event.location.clone(),
            category: event.category,
            count: 0,
            sentiment: SentimentTally::default(),
            intensity_sum: 0.0,
            intensity_count: 0,
            last_timestamp: event.event.timestamp,
            coordinates: event.anchor,
        };
        bucket.add(event);
        bucket
    }

    /// Folds one event into the bucket.
    pub fn add(&mut self, event: &ResolvedEvent) {
        self.count += 1;
        self.sentiment
            .record(event.event.sentiment.map(|sentiment| sentiment.label));
        if let Some(intensity) = event.event.intensity.filter(|v| v.is_finite()) {
            self.intensity_sum += intensity;
            self.intensity_count += 1;
        }
        self.last_timestamp = self.last_timestamp.max(event.event.timestamp);
        self.coordinates = pick_coordinates(self.coordinates, event.anchor);
    }

    /// Combines another bucket with the same key into this one.
    ///
    /// Associative and commutative, so shards can be merged in any order.
    pub fn merge(&mut self, other: &Self) {
        self.count += other.count;
        self.sentiment.merge(&other.sentiment);
        self.intensity_sum += other.intensity_sum;
        self.intensity_count += other.intensity_count;
        self.last_timestamp = self.last_timestamp.max(other.last_timestamp);
        self.coordinates = pick_coordinates(self.coordinates, other.coordinates);
    }

    /// The bucket's key.
    #[must_use]
    pub fn key(&self) -> BucketKey {
        BucketKey {
            location: self.location.clone(),
            category: self.category,
        }
    }

    /// Mean of the recorded intensities, or `None` if none were recorded.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_intensity(&self) -> Option<f64> {
        (self.intensity_count > 0).then(|| self.intensity_sum / self.intensity_count as f64)
    }

    /// `max(positive, negative) / count`, or 0 for an empty bucket.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn dominant_sentiment_ratio(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sentiment.positive.max(self.sentiment.negative) as f64 / self.count as f64
    }
}

/// Chooses between two candidate anchors independently of argument order:
/// a present anchor beats a missing one, and of two the lexicographically
/// smaller `(lat, lon)` wins.
fn pick_coordinates(a: Option<GeoPoint>, b: Option<GeoPoint>) -> Option<GeoPoint> {
    match (a, b) {
        (Some(a), Some(b)) => {
            let order = a.lat.total_cmp(&b.lat).then(a.lon.total_cmp(&b.lon));
            Some(if order == Ordering::Greater { b } else { a })
        }
        (a, b) => a.or(b),
    }
}

/// A bucket with its derived tier and metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredBucket {
    /// The aggregated statistics.
    #[serde(flatten)]
    pub bucket: AggregateBucket,
    /// Qualitative tier.
    pub tier: Tier,
    /// Mean intensity (the primary metric), if any.
    pub mean_intensity: Option<f64>,
    /// Dominant sentiment ratio in `[0, 1]`.
    pub dominant_ratio: f64,
}

/// Counters describing one refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleStats {
    /// Records delivered by the source, including rejected ones.
    pub fetched: usize,
    /// Records excluded as malformed (at the source or in the pipeline).
    pub rejected: usize,
    /// Valid events inside the window; equals the sum of bucket counts.
    pub in_window: usize,
    /// Number of buckets produced.
    pub buckets: usize,
}

/// Ordering applied to a snapshot's items.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SortKey {
    /// Newest first, then count desc, location asc, category asc.
    #[default]
    Recency,
    /// Highest tier first.
    Severity,
    /// Highest mean intensity first; buckets without intensity last.
    Intensity,
    /// Category name ascending.
    Category,
    /// Largest count first.
    Count,
}

impl SortKey {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Recency,
            Self::Severity,
            Self::Intensity,
            Self::Category,
            Self::Count,
        ]
    }
}

/// The published result of one refresh cycle for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Domain.
    pub domain: Domain,
    /// Window token the snapshot covers.
    pub window: String,
    /// Monotonic cycle sequence number.
    pub sequence: u64,
    /// When the cycle finished.
    pub updated_at: DateTime<Utc>,
    /// The instant the window was evaluated at. Equals `updated_at` except
    /// for last-known-good snapshots, where it is the reused batch's fetch
    /// time.
    pub data_as_of: DateTime<Utc>,
    /// Where the input batch came from.
    pub origin: BatchOrigin,
    /// Cycle counters.
    pub stats: CycleStats,
    /// Scored buckets in default order.
    pub items: Vec<ScoredBucket>,
}

/// One flat export row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Newest event timestamp (RFC 3339).
    pub timestamp: String,
    /// Location label.
    pub location: String,
    /// Category name.
    pub category: String,
    /// Tier name.
    pub tier: String,
    /// Event count.
    pub count: u64,
    /// Positive sentiment count.
    pub positive: u64,
    /// Neutral sentiment count.
    pub neutral: u64,
    /// Negative sentiment count.
    pub negative: u64,
    /// Mean intensity; empty when the bucket has none.
    pub mean_intensity: Option<f64>,
    /// Dominant sentiment ratio.
    pub dominant_ratio: f64,
    /// `"lat, lon"`, or empty.
    pub coordinates: String,
}

impl ExportRecord {
    /// Column names, in serialization order.
    pub const HEADER: [&'static str; 11] = [
        "timestamp",
        "location",
        "category",
        "tier",
        "count",
        "positive",
        "neutral",
        "negative",
        "mean_intensity",
        "dominant_ratio",
        "coordinates",
    ];
}

impl From<&ScoredBucket> for ExportRecord {
    fn from(scored: &ScoredBucket) -> Self {
        let bucket = &scored.bucket;
        Self {
            timestamp: bucket.last_timestamp.to_rfc3339(),
            location: bucket.location.clone(),
            category: bucket.category.to_string(),
            tier: scored.tier.to_string(),
            count: bucket.count,
            positive: bucket.sentiment.positive,
            neutral: bucket.sentiment.neutral,
            negative: bucket.sentiment.negative,
            mean_intensity: scored.mean_intensity,
            dominant_ratio: scored.dominant_ratio,
            coordinates: bucket
                .coordinates
                .map(|point| format!("{}, {}", point.lat, point.lon))
                .unwrap_or_default(),
        }
    }
}
