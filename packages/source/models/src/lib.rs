#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Raw event records and fetched batch types.
//!
//! Every event source (HTTP API, lightning log, embedded fallback) produces
//! [`RawEvent`] records wrapped in an [`EventBatch`]. Raw events are
//! immutable inputs to a single refresh cycle and are discarded at its end.

use chrono::{DateTime, Utc};
use event_map_event_models::{Domain, Sentiment};
use event_map_geography_models::GeoPoint;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A single geo-tagged observation as delivered by a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Source-assigned identifier.
    pub id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Where the event occurred. `None` if the source gave no coordinates.
    #[serde(default)]
    pub geo: Option<GeoPoint>,
    /// Free text (title and body) used for keyword classification.
    #[serde(default)]
    pub free_text: Option<String>,
    /// Category label supplied by the source, if any.
    #[serde(default)]
    pub structured_category: Option<String>,
    /// Upstream sentiment prediction.
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    /// Numeric magnitude (damage score, measured value, strike signal).
    #[serde(default)]
    pub intensity: Option<f64>,
}

/// One input to category classification, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorySource<'a> {
    /// A category label supplied by the source.
    Structured(&'a str),
    /// Free text to scan for keywords.
    FreeText(&'a str),
}

impl RawEvent {
    /// Returns the event's classification inputs: the structured label
    /// first (if present), then the free text (if present).
    pub fn category_sources(&self) -> impl Iterator<Item = CategorySource<'_>> {
        self.structured_category
            .as_deref()
            .map(CategorySource::Structured)
            .into_iter()
            .chain(self.free_text.as_deref().map(CategorySource::FreeText))
    }
}

/// Where a batch of events came from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BatchOrigin {
    /// Freshly fetched from the live source.
    Live,
    /// Reused from the most recent successful live fetch.
    LastKnownGood,
    /// Embedded static batch.
    Fallback,
}

/// A batch of raw events fetched for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBatch {
    /// Identifier of the source that produced the batch.
    pub source_id: String,
    /// Domain the events belong to.
    pub domain: Domain,
    /// How the batch was obtained.
    pub origin: BatchOrigin,
    /// When the batch was fetched.
    pub fetched_at: DateTime<Utc>,
    /// Successfully normalized events.
    pub events: Vec<RawEvent>,
    /// Records the source returned that could not be normalized.
    pub rejected: usize,
}

impl EventBatch {
    /// Returns a copy of this batch relabeled with a different origin.
    #[must_use]
    pub fn with_origin(mut self, origin: BatchOrigin) -> Self {
        self.origin = origin;
        self
    }
}
