#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the event map server.
//!
//! Snapshots are served as-is where possible; the types here add the
//! envelope fields (sort, totals) and the taxonomy listing that only the
//! API needs.

use chrono::{DateTime, Utc};
use event_map_analytics_models::{CycleStats, ScoredBucket, Snapshot, SortKey};
use event_map_event_models::{Category, Domain};
use event_map_source_models::BatchOrigin;
use serde::{Deserialize, Serialize};

/// One domain in the category taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDomainNode {
    /// Domain name.
    pub name: String,
    /// Category assigned when no keyword or label matches.
    pub default_category: String,
    /// Every category of the domain.
    pub categories: Vec<String>,
    /// Tiers the domain's buckets can receive, lowest first.
    pub tiers: Vec<String>,
}

impl ApiDomainNode {
    /// Builds the node for `domain` with its tier scale.
    #[must_use]
    pub fn new(domain: Domain, tiers: &[event_map_event_models::Tier]) -> Self {
        Self {
            name: domain.to_string(),
            default_category: domain.default_category().to_string(),
            categories: Category::for_domain(domain)
                .iter()
                .map(ToString::to_string)
                .collect(),
            tiers: tiers.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Snapshot header without the items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSnapshotSummary {
    /// Domain.
    pub domain: Domain,
    /// Window token the snapshot covers.
    pub window: String,
    /// Cycle sequence number.
    pub sequence: u64,
    /// When the cycle finished.
    pub updated_at: DateTime<Utc>,
    /// The instant the window was evaluated at; older than `updated_at`
    /// when a last-known-good batch was served.
    pub data_as_of: DateTime<Utc>,
    /// Where the input batch came from.
    pub origin: BatchOrigin,
    /// Cycle counters.
    pub stats: CycleStats,
}

impl From<&Snapshot> for ApiSnapshotSummary {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            domain: snapshot.domain,
            window: snapshot.window.clone(),
            sequence: snapshot.sequence,
            updated_at: snapshot.updated_at,
            data_as_of: snapshot.data_as_of,
            origin: snapshot.origin,
            stats: snapshot.stats,
        }
    }
}

/// A snapshot's items in the requested order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSnapshot {
    /// Snapshot header.
    #[serde(flatten)]
    pub summary: ApiSnapshotSummary,
    /// Order applied to `items`.
    pub sort: SortKey,
    /// Number of items before `limit` was applied.
    pub total: usize,
    /// Scored buckets.
    pub items: Vec<ScoredBucket>,
}

/// Query parameters for the snapshot endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotQueryParams {
    /// Sort key name (`recency`, `severity`, `intensity`, `category`,
    /// `count`). Defaults to recency.
    pub sort: Option<String>,
    /// Maximum number of items to return.
    pub limit: Option<usize>,
}

/// Query parameters for the gazetteer endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GazetteerQueryParams {
    /// Only return locations in this region (case-insensitive).
    pub region: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is running.
    pub healthy: bool,
    /// Server version.
    pub version: String,
    /// Domains that have published at least one snapshot.
    pub ready_domains: Vec<Domain>,
}

/// Error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
