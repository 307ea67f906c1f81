#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Event source trait, fetchers, and record normalization.
//!
//! Each data provider implements the [`EventSource`] trait to fetch one
//! batch of raw records for a time window and normalize them into
//! [`RawEvent`]s. Sources are described by embedded TOML definitions (see
//! [`registry`]); every domain also has an embedded fallback batch used when
//! its live source is unavailable.

pub mod fallback;
pub mod http;
pub mod jsonl;
pub mod normalize;
pub mod parsing;
pub mod registry;
pub mod retry;
pub mod source_def;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use event_map_event_models::Domain;
use event_map_source_models::EventBatch;

pub use event_map_source_models::RawEvent;

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The response did not have the expected shape or status.
    #[error("Format error: {message}")]
    Format {
        /// Description of what went wrong.
        message: String,
    },
}

/// Parameters for a single fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Window token forwarded to the source (e.g. `"24h"`).
    pub window: String,
    /// Reference time for the fetch.
    pub now: DateTime<Utc>,
}

impl FetchOptions {
    /// Creates options for the given window token at `now`.
    #[must_use]
    pub fn new(window: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            window: window.into(),
            now,
        }
    }
}

/// Trait that all event sources must implement.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Returns a unique identifier for this source (e.g., `"hazard_api"`).
    fn id(&self) -> &str;

    /// Returns the human-readable name of this source.
    fn name(&self) -> &str;

    /// Returns the domain whose events this source produces.
    fn domain(&self) -> Domain;

    /// Fetches and normalizes one batch of events.
    ///
    /// Records that cannot be normalized are counted in
    /// [`EventBatch::rejected`] rather than failing the batch.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the transport fails or the payload cannot
    /// be interpreted at all.
    async fn fetch(&self, options: &FetchOptions) -> Result<EventBatch, SourceError>;
}
