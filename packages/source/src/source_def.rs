//! Config-driven event source definition.
//!
//! [`SourceDefinition`] captures everything unique about a data source in a
//! serializable config struct: which domain it feeds, how to fetch it, and
//! which record fields carry each [`RawEvent`](crate::RawEvent) attribute.

use std::path::PathBuf;
use std::sync::Arc;

use event_map_event_models::Domain;
use serde::Deserialize;

use crate::EventSource;
use crate::http::HttpJsonSource;
use crate::jsonl::JsonlFileSource;
use crate::retry::RetryPolicy;

/// A complete, config-driven event source definition.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDefinition {
    /// Unique identifier (e.g., `"hazard_api"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Domain this source produces events for.
    pub domain: Domain,
    /// How to fetch raw records.
    pub fetcher: FetcherConfig,
    /// Field name mappings for normalization.
    pub fields: FieldMapping,
}

/// How to fetch raw records.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetcherConfig {
    /// `GET {api_url}?{window_param}={window}` returning JSON.
    HttpJson {
        /// Endpoint URL.
        api_url: String,
        /// Query parameter carrying the window token.
        #[serde(default = "default_window_param")]
        window_param: String,
        /// Key of the records array when the response is an object.
        /// `None` means the response is a bare array.
        #[serde(default)]
        records_key: Option<String>,
        /// Retry budget for the request.
        #[serde(default)]
        retry: RetryPolicy,
    },
    /// A local JSON-lines file, one record per line.
    JsonlFile {
        /// File path. Relative paths resolve against the working
        /// directory.
        path: PathBuf,
    },
}

fn default_window_param() -> String {
    "window".to_string()
}

/// Record field names, each a dotted path into the JSON record. List
/// fields are tried in order and the first present value wins.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMapping {
    /// Identifier fields.
    #[serde(default)]
    pub id: Vec<String>,
    /// How to extract the event timestamp.
    pub timestamp: TimestampField,
    /// Latitude fields.
    pub lat: Vec<String>,
    /// Longitude fields.
    pub lon: Vec<String>,
    /// Text fields, joined with a space (skipping empty ones).
    #[serde(default)]
    pub text: Vec<String>,
    /// Structured category label fields.
    #[serde(default)]
    pub category: Vec<String>,
    /// Path to a `{label, score}` sentiment object.
    #[serde(default)]
    pub sentiment: Option<String>,
    /// Numeric intensity fields.
    #[serde(default)]
    pub intensity: Vec<String>,
}

/// How to extract the event timestamp from a raw record.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimestampField {
    /// ISO 8601 string.
    Iso {
        /// Candidate fields, tried in order.
        fields: Vec<String>,
    },
    /// Integer epoch nanoseconds.
    EpochNanos {
        /// JSON field name.
        field: String,
    },
    /// Integer epoch milliseconds.
    EpochMillis {
        /// JSON field name.
        field: String,
    },
}

impl SourceDefinition {
    /// Builds the runnable source for this definition.
    #[must_use]
    pub fn build(&self, client: &reqwest::Client) -> Arc<dyn EventSource> {
        match &self.fetcher {
            FetcherConfig::HttpJson { .. } => {
                Arc::new(HttpJsonSource::new(self.clone(), client.clone()))
            }
            FetcherConfig::JsonlFile { .. } => Arc::new(JsonlFileSource::new(self.clone())),
        }
    }

    /// Short description of where the records come from.
    #[must_use]
    pub fn location(&self) -> String {
        match &self.fetcher {
            FetcherConfig::HttpJson { api_url, .. } => api_url.clone(),
            FetcherConfig::JsonlFile { path } => path.display().to_string(),
        }
    }
}

/// Parses a TOML string into a [`SourceDefinition`].
///
/// # Errors
///
/// Returns an error string if the TOML is malformed or missing required
/// fields.
pub fn parse_source_toml(toml_str: &str) -> Result<SourceDefinition, String> {
    toml::de::from_str(toml_str).map_err(|e| e.to_string())
}
