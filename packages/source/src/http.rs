//! HTTP JSON event source.
//!
//! Issues `GET {api_url}?window={token}` and accepts either a bare JSON
//! array of records or an object holding the array under a configured key.

use async_trait::async_trait;
use event_map_event_models::Domain;
use event_map_source_models::{BatchOrigin, EventBatch};
use serde_json::Value;

use crate::normalize::normalize_records;
use crate::retry;
use crate::source_def::{FetcherConfig, SourceDefinition};
use crate::{EventSource, FetchOptions, SourceError};

/// Fetches records from a JSON HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpJsonSource {
    definition: SourceDefinition,
    client: reqwest::Client,
}

impl HttpJsonSource {
    /// Creates a source from its definition and a shared HTTP client.
    #[must_use]
    pub const fn new(definition: SourceDefinition, client: reqwest::Client) -> Self {
        Self { definition, client }
    }
}

/// Pulls the records array out of a response body.
///
/// # Errors
///
/// Returns [`SourceError::Format`] if the body is neither an array nor an
/// object with an array under `records_key`.
pub fn extract_records(body: Value, records_key: Option<&str>) -> Result<Vec<Value>, SourceError> {
    match (body, records_key) {
        (Value::Array(records), _) => Ok(records),
        (Value::Object(mut map), Some(key)) => match map.remove(key) {
            Some(Value::Array(records)) => Ok(records),
            Some(other) => Err(SourceError::Format {
                message: format!("\"{key}\" is not an array (got {})", type_name(&other)),
            }),
            None => Err(SourceError::Format {
                message: format!("response has no \"{key}\" field"),
            }),
        },
        (other, _) => Err(SourceError::Format {
            message: format!("expected a records array, got {}", type_name(&other)),
        }),
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl EventSource for HttpJsonSource {
    fn id(&self) -> &str {
        &self.definition.id
    }

    fn name(&self) -> &str {
        &self.definition.name
    }

    fn domain(&self) -> Domain {
        self.definition.domain
    }

    async fn fetch(&self, options: &FetchOptions) -> Result<EventBatch, SourceError> {
        let FetcherConfig::HttpJson {
            api_url,
            window_param,
            records_key,
            retry: policy,
        } = &self.definition.fetcher
        else {
            return Err(SourceError::Format {
                message: format!("{} is not an HTTP JSON source", self.definition.id),
            });
        };
        log::debug!("{}: GET {api_url} ({window_param}={})", self.id(), options.window);
        let body = retry::send_json(policy, || {
            self.client
                .get(api_url)
                .query(&[(window_param.as_str(), options.window.as_str())])
        })
        .await?;

        let records = extract_records(body, records_key.as_deref())?;
        let (events, rejected) = normalize_records(self.id(), &records, &self.definition.fields);
        log::info!(
            "{}: fetched {} records ({} normalized)",
            self.id(),
            records.len(),
            events.len()
        );

        Ok(EventBatch {
            source_id: self.definition.id.clone(),
            domain: self.definition.domain,
            origin: BatchOrigin::Live,
            fetched_at: options.now,
            events,
            rejected,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_bare_array() {
        let records = extract_records(json!([{"a": 1}, {"a": 2}]), Some("data")).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn accepts_wrapped_array() {
        let records = extract_records(json!({"data": [{"a": 1}], "total": 1}), Some("data")).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn rejects_object_without_key() {
        let result = extract_records(json!({"items": []}), Some("data"));
        assert!(matches!(result, Err(SourceError::Format { .. })));
        let result = extract_records(json!({"data": []}), None);
        assert!(matches!(result, Err(SourceError::Format { .. })));
    }

    #[test]
    fn rejects_non_array_value() {
        let result = extract_records(json!({"data": "oops"}), Some("data"));
        assert!(matches!(result, Err(SourceError::Format { message }) if message.contains("string")));
    }
}
