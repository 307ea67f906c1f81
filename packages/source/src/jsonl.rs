//! JSON-lines file source, used for lightning strike logs.
//!
//! Each non-blank line is one JSON record. Lines that are not valid JSON
//! count as rejected records; they never fail the batch.

use async_trait::async_trait;
use event_map_event_models::Domain;
use event_map_source_models::{BatchOrigin, EventBatch};
use serde_json::Value;

use crate::normalize::normalize_records;
use crate::source_def::{FetcherConfig, SourceDefinition};
use crate::{EventSource, FetchOptions, SourceError};

/// Reads records from a local JSON-lines file.
#[derive(Debug, Clone)]
pub struct JsonlFileSource {
    definition: SourceDefinition,
}

impl JsonlFileSource {
    /// Creates a source from its definition.
    #[must_use]
    pub const fn new(definition: SourceDefinition) -> Self {
        Self { definition }
    }
}

/// Splits JSON-lines text into records, returning the parsed records and
/// the number of malformed lines.
#[must_use]
pub fn parse_lines(source_id: &str, text: &str) -> (Vec<Value>, usize) {
    let mut records = Vec::new();
    let mut malformed = 0;

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                log::debug!("{source_id}: line {}: {e}", line_no + 1);
                malformed += 1;
            }
        }
    }

    (records, malformed)
}

#[async_trait]
impl EventSource for JsonlFileSource {
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
        let FetcherConfig::JsonlFile { path } = &self.definition.fetcher else {
            return Err(SourceError::Format {
                message: format!("{} is not a JSON-lines source", self.definition.id),
            });
        };

        let text = tokio::fs::read_to_string(path).await?;
        let (records, malformed) = parse_lines(self.id(), &text);
        let (events, rejected) = normalize_records(self.id(), &records, &self.definition.fields);
        log::info!(
            "{}: read {} lines from {} ({} normalized)",
            self.id(),
            records.len() + malformed,
            path.display(),
            events.len()
        );

        Ok(EventBatch {
            source_id: self.definition.id.clone(),
            domain: self.definition.domain,
            origin: BatchOrigin::Live,
            fetched_at: options.now,
            events,
            rejected: rejected + malformed,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::source_def::parse_source_toml;

    #[test]
    fn skips_blank_and_counts_malformed_lines() {
        let text = "{\"a\":1}\n\n   \nnot json\n{\"a\":2}\n";
        let (records, malformed) = parse_lines("t", text);
        assert_eq!(records.len(), 2);
        assert_eq!(malformed, 1);
    }

    #[tokio::test]
    async fn reads_lightning_file() {
        let dir = std::env::temp_dir().join("event_map_jsonl_source_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("strikes.jsonl");
        std::fs::write(
            &path,
            "{\"strike_time\":1705314600000000000,\"latitude\":39.9,\"longitude\":32.8,\"mds\":42}\n\
             {\"latitude\":39.9,\"longitude\":32.8}\n\
             garbage\n",
        )
        .unwrap();

        let definition = parse_source_toml(&format!(
            r#"
            id = "strikes"
            name = "Strikes"
            domain = "lightning"

            [fetcher]
            type = "jsonl_file"
            path = "{}"

            [fields]
            timestamp = {{ type = "epoch_nanos", field = "strike_time" }}
            lat = ["latitude"]
            lon = ["longitude"]
            intensity = ["mds"]
            "#,
            path.display()
        ))
        .unwrap();

        let source = JsonlFileSource::new(definition);
        let now = DateTime::from_timestamp(1_705_315_000, 0).unwrap();
        let batch = source.fetch(&FetchOptions::new("1h", now)).await.unwrap();

        assert_eq!(batch.domain, Domain::Lightning);
        assert_eq!(batch.origin, BatchOrigin::Live);
        assert_eq!(batch.events.len(), 1);
        assert_eq!(batch.rejected, 2);
        assert_eq!(batch.events[0].intensity, Some(42.0));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let definition = parse_source_toml(
            r#"
            id = "missing"
            name = "Missing"
            domain = "lightning"
            [fetcher]
            type = "jsonl_file"
            path = "/nonexistent/event_map/strikes.jsonl"
            [fields]
            timestamp = { type = "epoch_nanos", field = "strike_time" }
            lat = ["latitude"]
            lon = ["longitude"]
            "#,
        )
        .unwrap();
        let source = JsonlFileSource::new(definition);
        let result = source
            .fetch(&FetchOptions::new("1h", chrono::Utc::now()))
            .await;
        assert!(matches!(result, Err(SourceError::Io(_))));
    }
}
