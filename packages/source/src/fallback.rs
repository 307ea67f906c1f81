//! Embedded fallback batches.
//!
//! Each domain ships a small static batch that is served when its live
//! source fails and no previous live batch exists. The stored timestamps are
//! rebased at serve time so the newest event lands exactly on the fetch
//! time, keeping the batch inside any recency window.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use event_map_event_models::Domain;
use event_map_source_models::{BatchOrigin, EventBatch};

use crate::{EventSource, FetchOptions, RawEvent, SourceError};

/// Fallback JSON embedded at compile time, one per domain.
const FALLBACK_JSONS: &[(Domain, &str, &str)] = &[
    (
        Domain::Hazard,
        "hazard.json",
        include_str!("../fallback/hazard.json"),
    ),
    (
        Domain::Sustainability,
        "sustainability.json",
        include_str!("../fallback/sustainability.json"),
    ),
    (
        Domain::Lightning,
        "lightning.json",
        include_str!("../fallback/lightning.json"),
    ),
];

/// Returns the embedded fallback events for a domain, with their stored
/// timestamps.
///
/// # Panics
///
/// Panics if the embedded JSON is malformed (a compile-time guarantee
/// since the files are embedded).
#[must_use]
pub fn fallback_events(domain: Domain) -> Vec<RawEvent> {
    FALLBACK_JSONS
        .iter()
        .find(|(d, _, _)| *d == domain)
        .map(|(_, name, json)| {
            serde_json::from_str(json).unwrap_or_else(|e| panic!("Failed to parse {name}: {e}"))
        })
        .unwrap_or_default()
}

/// Shifts every timestamp by the same offset so the newest event equals
/// `now`. Relative spacing between events is preserved.
#[must_use]
pub fn rebase(mut events: Vec<RawEvent>, now: DateTime<Utc>) -> Vec<RawEvent> {
    let Some(newest) = events.iter().map(|e| e.timestamp).max() else {
        return events;
    };
    let offset = now - newest;
    for event in &mut events {
        event.timestamp += offset;
    }
    events
}

/// Builds the fallback batch for `domain` as of `now`.
#[must_use]
pub fn fallback_batch(domain: Domain, now: DateTime<Utc>) -> EventBatch {
    EventBatch {
        source_id: format!("{domain}_fallback"),
        domain,
        origin: BatchOrigin::Fallback,
        fetched_at: now,
        events: rebase(fallback_events(domain), now),
        rejected: 0,
    }
}

/// An [`EventSource`] that always serves the embedded fallback batch.
///
/// Used when a domain has no live source configured.
#[derive(Debug, Clone)]
pub struct FallbackSource {
    id: String,
    domain: Domain,
}

impl FallbackSource {
    /// Creates the fallback source for a domain.
    #[must_use]
    pub fn new(domain: Domain) -> Self {
        Self {
            id: format!("{domain}_fallback"),
            domain,
        }
    }
}

#[async_trait]
impl EventSource for FallbackSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Embedded fallback batch"
    }

    fn domain(&self) -> Domain {
        self.domain
    }

    async fn fetch(&self, options: &FetchOptions) -> Result<EventBatch, SourceError> {
        Ok(fallback_batch(self.domain, options.now))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn every_domain_has_fallback_events() {
        for domain in Domain::all() {
            assert!(
                !fallback_events(*domain).is_empty(),
                "{domain} fallback batch is empty"
            );
        }
    }

    #[test]
    fn fallback_ids_are_unique() {
        for domain in Domain::all() {
            let events = fallback_events(*domain);
            let mut ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), events.len(), "{domain} has duplicate ids");
        }
    }

    #[test]
    fn rebase_moves_newest_to_now_and_keeps_spacing() {
        let events = fallback_events(Domain::Hazard);
        let span_before = events.iter().map(|e| e.timestamp).max().unwrap()
            - events.iter().map(|e| e.timestamp).min().unwrap();

        let now = DateTime::from_timestamp(1_800_000_000, 0).unwrap();
        let rebased = rebase(events, now);
        let newest = rebased.iter().map(|e| e.timestamp).max().unwrap();
        let oldest = rebased.iter().map(|e| e.timestamp).min().unwrap();

        assert_eq!(newest, now);
        assert_eq!(newest - oldest, span_before);
    }

    #[test]
    fn rebase_of_empty_is_empty() {
        assert!(rebase(vec![], Utc::now()).is_empty());
    }

    #[test]
    fn hazard_fallback_fits_in_a_day() {
        let now = Utc::now();
        let batch = fallback_batch(Domain::Hazard, now);
        assert_eq!(batch.origin, BatchOrigin::Fallback);
        assert!(
            batch
                .events
                .iter()
                .all(|e| e.timestamp <= now && e.timestamp >= now - Duration::hours(24))
        );
    }

    #[tokio::test]
    async fn fallback_source_serves_batch() {
        let source = FallbackSource::new(Domain::Lightning);
        let now = Utc::now();
        let batch = source.fetch(&FetchOptions::new("1h", now)).await.unwrap();
        assert_eq!(batch.source_id, "lightning_fallback");
        assert_eq!(batch.fetched_at, now);
        assert!(!batch.events.is_empty());
    }
}
