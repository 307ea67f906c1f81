//! A single domain's refresh cycle: fetch with a deadline, fall back when
//! the source is unavailable, then run the pipeline off the async runtime.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use event_map_analytics::{DomainPipeline, WindowSpec};
use event_map_analytics_models::Snapshot;
use event_map_event_models::Domain;
use event_map_source::fallback::fallback_batch;
use event_map_source::{EventSource, FetchOptions};
use event_map_source_models::{BatchOrigin, EventBatch};

use crate::RefreshError;

/// Fetches and processes batches for one domain.
///
/// Remembers the last successful live batch so a failing source degrades to
/// stale data before it degrades to the embedded fallback.
pub struct DomainRunner {
    domain: Domain,
    source: Arc<dyn EventSource>,
    pipeline: Arc<DomainPipeline>,
    fetch_timeout: Duration,
    last_good: Mutex<Option<EventBatch>>,
}

impl std::fmt::Debug for DomainRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainRunner")
            .field("domain", &self.domain)
            .field("source", &self.source.id())
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}

impl DomainRunner {
    /// Creates a runner.
    #[must_use]
    pub fn new(
        source: Arc<dyn EventSource>,
        pipeline: DomainPipeline,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            domain: pipeline.domain(),
            source,
            pipeline: Arc::new(pipeline),
            fetch_timeout,
            last_good: Mutex::new(None),
        }
    }

    /// The domain this runner refreshes.
    #[must_use]
    pub const fn domain(&self) -> Domain {
        self.domain
    }

    /// The live source.
    #[must_use]
    pub fn source(&self) -> &Arc<dyn EventSource> {
        &self.source
    }

    /// Fetches a batch. Never fails: a timed-out or failed fetch yields
    /// the last good live batch, or the embedded fallback if there is none.
    pub async fn fetch_batch(&self, options: &FetchOptions) -> EventBatch {
        let error = match tokio::time::timeout(self.fetch_timeout, self.source.fetch(options)).await
        {
            Ok(Ok(batch)) => {
                log::debug!(
                    "{}: fetched {} events from {} ({} rejected)",
                    self.domain,
                    batch.events.len(),
                    batch.source_id,
                    batch.rejected
                );
                if batch.origin == BatchOrigin::Live {
                    *self.last_good.lock().unwrap_or_else(PoisonError::into_inner) =
                        Some(batch.clone());
                }
                return batch;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {:?}", self.fetch_timeout),
        };

        self.fallback(&error, options.now)
    }

    fn fallback(&self, error: &str, now: DateTime<Utc>) -> EventBatch {
        let last_good = self
            .last_good
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Some(batch) = last_good {
            log::warn!(
                "{}: fetch from {} failed ({error}), reusing last good batch from {}",
                self.domain,
                self.source.id(),
                batch.fetched_at
            );
            return batch.with_origin(BatchOrigin::LastKnownGood);
        }

        log::warn!(
            "{}: fetch from {} failed ({error}), serving embedded fallback",
            self.domain,
            self.source.id()
        );
        fallback_batch(self.domain, now)
    }

    /// Runs one full cycle tagged with `sequence`.
    ///
    /// # Errors
    ///
    /// * If the pipeline task panics or is cancelled
    pub async fn run_cycle(
        &self,
        window: &WindowSpec,
        sequence: u64,
    ) -> Result<Snapshot, RefreshError> {
        self.run_cycle_at(window, sequence, Utc::now()).await
    }

    /// Runs one full cycle as of `now`.
    ///
    /// A reused last-known-good batch is windowed at its own fetch time, so
    /// its events stay visible until a live fetch succeeds again.
    ///
    /// # Errors
    ///
    /// * If the pipeline task panics or is cancelled
    pub async fn run_cycle_at(
        &self,
        window: &WindowSpec,
        sequence: u64,
        now: DateTime<Utc>,
    ) -> Result<Snapshot, RefreshError> {
        let batch = self
            .fetch_batch(&FetchOptions::new(window.token(), now))
            .await;

        let pipeline = Arc::clone(&self.pipeline);
        let window = window.clone();
        let snapshot =
            tokio::task::spawn_blocking(move || pipeline.run(batch, &window, sequence, now))
                .await?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use event_map_analytics::{DomainConfig, parse_window};
    use event_map_geography::{Gazetteer, Resolver};
    use event_map_geography_models::GeoPoint;
    use event_map_source::{RawEvent, SourceError};

    use super::*;

    /// Serves scripted responses in order; the last one repeats.
    struct ScriptedSource {
        script: Vec<Script>,
        calls: AtomicUsize,
    }

    #[derive(Clone, Copy)]
    enum Script {
        Live,
        Fail,
        Hang,
    }

    impl ScriptedSource {
        fn new(script: Vec<Script>) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        fn id(&self) -> &str {
            "scripted"
        }

        fn name(&self) -> &str {
            "Scripted test source"
        }

        fn domain(&self) -> Domain {
            Domain::Hazard
        }

        async fn fetch(&self, options: &FetchOptions) -> Result<EventBatch, SourceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script[call.min(self.script.len() - 1)] {
                Script::Live => Ok(EventBatch {
                    source_id: "scripted".to_string(),
                    domain: Domain::Hazard,
                    origin: BatchOrigin::Live,
                    fetched_at: options.now,
                    events: vec![RawEvent {
                        id: format!("live{call}"),
                        timestamp: options.now,
                        geo: Some(GeoPoint::new(39.9334, 32.8597)),
                        free_text: Some("Ankara'da deprem".to_string()),
                        structured_category: None,
                        sentiment: None,
                        intensity: None,
                    }],
                    rejected: 0,
                }),
                Script::Fail => Err(SourceError::Format {
                    message: "HTTP 503".to_string(),
                }),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(3_600)).await;
                    Err(SourceError::Format {
                        message: "unreachable".to_string(),
                    })
                }
            }
        }
    }

    fn runner(script: Vec<Script>) -> DomainRunner {
        let resolver = Arc::new(Resolver::with_default_threshold(Arc::new(
            Gazetteer::turkey(),
        )));
        DomainRunner::new(
            Arc::new(ScriptedSource::new(script)),
            DomainPipeline::new(&DomainConfig::builtin(Domain::Hazard), resolver),
            Duration::from_secs(5),
        )
    }

    fn options() -> FetchOptions {
        FetchOptions::new("24h", Utc::now())
    }

    #[tokio::test]
    async fn failure_without_history_uses_embedded_fallback() {
        let batch = runner(vec![Script::Fail]).fetch_batch(&options()).await;
        assert_eq!(batch.origin, BatchOrigin::Fallback);
        assert_eq!(batch.source_id, "hazard_fallback");
        assert!(!batch.events.is_empty());
    }

    #[tokio::test]
    async fn failure_after_success_reuses_last_good_batch() {
        let runner = runner(vec![Script::Live, Script::Fail]);
        let live = runner.fetch_batch(&options()).await;
        assert_eq!(live.origin, BatchOrigin::Live);

        let stale = runner.fetch_batch(&options()).await;
        assert_eq!(stale.origin, BatchOrigin::LastKnownGood);
        assert_eq!(stale.events, live.events);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_falls_back() {
        let batch = runner(vec![Script::Hang]).fetch_batch(&options()).await;
        assert_eq!(batch.origin, BatchOrigin::Fallback);
    }

    #[tokio::test]
    async fn cycle_produces_tagged_snapshot() {
        let snapshot = runner(vec![Script::Live])
            .run_cycle(&parse_window("1h").unwrap(), 42)
            .await
            .unwrap();
        assert_eq!(snapshot.sequence, 42);
        assert_eq!(snapshot.origin, BatchOrigin::Live);
        assert_eq!(snapshot.window, "1h");
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].bucket.location, "Ankara");
    }

    #[tokio::test]
    async fn stale_cycle_keeps_last_good_events_past_the_window() {
        let runner = runner(vec![Script::Live, Script::Fail]);
        let window = parse_window("15m").unwrap();
        let first = Utc::now();

        let live = runner.run_cycle_at(&window, 1, first).await.unwrap();
        assert_eq!(live.items.len(), 1);

        let later = first + chrono::Duration::minutes(20);
        let stale = runner.run_cycle_at(&window, 2, later).await.unwrap();
        assert_eq!(stale.origin, BatchOrigin::LastKnownGood);
        assert_eq!(stale.updated_at, later);
        assert_eq!(stale.data_as_of, first);
        assert_eq!(stale.stats.in_window, 1);
        assert_eq!(stale.items, live.items);
    }

    #[tokio::test]
    async fn fallback_cycle_stays_inside_window() {
        let snapshot = runner(vec![Script::Fail])
            .run_cycle(&parse_window("24h").unwrap(), 1)
            .await
            .unwrap();
        assert_eq!(snapshot.origin, BatchOrigin::Fallback);
        assert!(snapshot.stats.in_window > 0);
        assert!(!snapshot.items.is_empty());
    }
}
