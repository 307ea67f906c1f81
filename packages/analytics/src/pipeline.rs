//! One refresh cycle for one domain: validate, window, resolve, classify,
//! aggregate, score, and assemble a [`Snapshot`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use event_map_analytics_models::{CycleStats, ResolvedEvent, Snapshot, SortKey};
use event_map_event_models::Domain;
use event_map_geography::Resolver;
use event_map_geography_models::MatchKind;
use event_map_source_models::{BatchOrigin, EventBatch, RawEvent};
use rayon::prelude::*;

use crate::aggregate::{self, DEFAULT_SHARD_SIZE};
use crate::assemble::assemble;
use crate::classify::Classifier;
use crate::config::DomainConfig;
use crate::severity::SeverityRule;
use crate::window::WindowSpec;

/// Batches at least this large are resolved and aggregated on the rayon
/// pool.
pub const DEFAULT_PARALLEL_MIN: usize = 10_000;

/// Stateless per-domain pipeline. Cheap to share; every [`run`] starts
/// from scratch.
///
/// [`run`]: DomainPipeline::run
#[derive(Debug, Clone)]
pub struct DomainPipeline {
    domain: Domain,
    classifier: Classifier,
    severity: SeverityRule,
    resolver: Arc<Resolver>,
    parallel_min: usize,
    shard_size: usize,
}

impl DomainPipeline {
    /// Builds a pipeline from a validated domain table.
    #[must_use]
    pub fn new(config: &DomainConfig, resolver: Arc<Resolver>) -> Self {
        Self {
            domain: config.domain,
            classifier: config.classifier(),
            severity: config.severity.clone(),
            resolver,
            parallel_min: DEFAULT_PARALLEL_MIN,
            shard_size: DEFAULT_SHARD_SIZE,
        }
    }

    /// Sets the batch size at which work moves to the rayon pool.
    #[must_use]
    pub const fn with_parallel_threshold(mut self, parallel_min: usize) -> Self {
        self.parallel_min = parallel_min;
        self
    }

    /// The domain this pipeline serves.
    #[must_use]
    pub const fn domain(&self) -> Domain {
        self.domain
    }

    /// The classifier in use.
    #[must_use]
    pub const fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// The severity rule in use.
    #[must_use]
    pub const fn severity(&self) -> &SeverityRule {
        &self.severity
    }

    /// Resolves and classifies one event. Returns `None` for events
    /// without usable coordinates.
    #[must_use]
    pub fn resolve(&self, event: RawEvent) -> Option<ResolvedEvent> {
        let geo = event.geo.filter(|point| point.is_valid())?;
        let resolution = self.resolver.resolve(geo.lat, geo.lon);
        if resolution.kind == MatchKind::Unknown {
            return None;
        }
        let category = self.classifier.classify(&event);
        Some(ResolvedEvent {
            event,
            location: resolution.label,
            distance_km: resolution.distance_km,
            match_kind: resolution.kind,
            category,
            anchor: resolution.anchor,
        })
    }

    /// Runs one cycle over `batch` and returns the resulting snapshot.
    ///
    /// Events with missing or invalid coordinates are counted as rejected
    /// and skipped; the rest of the batch is unaffected.
    ///
    /// The window ends at `now`, except for a [`BatchOrigin::LastKnownGood`]
    /// batch, whose window ends at its own `fetched_at`: the reused events
    /// are shown as they stood when they were fetched rather than aged out.
    /// The snapshot's `data_as_of` records which instant that was.
    #[must_use]
    pub fn run(
        &self,
        batch: EventBatch,
        window: &WindowSpec,
        sequence: u64,
        now: DateTime<Utc>,
    ) -> Snapshot {
        let fetched = batch.events.len() + batch.rejected;
        let data_as_of = match batch.origin {
            BatchOrigin::LastKnownGood => batch.fetched_at.min(now),
            BatchOrigin::Live | BatchOrigin::Fallback => now,
        };

        let (valid, invalid): (Vec<RawEvent>, Vec<RawEvent>) = batch
            .events
            .into_iter()
            .partition(|event| event.geo.is_some_and(|point| point.is_valid()));
        for event in &invalid {
            log::debug!("{}: rejecting event {} without valid coordinates", self.domain, event.id);
        }
        if !invalid.is_empty() {
            log::warn!(
                "{}: {} events from {} had no valid coordinates",
                self.domain,
                invalid.len(),
                batch.source_id
            );
        }

        let in_window = window.filter(valid, data_as_of);
        let parallel = in_window.len() >= self.parallel_min;

        let resolved: Vec<ResolvedEvent> = if parallel {
            in_window
                .into_par_iter()
                .filter_map(|event| self.resolve(event))
                .collect()
        } else {
            in_window
                .into_iter()
                .filter_map(|event| self.resolve(event))
                .collect()
        };

        let map = if parallel {
            aggregate::aggregate_parallel(&resolved, self.shard_size)
        } else {
            aggregate::aggregate(&resolved)
        };
        let items = assemble(&map, &self.severity, SortKey::Recency);

        let stats = CycleStats {
            fetched,
            rejected: batch.rejected + invalid.len(),
            in_window: resolved.len(),
            buckets: items.len(),
        };

        log::info!(
            "{} #{sequence} ({}, {:?}): fetched={} rejected={} in_window={} buckets={}{}",
            self.domain,
            window,
            batch.origin,
            stats.fetched,
            stats.rejected,
            stats.in_window,
            stats.buckets,
            if parallel { " [parallel]" } else { "" }
        );

        Snapshot {
            domain: self.domain,
            window: window.token().to_string(),
            sequence,
            updated_at: now,
            data_as_of,
            origin: batch.origin,
            stats,
            items,
        }
    }
}
