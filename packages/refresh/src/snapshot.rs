//! Latest-snapshot storage with sequence-ordered replacement.
//!
//! Each domain has one [`SnapshotStore`] backed by a `watch` channel.
//! Readers borrow the current value without blocking writers; a write only
//! lands if its sequence number is newer than the stored one, so a slow
//! cycle can never overwrite the result of a later one.

use std::sync::Arc;

use event_map_analytics_models::Snapshot;
use event_map_event_models::Domain;
use tokio::sync::watch;

/// Result of offering a snapshot to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The snapshot replaced the previous one (if any).
    Published {
        /// Sequence of the replaced snapshot.
        previous: Option<u64>,
    },
    /// The store already holds a snapshot with an equal or newer sequence.
    Stale {
        /// Sequence currently held.
        current: u64,
    },
}

/// Shared handle to a published snapshot.
pub type SharedSnapshot = Arc<Snapshot>;

/// Holds the newest snapshot for one domain.
#[derive(Debug)]
pub struct SnapshotStore {
    tx: watch::Sender<Option<SharedSnapshot>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Replaces the stored snapshot if `snapshot.sequence` is strictly
    /// greater than the stored sequence.
    pub fn publish(&self, snapshot: Snapshot) -> PublishOutcome {
        let incoming = snapshot.sequence;
        let mut outcome = PublishOutcome::Published { previous: None };
        let mut snapshot = Some(snapshot);

        self.tx.send_if_modified(|current| {
            let previous = current.as_ref().map(|held| held.sequence);
            if let Some(held) = previous.filter(|held| *held >= incoming) {
                outcome = PublishOutcome::Stale { current: held };
                return false;
            }
            *current = snapshot.take().map(Arc::new);
            outcome = PublishOutcome::Published { previous };
            true
        });

        outcome
    }

    /// The newest snapshot, if any cycle has completed.
    #[must_use]
    pub fn latest(&self) -> Option<SharedSnapshot> {
        self.tx.borrow().clone()
    }

    /// Sequence of the newest snapshot.
    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        self.tx.borrow().as_ref().map(|snapshot| snapshot.sequence)
    }

    /// Receiver notified on every accepted publish.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<SharedSnapshot>> {
        self.tx.subscribe()
    }
}

/// One [`SnapshotStore`] per domain.
#[derive(Debug, Default)]
pub struct SnapshotBoard {
    hazard: SnapshotStore,
    sustainability: SnapshotStore,
    lightning: SnapshotStore,
}

impl SnapshotBoard {
    /// Creates a board with empty stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The store for `domain`.
    #[must_use]
    pub const fn store(&self, domain: Domain) -> &SnapshotStore {
        match domain {
            Domain::Hazard => &self.hazard,
            Domain::Sustainability => &self.sustainability,
            Domain::Lightning => &self.lightning,
        }
    }

    /// Offers `snapshot` to its domain's store, logging late arrivals.
    pub fn publish(&self, snapshot: Snapshot) -> PublishOutcome {
        let domain = snapshot.domain;
        let sequence = snapshot.sequence;
        let outcome = self.store(domain).publish(snapshot);
        match outcome {
            PublishOutcome::Published { previous } => {
                log::debug!("{domain}: published #{sequence} (replacing {previous:?})");
            }
            PublishOutcome::Stale { current } => {
                log::warn!("{domain}: dropping late snapshot #{sequence}, already at #{current}");
            }
        }
        outcome
    }

    /// The newest snapshot for `domain`.
    #[must_use]
    pub fn latest(&self, domain: Domain) -> Option<SharedSnapshot> {
        self.store(domain).latest()
    }

    /// The newest snapshot of every domain that has one.
    #[must_use]
    pub fn all_latest(&self) -> Vec<SharedSnapshot> {
        Domain::all()
            .iter()
            .filter_map(|domain| self.latest(*domain))
            .collect()
    }
}
