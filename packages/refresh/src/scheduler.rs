//! Fixed-interval refresh of every enabled domain.
//!
//! Each tick draws one sequence number and spawns one cycle task per
//! domain. Ticks never wait for earlier cycles, so a slow fetch cannot
//! delay the next refresh; the snapshot board discards whatever arrives
//! out of order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use event_map_analytics::WindowSpec;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::cycle::DomainRunner;
use crate::snapshot::{PublishOutcome, SnapshotBoard};

/// Drives refresh cycles for a set of domains.
#[derive(Debug)]
pub struct Scheduler {
    runners: Vec<Arc<DomainRunner>>,
    board: Arc<SnapshotBoard>,
    window: WindowSpec,
    interval: Duration,
    sequence: AtomicU64,
}

impl Scheduler {
    /// Creates a scheduler publishing to `board`.
    #[must_use]
    pub fn new(
        runners: Vec<Arc<DomainRunner>>,
        board: Arc<SnapshotBoard>,
        window: WindowSpec,
        interval: Duration,
    ) -> Self {
        Self {
            runners,
            board,
            window,
            interval,
            sequence: AtomicU64::new(0),
        }
    }

    /// The board snapshots are published to.
    #[must_use]
    pub const fn board(&self) -> &Arc<SnapshotBoard> {
        &self.board
    }

    /// The runners, one per enabled domain.
    #[must_use]
    pub fn runners(&self) -> &[Arc<DomainRunner>] {
        &self.runners
    }

    /// Draws the next sequence number. Strictly increasing, starting at 1.
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Starts one cycle per domain and returns their task handles without
    /// waiting for them.
    pub fn tick(&self) -> Vec<JoinHandle<()>> {
        let sequence = self.next_sequence();
        self.runners
            .iter()
            .map(|runner| {
                let runner = Arc::clone(runner);
                let board = Arc::clone(&self.board);
                let window = self.window.clone();
                tokio::spawn(async move {
                    match runner.run_cycle(&window, sequence).await {
                        Ok(snapshot) => {
                            if let PublishOutcome::Published { .. } = board.publish(snapshot) {
                                log::debug!("{}: cycle #{sequence} published", runner.domain());
                            }
                        }
                        Err(e) => {
                            log::error!("{}: cycle #{sequence} failed: {e}", runner.domain());
                        }
                    }
                })
            })
            .collect()
    }

    /// Runs [`Scheduler::tick`] now and then every interval until the
    /// returned handle is stopped.
    #[must_use]
    pub fn start(self: &Arc<Self>) -> SchedulerHandle {
        let scheduler = Arc::clone(self);
        let board = Arc::clone(&scheduler.board);
        let looped = Arc::clone(&scheduler);

        log::info!(
            "Refreshing {} domain(s) every {:?} over window {}",
            scheduler.runners.len(),
            scheduler.interval,
            scheduler.window
        );

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(looped.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let _cycles = looped.tick();
            }
        });

        SchedulerHandle {
            task,
            board,
            scheduler,
        }
    }
}

/// Handle to a running scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    task: JoinHandle<()>,
    board: Arc<SnapshotBoard>,
    scheduler: Arc<Scheduler>,
}

impl SchedulerHandle {
    /// The board snapshots are published to.
    #[must_use]
    pub const fn board(&self) -> &Arc<SnapshotBoard> {
        &self.board
    }

    /// The running scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Stops future ticks. Cycles already in flight finish and publish
    /// through the usual sequence check.
    pub fn stop(&self) {
        self.task.abort();
        log::info!("Scheduler stopped");
    }

    /// Returns `true` once the tick loop has ended.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
