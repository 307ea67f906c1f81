#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scheduled refresh cycles for the event map.
//!
//! On every tick each enabled domain fetches a batch for the configured
//! window, runs it through its [`DomainPipeline`], and offers the resulting
//! snapshot to a shared [`SnapshotBoard`]. Readers (the API server, the
//! `watch` command) only ever see the newest completed cycle.

pub mod config;
pub mod cycle;
pub mod scheduler;
pub mod snapshot;

use std::sync::Arc;

use event_map_analytics::DomainPipeline;
use event_map_geography::Gazetteer;

pub use config::{ConfigError, RefreshConfig};
pub use cycle::DomainRunner;
pub use scheduler::{Scheduler, SchedulerHandle};
pub use snapshot::{PublishOutcome, SharedSnapshot, SnapshotBoard, SnapshotStore};

/// Errors raised while setting up or running refresh cycles.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// Configuration was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// A pipeline task panicked or was cancelled.
    #[error("Pipeline task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Everything a process needs to refresh and serve snapshots.
#[derive(Debug)]
pub struct Runtime {
    /// The validated configuration.
    pub config: RefreshConfig,
    /// The shared gazetteer.
    pub gazetteer: Arc<Gazetteer>,
    /// Scheduler over one runner per enabled domain.
    pub scheduler: Arc<Scheduler>,
}

impl Runtime {
    /// Loads the gazetteer and domain tables and builds every runner.
    ///
    /// # Errors
    ///
    /// * If the gazetteer or a domain table fails to load
    /// * If the HTTP client cannot be built
    pub fn build(config: RefreshConfig) -> Result<Self, RefreshError> {
        let gazetteer = config.load_gazetteer()?;
        let resolver = config.resolver(Arc::clone(&gazetteer));
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .build()?;

        let mut runners = Vec::with_capacity(config.domains.len());
        for domain in &config.domains {
            let pipeline =
                DomainPipeline::new(&config.domain_config(*domain)?, Arc::clone(&resolver))
                    .with_parallel_threshold(config.parallel_aggregation_min);
            let source = event_map_source::registry::build_for_domain(*domain, &client);
            log::info!("{domain}: using source {} ({})", source.id(), source.name());
            runners.push(Arc::new(DomainRunner::new(
                source,
                pipeline,
                config.fetch_timeout(),
            )));
        }

        log::info!(
            "Gazetteer has {} locations in {} regions",
            gazetteer.len(),
            gazetteer.regions().len()
        );

        let scheduler = Arc::new(Scheduler::new(
            runners,
            Arc::new(SnapshotBoard::new()),
            config.window_spec()?,
            config.refresh_interval(),
        ));

        Ok(Self {
            config,
            gazetteer,
            scheduler,
        })
    }

    /// Board the runners publish to.
    #[must_use]
    pub fn board(&self) -> &Arc<SnapshotBoard> {
        self.scheduler.board()
    }

    /// Starts refreshing on the configured interval.
    #[must_use]
    pub fn start(&self) -> SchedulerHandle {
        self.scheduler.start()
    }

    /// Runs one cycle for every domain concurrently, publishes the results,
    /// and returns them in config order.
    ///
    /// # Errors
    ///
    /// * If a pipeline task fails
    pub async fn run_once(&self) -> Result<Vec<SharedSnapshot>, RefreshError> {
        for result in futures::future::join_all(self.scheduler.tick()).await {
            result?;
        }
        Ok(self
            .config
            .domains
            .iter()
            .filter_map(|domain| self.board().latest(*domain))
            .collect())
    }
}
