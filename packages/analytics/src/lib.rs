#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Event aggregation and classification pipeline.
//!
//! Every refresh cycle runs the same stages over a freshly fetched batch:
//!
//! 1. [`window`] keeps events inside the recency window
//! 2. the resolver labels each event with the nearest named location
//! 3. [`classify`] assigns a category
//! 4. [`aggregate`] groups events into (location, category) buckets
//! 5. [`severity`] derives a tier per bucket
//! 6. [`assemble`] orders the scored buckets and renders exports
//!
//! [`pipeline::DomainPipeline`] ties the stages together for one domain,
//! configured by a [`config::DomainConfig`] table.

pub mod aggregate;
pub mod assemble;
pub mod classify;
pub mod config;
pub mod pipeline;
pub mod severity;
pub mod window;

pub use aggregate::{AggregateMap, aggregate, aggregate_parallel};
pub use assemble::{ExportError, assemble, sort_buckets, to_csv_string, write_csv};
pub use classify::{Classifier, KeywordRule};
pub use config::{DomainConfig, DomainConfigError};
pub use pipeline::DomainPipeline;
pub use severity::{SeverityRule, SeverityRuleError};
pub use window::{WindowError, WindowSpec, parse_window};
