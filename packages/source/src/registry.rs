//! Source registry: loads all source definitions from embedded TOML configs.
//!
//! Each `.toml` file in `packages/source/sources/` is baked into the binary
//! at compile time via [`include_str!`]. Adding a new source means creating
//! a new TOML file and adding it to the list below.

use std::sync::Arc;

use event_map_event_models::Domain;

use crate::EventSource;
use crate::fallback::FallbackSource;
use crate::source_def::{SourceDefinition, parse_source_toml};

/// TOML configs embedded at compile time.
const SOURCE_TOMLS: &[(&str, &str)] = &[
    ("hazard_api", include_str!("../sources/hazard_api.toml")),
    (
        "sustainability_api",
        include_str!("../sources/sustainability_api.toml"),
    ),
    ("lightning_log", include_str!("../sources/lightning_log.toml")),
];

/// Returns all configured source definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (a compile-time guarantee since
/// the configs are embedded).
#[must_use]
pub fn all_sources() -> Vec<SourceDefinition> {
    SOURCE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_source_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Returns the definition of the live source for `domain`, if one is
/// configured.
#[must_use]
pub fn source_for_domain(domain: Domain) -> Option<SourceDefinition> {
    all_sources().into_iter().find(|def| def.domain == domain)
}

/// Builds the runnable source for `domain`: the configured live source, or
/// the embedded fallback source when none is configured.
#[must_use]
pub fn build_for_domain(domain: Domain, client: &reqwest::Client) -> Arc<dyn EventSource> {
    source_for_domain(domain).map_or_else(
        || {
            log::warn!("No live source configured for {domain}, serving fallback data");
            Arc::new(FallbackSource::new(domain)) as Arc<dyn EventSource>
        },
        |def| def.build(client),
    )
}
