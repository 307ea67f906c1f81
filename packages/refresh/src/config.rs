//! Runtime configuration for refresh cycles.
//!
//! Defaults are embedded from `packages/refresh/config/default.toml`. A file
//! passed with `--config` replaces them entirely; a few environment
//! variables then override single values.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use event_map_analytics::{DomainConfig, DomainConfigError, WindowError, WindowSpec, parse_window};
use event_map_event_models::Domain;
use event_map_geography::{Gazetteer, GazetteerError, Resolver};
use serde::{Deserialize, Serialize};

const DEFAULT_TOML: &str = include_str!("../config/default.toml");

/// Environment variable overriding [`RefreshConfig::window`].
pub const WINDOW_ENV: &str = "EVENT_MAP_WINDOW";
/// Environment variable overriding [`RefreshConfig::refresh_interval_secs`].
pub const REFRESH_SECS_ENV: &str = "EVENT_MAP_REFRESH_SECS";
/// Environment variable overriding [`RefreshConfig::domains`] (comma list).
pub const DOMAINS_ENV: &str = "EVENT_MAP_DOMAINS";

/// Invalid or unreadable runtime configuration. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse error.
    #[error("TOML error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The window token is malformed.
    #[error("Invalid window: {0}")]
    Window(#[from] WindowError),

    /// The gazetteer failed to load.
    #[error("Gazetteer error: {0}")]
    Gazetteer(#[from] GazetteerError),

    /// A domain table failed to load.
    #[error("Domain table error: {0}")]
    Domain(#[from] DomainConfigError),

    /// A setting has an unusable value.
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// Setting name.
        key: &'static str,
        /// Offending value.
        value: String,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Settings shared by every domain's refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Recency window token, e.g. `"24h"`.
    pub window: String,
    /// Seconds between ticks.
    pub refresh_interval_secs: u64,
    /// Seconds before a fetch is abandoned in favor of fallback data.
    pub fetch_timeout_secs: u64,
    /// Maximum distance for a gazetteer match.
    pub match_threshold_km: f64,
    /// Batch size at which resolution and aggregation run in parallel.
    pub parallel_aggregation_min: usize,
    /// Domains to refresh.
    pub domains: Vec<Domain>,
    /// Gazetteer file replacing the embedded province table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gazetteer: Option<PathBuf>,
    /// Domain tables replacing the embedded ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_tables: Vec<DomainTableOverride>,
}

/// A domain table read from disk instead of the embedded one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainTableOverride {
    /// Domain the table replaces.
    pub domain: Domain,
    /// Path to the TOML table.
    pub path: PathBuf,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self::from_toml_str(DEFAULT_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse default.toml: {e}"))
    }
}

impl RefreshConfig {
    /// Parses and validates a config.
    ///
    /// # Errors
    ///
    /// * If the TOML is malformed
    /// * If a value fails [`RefreshConfig::validate`]
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a config file.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read, parsed, or validated
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::from_toml_str(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Loads `path` if given, else the embedded defaults, then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// * If the file or an override is invalid
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up by environment variable name.
    ///
    /// # Errors
    ///
    /// * If an override value is invalid
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(window) = lookup(WINDOW_ENV) {
            log::debug!("{WINDOW_ENV}={window}");
            self.window = window;
        }
        if let Some(secs) = lookup(REFRESH_SECS_ENV) {
            self.refresh_interval_secs =
                secs.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: REFRESH_SECS_ENV,
                    value: secs.clone(),
                    reason: "expected a whole number of seconds",
                })?;
        }
        if let Some(list) = lookup(DOMAINS_ENV) {
            self.domains = parse_domains(&list)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks every value.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_window(&self.window)?;
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "refresh_interval_secs",
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "fetch_timeout_secs",
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }
        if !self.match_threshold_km.is_finite() || self.match_threshold_km <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "match_threshold_km",
                value: self.match_threshold_km.to_string(),
                reason: "must be a positive distance",
            });
        }
        if self.domains.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "domains",
                value: String::new(),
                reason: "at least one domain is required",
            });
        }
        Ok(())
    }

    /// The parsed window.
    ///
    /// # Errors
    ///
    /// * If the window token is malformed
    pub fn window_spec(&self) -> Result<WindowSpec, ConfigError> {
        Ok(parse_window(&self.window)?)
    }

    /// Time between ticks.
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Fetch deadline.
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Loads the gazetteer (embedded unless overridden).
    ///
    /// # Errors
    ///
    /// * If the override file cannot be loaded
    pub fn load_gazetteer(&self) -> Result<Arc<Gazetteer>, ConfigError> {
        let gazetteer = match &self.gazetteer {
            Some(path) => Gazetteer::load(path)?,
            None => Gazetteer::turkey(),
        };
        Ok(Arc::new(gazetteer))
    }

    /// Builds the shared resolver over `gazetteer`.
    #[must_use]
    pub fn resolver(&self, gazetteer: Arc<Gazetteer>) -> Arc<Resolver> {
        Arc::new(Resolver::new(gazetteer, self.match_threshold_km))
    }

    /// The classification and severity table for `domain`.
    ///
    /// # Errors
    ///
    /// * If an override file cannot be loaded or is for another domain
    pub fn domain_config(&self, domain: Domain) -> Result<DomainConfig, ConfigError> {
        match self.domain_tables.iter().find(|table| table.domain == domain) {
            Some(table) => Ok(DomainConfig::load(&table.path, domain)?),
            None => Ok(DomainConfig::builtin(domain)),
        }
    }
}

/// Parses a comma-separated domain list, ignoring blanks and duplicates.
///
/// # Errors
///
/// * If a name is not a known domain, or the list is empty
pub fn parse_domains(list: &str) -> Result<Vec<Domain>, ConfigError> {
    let mut domains = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let domain: Domain = name.parse().map_err(|_| ConfigError::InvalidValue {
            key: DOMAINS_ENV,
            value: name.to_string(),
            reason: "expected hazard, sustainability, or lightning",
        })?;
        if !domains.contains(&domain) {
            domains.push(domain);
        }
    }
    if domains.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: DOMAINS_ENV,
            value: list.to_string(),
            reason: "at least one domain is required",
        });
    }
    Ok(domains)
}
