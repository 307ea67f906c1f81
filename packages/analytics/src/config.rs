//! Per-domain classification and severity tables.
//!
//! Each domain ships a TOML table in `packages/analytics/domains/` that is
//! baked into the binary. A runtime config may replace it with a table read
//! from disk; both go through the same validation.

use std::path::Path;

use event_map_event_models::{Category, Domain, TierFamily};
use serde::{Deserialize, Serialize};

use crate::classify::{Classifier, KeywordRule};
use crate::severity::{SeverityRule, SeverityRuleError};

/// Domain tables embedded at compile time.
const DOMAIN_TOMLS: &[(Domain, &str)] = &[
    (Domain::Hazard, include_str!("../domains/hazard.toml")),
    (
        Domain::Sustainability,
        include_str!("../domains/sustainability.toml"),
    ),
    (Domain::Lightning, include_str!("../domains/lightning.toml")),
];

/// Invalid or unreadable domain table.
#[derive(Debug, thiserror::Error)]
pub enum DomainConfigError {
    /// TOML parse error.
    #[error("TOML error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The table declares a different domain than expected.
    #[error("expected a {expected} table, found {found}")]
    DomainMismatch {
        /// Domain the caller asked for.
        expected: Domain,
        /// Domain the table declares.
        found: Domain,
    },

    /// A keyword rule targets a category outside the table's domain.
    #[error("category {category} does not belong to domain {domain}")]
    ForeignCategory {
        /// Table domain.
        domain: Domain,
        /// Offending category.
        category: Category,
    },

    /// A keyword rule has no non-blank keywords.
    #[error("rule for {category} has no keywords")]
    EmptyKeywords {
        /// Category of the empty rule.
        category: Category,
    },

    /// The severity rule uses the wrong tier scale for the domain.
    #[error("domain {domain} must use the {expected:?} tier scale")]
    WrongTierScale {
        /// Table domain.
        domain: Domain,
        /// Scale the domain requires.
        expected: TierFamily,
    },

    /// The severity rule is inconsistent.
    #[error("invalid severity rule: {0}")]
    Severity(#[from] SeverityRuleError),
}

/// One keyword rule as written in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordTable {
    /// Category assigned on a match.
    pub category: Category,
    /// Keywords matched case-folded at the start of a word.
    pub keywords: Vec<String>,
}

/// Classification rules and severity rule for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Domain these tables apply to.
    pub domain: Domain,
    /// Keyword rules in priority order.
    #[serde(default)]
    pub rules: Vec<KeywordTable>,
    /// Tier rule.
    pub severity: SeverityRule,
}

/// Tier scale each domain scores on.
#[must_use]
pub const fn tier_family(domain: Domain) -> TierFamily {
    match domain {
        Domain::Hazard | Domain::Lightning => TierFamily::Severity,
        Domain::Sustainability => TierFamily::Status,
    }
}

impl DomainConfig {
    /// Parses and validates a domain table.
    ///
    /// # Errors
    ///
    /// * If the TOML is malformed
    /// * If the table fails [`DomainConfig::validate`]
    pub fn from_toml_str(toml_str: &str) -> Result<Self, DomainConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a domain table from disk and checks it declares `expected`.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read or parsed
    /// * If the table is for a different domain or fails validation
    pub fn load(path: &Path, expected: Domain) -> Result<Self, DomainConfigError> {
        let config = Self::from_toml_str(&std::fs::read_to_string(path)?)?;
        if config.domain != expected {
            return Err(DomainConfigError::DomainMismatch {
                expected,
                found: config.domain,
            });
        }
        log::info!(
            "Loaded {} table from {} ({} rules)",
            config.domain,
            path.display(),
            config.rules.len()
        );
        Ok(config)
    }

    /// The built-in table for `domain`.
    ///
    /// # Panics
    ///
    /// Panics if an embedded table is malformed.
    #[must_use]
    pub fn builtin(domain: Domain) -> Self {
        DOMAIN_TOMLS
            .iter()
            .find(|(d, _)| *d == domain)
            .map(|(_, toml)| {
                Self::from_toml_str(toml)
                    .unwrap_or_else(|e| panic!("Failed to parse {domain}.toml: {e}"))
            })
            .unwrap_or_else(|| panic!("No embedded table for {domain}"))
    }

    /// Checks categories, keywords, and the severity rule.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), DomainConfigError> {
        for rule in &self.rules {
            if rule.category.domain() != self.domain {
                return Err(DomainConfigError::ForeignCategory {
                    domain: self.domain,
                    category: rule.category,
                });
            }
            if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(DomainConfigError::EmptyKeywords {
                    category: rule.category,
                });
            }
        }

        let expected = tier_family(self.domain);
        if self.severity.family() != expected {
            return Err(DomainConfigError::WrongTierScale {
                domain: self.domain,
                expected,
            });
        }
        self.severity.validate()?;
        Ok(())
    }

    /// Builds the classifier for this table.
    #[must_use]
    pub fn classifier(&self) -> Classifier {
        Classifier::new(
            self.domain,
            self.rules
                .iter()
                .map(|rule| KeywordRule::new(rule.category, rule.keywords.as_slice()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use event_map_analytics_models::{AggregateBucket, SentimentTally};
    use event_map_event_models::{SeverityTier, StatusTier, Tier};

    use super::*;

    #[test]
    fn every_builtin_table_parses() {
        for domain in Domain::all() {
            let config = DomainConfig::builtin(*domain);
            assert_eq!(config.domain, *domain);
            assert_eq!(config.severity.family(), tier_family(*domain));
        }
    }

    #[test]
    fn hazard_rule_order_is_fixed() {
        let order: Vec<Category> = DomainConfig::builtin(Domain::Hazard)
            .rules
            .iter()
            .map(|rule| rule.category)
            .collect();
        assert_eq!(
            order,
            vec![
                Category::Earthquake,
                Category::Flood,
                Category::Fire,
                Category::Landslide,
                Category::Storm,
                Category::Drought,
                Category::Avalanche,
                Category::Snowstorm,
            ]
        );
    }

    #[test]
    fn sustainability_rule_order_is_fixed() {
        let order: Vec<Category> = DomainConfig::builtin(Domain::Sustainability)
            .rules
            .iter()
            .map(|rule| rule.category)
            .collect();
        assert_eq!(
            order,
            vec![
                Category::Renewable,
                Category::Waste,
                Category::Water,
                Category::Air,
                Category::Biodiversity,
                Category::Transport,
            ]
        );
    }

    #[test]
    fn builtin_classifiers_match_turkish_text() {
        let hazard = DomainConfig::builtin(Domain::Hazard).classifier();
        assert_eq!(
            hazard.match_text("İstanbul'da hem sel hem deprem oldu"),
            Some(Category::Earthquake)
        );
        assert_eq!(hazard.match_text("HEYELAN riski"), Some(Category::Landslide));

        let sustainability = DomainConfig::builtin(Domain::Sustainability).classifier();
        assert_eq!(
            sustainability.match_text("Geri dönüşüm tesisi açıldı"),
            Some(Category::Waste)
        );

        let lightning = DomainConfig::builtin(Domain::Lightning).classifier();
        assert!(lightning.rules().is_empty());
    }

    #[test]
    fn builtin_keywords_ignore_words_that_contain_them() {
        let hazard = DomainConfig::builtin(Domain::Hazard).classifier();
        for text in [
            "Kişisel verilerin korunması kanunu",
            "Meclis yeni bir karar aldı",
            "Karşıyaka maçı ertelendi",
            "Tipik bir sonbahar günü",
        ] {
            assert_eq!(hazard.match_text(text), None, "{text}");
        }
        assert_eq!(
            hazard.match_text("Selde mahsur kalanlar kurtarıldı"),
            Some(Category::Flood)
        );
        assert_eq!(
            hazard.match_text("Karşıyaka'da sokaklar sular altında"),
            Some(Category::Flood)
        );
        assert_eq!(
            hazard.match_text("Erzurum'da yoğun kar ve tipi"),
            Some(Category::Snowstorm)
        );

        let sustainability = DomainConfig::builtin(Domain::Sustainability).classifier();
        assert_eq!(
            sustainability.match_text("Annual sustainability report published"),
            None
        );
        assert_eq!(
            sustainability.match_text("Havalimanına yeni otobüs hattı"),
            Some(Category::Transport)
        );
        assert_eq!(
            sustainability.match_text("Samsun sulak alanlarında ekosistem koruma"),
            Some(Category::Biodiversity)
        );
        assert_eq!(
            sustainability.match_text("Gaziantep'te atık su arıtma tesisi"),
            Some(Category::Waste)
        );
    }

    #[test]
    fn builtin_thresholds() {
        let bucket = |positive: u64, negative: u64, count: u64| AggregateBucket {
            location: "Ankara".to_string(),
            category: Category::Flood,
            count,
            sentiment: SentimentTally {
                positive,
                neutral: count - positive - negative,
                negative,
            },
            intensity_sum: 0.0,
            intensity_count: 0,
            last_timestamp: chrono::DateTime::from_timestamp(0, 0).unwrap(),
            coordinates: None,
        };

        let hazard = DomainConfig::builtin(Domain::Hazard).severity;
        assert_eq!(hazard.score(&bucket(0, 4, 5)), Tier::Severity(SeverityTier::Critical));
        assert_eq!(hazard.score(&bucket(0, 3, 5)), Tier::Severity(SeverityTier::High));
        assert_eq!(hazard.score(&bucket(1, 1, 5)), Tier::Severity(SeverityTier::Low));

        let sustainability = DomainConfig::builtin(Domain::Sustainability).severity;
        assert_eq!(
            sustainability.score(&bucket(4, 0, 5)),
            Tier::Status(StatusTier::Excellent)
        );
        assert_eq!(
            sustainability.score(&bucket(2, 0, 5)),
            Tier::Status(StatusTier::Fair)
        );

        let lightning = DomainConfig::builtin(Domain::Lightning).severity;
        assert_eq!(lightning.score(&bucket(0, 0, 31)), Tier::Severity(SeverityTier::High));
        assert_eq!(lightning.score(&bucket(0, 0, 16)), Tier::Severity(SeverityTier::Medium));
        assert_eq!(lightning.score(&bucket(0, 0, 15)), Tier::Severity(SeverityTier::Low));
    }

    #[test]
    fn rejects_foreign_category() {
        let err = DomainConfig::from_toml_str(
            r#"
            domain = "hazard"

            [[rules]]
            category = "waste"
            keywords = ["atık"]

            [severity]
            type = "sentiment_ratio"
            floor = "low"
            steps = []
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, DomainConfigError::ForeignCategory { .. }), "{err}");
    }

    #[test]
    fn rejects_blank_keywords() {
        let err = DomainConfig::from_toml_str(
            r#"
            domain = "hazard"

            [[rules]]
            category = "fire"
            keywords = ["  "]

            [severity]
            type = "sentiment_ratio"
            floor = "low"
            steps = []
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, DomainConfigError::EmptyKeywords { .. }), "{err}");
    }

    #[test]
    fn rejects_wrong_tier_scale() {
        let err = DomainConfig::from_toml_str(
            r#"
            domain = "sustainability"

            [severity]
            type = "sentiment_ratio"
            floor = "low"
            steps = []
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, DomainConfigError::WrongTierScale { .. }), "{err}");
    }

    #[test]
    fn rejects_increasing_thresholds() {
        let err = DomainConfig::from_toml_str(
            r#"
            domain = "hazard"

            [severity]
            type = "sentiment_ratio"
            floor = "low"

            [[severity.steps]]
            tier = "critical"
            at_least = 0.5

            [[severity.steps]]
            tier = "high"
            at_least = 0.7
            "#,
        )
        .unwrap_err();
        assert!(
            matches!(
                err,
                DomainConfigError::Severity(SeverityRuleError::IncreasingThreshold { index: 1 })
            ),
            "{err}"
        );
    }

    #[test]
    fn load_checks_domain() {
        let path = std::env::temp_dir().join("event_map_domain_config_test.toml");
        std::fs::write(&path, include_str!("../domains/lightning.toml")).unwrap();

        assert!(DomainConfig::load(&path, Domain::Lightning).is_ok());
        let err = DomainConfig::load(&path, Domain::Hazard).unwrap_err();
        assert!(matches!(err, DomainConfigError::DomainMismatch { .. }), "{err}");

        std::fs::remove_file(&path).ok();
    }
}
