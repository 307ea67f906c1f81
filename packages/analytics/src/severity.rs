//! Qualitative tier scoring for aggregate buckets.
//!
//! A [`SeverityRule`] is an ordered list of threshold steps, most severe
//! first, plus a floor tier. The first satisfied step determines the tier.
//! Rules are configuration data and are validated when loaded.

use event_map_analytics_models::AggregateBucket;
use event_map_event_models::{Tier, TierFamily};
use serde::{Deserialize, Serialize};

/// Invalid severity rule configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeverityRuleError {
    /// A step uses a tier from a different scale than the floor.
    #[error("tier {tier} does not belong to the rule's tier scale")]
    MixedTierFamilies {
        /// The out-of-family tier.
        tier: Tier,
    },

    /// A step's threshold is larger than the previous step's.
    #[error("step {index} has a larger threshold than the step before it")]
    IncreasingThreshold {
        /// Zero-based step index.
        index: usize,
    },

    /// A step's tier is not strictly below the previous step's (or the
    /// floor is not below the last step).
    #[error("step {index} is not less severe than the step before it")]
    TierOrder {
        /// Zero-based step index; equals the step count for the floor.
        index: usize,
    },

    /// A threshold is NaN or negative.
    #[error("step {index} has an invalid threshold")]
    InvalidThreshold {
        /// Zero-based step index.
        index: usize,
    },
}

/// One `sentiment_ratio` step: satisfied when the dominant sentiment ratio
/// is at least `at_least`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioStep {
    /// Tier assigned when satisfied.
    pub tier: Tier,
    /// Inclusive lower bound on the ratio.
    pub at_least: f64,
}

/// One `activity` step: satisfied when the mean intensity exceeds
/// `intensity_above` or the count exceeds `count_above`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityStep {
    /// Tier assigned when satisfied.
    pub tier: Tier,
    /// Strict lower bound on mean intensity.
    pub intensity_above: f64,
    /// Strict lower bound on count.
    pub count_above: u64,
}

/// Threshold rule mapping a bucket to a [`Tier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SeverityRule {
    /// Scores by `max(positive, negative) / count`.
    SentimentRatio {
        /// Steps, most severe first.
        steps: Vec<RatioStep>,
        /// Tier when no step is satisfied.
        floor: Tier,
    },
    /// Scores by mean intensity or event count.
    Activity {
        /// Steps, most severe first.
        steps: Vec<ActivityStep>,
        /// Tier when no step is satisfied.
        floor: Tier,
    },
}

impl SeverityRule {
    /// The floor tier.
    #[must_use]
    pub const fn floor(&self) -> Tier {
        match self {
            Self::SentimentRatio { floor, .. } | Self::Activity { floor, .. } => *floor,
        }
    }

    /// The tier scale this rule produces.
    #[must_use]
    pub const fn family(&self) -> TierFamily {
        self.floor().family()
    }

    /// Tiers of all steps, in order.
    fn step_tiers(&self) -> Vec<Tier> {
        match self {
            Self::SentimentRatio { steps, .. } => steps.iter().map(|s| s.tier).collect(),
            Self::Activity { steps, .. } => steps.iter().map(|s| s.tier).collect(),
        }
    }

    /// Checks tier scale consistency, tier ordering, and that thresholds
    /// are valid and non-increasing.
    ///
    /// # Errors
    ///
    /// Returns the first [`SeverityRuleError`] found.
    pub fn validate(&self) -> Result<(), SeverityRuleError> {
        let family = self.family();
        let tiers = self.step_tiers();

        if let Some(tier) = tiers.iter().find(|tier| tier.family() != family) {
            return Err(SeverityRuleError::MixedTierFamilies { tier: *tier });
        }

        let mut ranks: Vec<u8> = tiers.iter().map(|tier| tier.rank()).collect();
        ranks.push(self.floor().rank());
        if let Some(index) = ranks.windows(2).position(|pair| pair[1] >= pair[0]) {
            return Err(SeverityRuleError::TierOrder { index: index + 1 });
        }

        match self {
            Self::SentimentRatio { steps, .. } => {
                for (index, step) in steps.iter().enumerate() {
                    if step.at_least.is_nan() || step.at_least < 0.0 {
                        return Err(SeverityRuleError::InvalidThreshold { index });
                    }
                    if index > 0 && step.at_least > steps[index - 1].at_least {
                        return Err(SeverityRuleError::IncreasingThreshold { index });
                    }
                }
            }
            Self::Activity { steps, .. } => {
                for (index, step) in steps.iter().enumerate() {
                    if step.intensity_above.is_nan() || step.intensity_above < 0.0 {
                        return Err(SeverityRuleError::InvalidThreshold { index });
                    }
                    if index > 0 {
                        let previous = &steps[index - 1];
                        if step.intensity_above > previous.intensity_above
                            || step.count_above > previous.count_above
                        {
                            return Err(SeverityRuleError::IncreasingThreshold { index });
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Scores a bucket. Pure: the same bucket always gets the same tier.
    #[must_use]
    pub fn score(&self, bucket: &AggregateBucket) -> Tier {
        match self {
            Self::SentimentRatio { steps, floor } => {
                let ratio = bucket.dominant_sentiment_ratio();
                steps
                    .iter()
                    .find(|step| ratio >= step.at_least)
                    .map_or(*floor, |step| step.tier)
            }
            Self::Activity { steps, floor } => {
                let mean = bucket.mean_intensity();
                steps
                    .iter()
                    .find(|step| {
                        mean.is_some_and(|mean| mean > step.intensity_above)
                            || bucket.count > step.count_above
                    })
                    .map_or(*floor, |step| step.tier)
            }
        }
    }
}

/// Scores `bucket` with `rule`.
#[must_use]
pub fn score(bucket: &AggregateBucket, rule: &SeverityRule) -> Tier {
    rule.score(bucket)
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use event_map_analytics_models::SentimentTally;
    use event_map_event_models::{Category, SeverityTier, StatusTier};

    use super::*;

    fn hazard_rule() -> SeverityRule {
        SeverityRule::SentimentRatio {
            steps: vec![
                RatioStep {
                    tier: SeverityTier::Critical.into(),
                    at_least: 0.8,
                },
                RatioStep {
                    tier: SeverityTier::High.into(),
                    at_least: 0.6,
                },
                RatioStep {
                    tier: SeverityTier::Medium.into(),
                    at_least: 0.4,
                },
            ],
            floor: SeverityTier::Low.into(),
        }
    }

    fn lightning_rule() -> SeverityRule {
        SeverityRule::Activity {
            steps: vec![
                ActivityStep {
                    tier: SeverityTier::High.into(),
                    intensity_above: 70.0,
                    count_above: 30,
                },
                ActivityStep {
                    tier: SeverityTier::Medium.into(),
                    intensity_above: 40.0,
                    count_above: 15,
                },
            ],
            floor: SeverityTier::Low.into(),
        }
    }

    fn bucket(positive: u64, neutral: u64, negative: u64, mean: Option<f64>) -> AggregateBucket {
        AggregateBucket {
            location: "Ankara".to_string(),
            category: Category::Flood,
            count: positive + neutral + negative,
            sentiment: SentimentTally {
                positive,
                neutral,
                negative,
            },
            intensity_sum: mean.unwrap_or(0.0),
            intensity_count: u64::from(mean.is_some()),
            last_timestamp: DateTime::from_timestamp(0, 0).unwrap(),
            coordinates: None,
        }
    }

    #[test]
    fn ratio_boundary_is_inclusive() {
        let rule = hazard_rule();
        assert_eq!(rule.score(&bucket(0, 1, 4, None)), Tier::Severity(SeverityTier::Critical));
        assert_eq!(rule.score(&bucket(0, 2, 8, None)), Tier::Severity(SeverityTier::Critical));
        assert_eq!(rule.score(&bucket(3, 2, 0, None)), Tier::Severity(SeverityTier::High));
        assert_eq!(rule.score(&bucket(0, 3, 2, None)), Tier::Severity(SeverityTier::Medium));
        assert_eq!(rule.score(&bucket(1, 3, 1, None)), Tier::Severity(SeverityTier::Low));
    }

    #[test]
    fn empty_bucket_gets_floor() {
        assert_eq!(hazard_rule().score(&bucket(0, 0, 0, None)), Tier::Severity(SeverityTier::Low));
    }

    #[test]
    fn higher_ratio_never_lowers_tier() {
        let rule = hazard_rule();
        let mut previous = 0;
        for negative in 0..=20 {
            let tier = rule.score(&bucket(0, 20 - negative, negative, None));
            assert!(
                tier.rank() >= previous,
                "ratio {negative}/20 scored {tier}, below previous rank {previous}"
            );
            previous = tier.rank();
        }
    }

    #[test]
    fn activity_thresholds_are_strict_or() {
        let rule = lightning_rule();
        assert_eq!(rule.score(&bucket(0, 31, 0, None)), Tier::Severity(SeverityTier::High));
        assert_eq!(rule.score(&bucket(0, 30, 0, None)), Tier::Severity(SeverityTier::Medium));
        assert_eq!(rule.score(&bucket(0, 1, 0, Some(70.5))), Tier::Severity(SeverityTier::High));
        assert_eq!(rule.score(&bucket(0, 1, 0, Some(70.0))), Tier::Severity(SeverityTier::Medium));
        assert_eq!(rule.score(&bucket(0, 15, 0, Some(40.0))), Tier::Severity(SeverityTier::Low));
        assert_eq!(rule.score(&bucket(0, 16, 0, None)), Tier::Severity(SeverityTier::Medium));
    }

    #[test]
    fn default_rules_validate() {
        assert_eq!(hazard_rule().validate(), Ok(()));
        assert_eq!(lightning_rule().validate(), Ok(()));
    }

    #[test]
    fn rejects_increasing_thresholds() {
        let rule = SeverityRule::SentimentRatio {
            steps: vec![
                RatioStep {
                    tier: SeverityTier::Critical.into(),
                    at_least: 0.6,
                },
                RatioStep {
                    tier: SeverityTier::High.into(),
                    at_least: 0.8,
                },
            ],
            floor: SeverityTier::Low.into(),
        };
        assert_eq!(
            rule.validate(),
            Err(SeverityRuleError::IncreasingThreshold { index: 1 })
        );
    }

    #[test]
    fn rejects_mixed_families() {
        let rule = SeverityRule::SentimentRatio {
            steps: vec![RatioStep {
                tier: StatusTier::Excellent.into(),
                at_least: 0.8,
            }],
            floor: SeverityTier::Low.into(),
        };
        assert!(matches!(
            rule.validate(),
            Err(SeverityRuleError::MixedTierFamilies { .. })
        ));
    }

    #[test]
    fn rejects_out_of_order_tiers() {
        let rule = SeverityRule::SentimentRatio {
            steps: vec![RatioStep {
                tier: SeverityTier::Low.into(),
                at_least: 0.8,
            }],
            floor: SeverityTier::Medium.into(),
        };
        assert_eq!(rule.validate(), Err(SeverityRuleError::TierOrder { index: 1 }));
    }

    #[test]
    fn rejects_nan_threshold() {
        let rule = SeverityRule::SentimentRatio {
            steps: vec![RatioStep {
                tier: SeverityTier::High.into(),
                at_least: f64::NAN,
            }],
            floor: SeverityTier::Low.into(),
        };
        assert_eq!(
            rule.validate(),
            Err(SeverityRuleError::InvalidThreshold { index: 0 })
        );
    }

    #[test]
    fn parses_from_toml() {
        let rule: SeverityRule = toml::de::from_str(
            r#"
            type = "sentiment_ratio"
            floor = "poor"

            [[steps]]
            tier = "excellent"
            at_least = 0.8

            [[steps]]
            tier = "good"
            at_least = 0.6
            "#,
        )
        .unwrap();
        assert_eq!(rule.family(), TierFamily::Status);
        assert_eq!(rule.validate(), Ok(()));
        assert_eq!(rule.score(&bucket(4, 1, 0, None)), Tier::Status(StatusTier::Excellent));
    }
}
