#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Event domain, category taxonomy, and severity tier definitions.
//!
//! This crate defines the canonical category taxonomy shared by every
//! stage of the aggregation pipeline. Hazard reports, sustainability
//! observations, and lightning detections are each a [`Domain`]; every
//! event is classified into exactly one [`Category`] belonging to its
//! domain, and every aggregate bucket is scored into a [`Tier`].

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The independent datasets the pipeline processes.
///
/// Domains are disjoint: a refresh cycle fetches, classifies, and scores
/// each one separately.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Domain {
    /// Environmental hazard reports (earthquake, flood, fire, ...).
    Hazard,
    /// Sustainability observations (energy, waste, water, ...).
    Sustainability,
    /// Lightning-strike detections.
    Lightning,
}

impl Domain {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Hazard, Self::Sustainability, Self::Lightning]
    }

    /// Category assigned when neither a structured label nor any keyword
    /// rule produces a match.
    #[must_use]
    pub const fn default_category(self) -> Category {
        match self {
            Self::Hazard => Category::GeneralHazard,
            Self::Sustainability => Category::GeneralSustainability,
            Self::Lightning => Category::LightningStrike,
        }
    }
}

/// Semantic event categories across all domains.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Category {
    // ── Hazard ───────────────────────────────────────────
    /// Seismic activity
    Earthquake,
    /// Flooding and flash floods
    Flood,
    /// Wildfires and urban fires
    Fire,
    /// Landslides and mudslides
    Landslide,
    /// Storms and high winds
    Storm,
    /// Drought conditions
    Drought,
    /// Avalanches
    Avalanche,
    /// Snowstorms and blizzards
    Snowstorm,
    /// Hazard reports that match no specific type
    GeneralHazard,

    // ── Sustainability ──────────────────────────────────
    /// Renewable energy generation
    Renewable,
    /// Waste management and recycling
    Waste,
    /// Water management
    Water,
    /// Air quality
    Air,
    /// Biodiversity and ecosystems
    Biodiversity,
    /// Sustainable transport
    Transport,
    /// Sustainability observations that match no specific type
    GeneralSustainability,

    // ── Lightning ───────────────────────────────────────
    /// A detected lightning strike
    LightningStrike,
}

impl Category {
    /// Returns the [`Domain`] this category belongs to.
    #[must_use]
    pub const fn domain(self) -> Domain {
        match self {
            Self::Earthquake
            | Self::Flood
            | Self::Fire
            | Self::Landslide
            | Self::Storm
            | Self::Drought
            | Self::Avalanche
            | Self::Snowstorm
            | Self::GeneralHazard => Domain::Hazard,

            Self::Renewable
            | Self::Waste
            | Self::Water
            | Self::Air
            | Self::Biodiversity
            | Self::Transport
            | Self::GeneralSustainability => Domain::Sustainability,

            Self::LightningStrike => Domain::Lightning,
        }
    }

    /// Parses a structured label, accepting it only if it names a category
    /// of `domain`.
    #[must_use]
    pub fn parse_for_domain(label: &str, domain: Domain) -> Option<Self> {
        label
            .trim()
            .parse::<Self>()
            .ok()
            .filter(|category| category.domain() == domain)
    }

    /// Returns all categories belonging to the given domain.
    #[must_use]
    pub fn for_domain(domain: Domain) -> Vec<Self> {
        Self::all()
            .iter()
            .copied()
            .filter(|category| category.domain() == domain)
            .collect()
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Earthquake,
            Self::Flood,
            Self::Fire,
            Self::Landslide,
            Self::Storm,
            Self::Drought,
            Self::Avalanche,
            Self::Snowstorm,
            Self::GeneralHazard,
            Self::Renewable,
            Self::Waste,
            Self::Water,
            Self::Air,
            Self::Biodiversity,
            Self::Transport,
            Self::GeneralSustainability,
            Self::LightningStrike,
        ]
    }
}

/// Severity tiers used for hazard and lightning buckets, least to most
/// severe.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SeverityTier {
    /// Level 1
    Low = 1,
    /// Level 2
    Medium = 2,
    /// Level 3
    High = 3,
    /// Level 4
    Critical = 4,
}

/// Status tiers used for sustainability buckets, worst to best.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StatusTier {
    /// Level 1
    Poor = 1,
    /// Level 2
    Fair = 2,
    /// Level 3
    Good = 3,
    /// Level 4
    Excellent = 4,
}

/// Which tier scale a [`Tier`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierFamily {
    /// [`SeverityTier`] scale.
    Severity,
    /// [`StatusTier`] scale.
    Status,
}

impl TierFamily {
    /// Every tier on this scale, lowest rank first.
    #[must_use]
    pub const fn tiers(self) -> &'static [Tier] {
        match self {
            Self::Severity => &[
                Tier::Severity(SeverityTier::Low),
                Tier::Severity(SeverityTier::Medium),
                Tier::Severity(SeverityTier::High),
                Tier::Severity(SeverityTier::Critical),
            ],
            Self::Status => &[
                Tier::Status(StatusTier::Poor),
                Tier::Status(StatusTier::Fair),
                Tier::Status(StatusTier::Good),
                Tier::Status(StatusTier::Excellent),
            ],
        }
    }
}

/// Qualitative label derived for an aggregate bucket.
///
/// Serializes as the bare tier name (`"critical"`, `"good"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tier {
    /// Hazard/lightning scale.
    Severity(SeverityTier),
    /// Sustainability scale.
    Status(StatusTier),
}

impl Tier {
    /// Ordinal position within its family, 1 (lowest) to 4 (highest).
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Severity(tier) => tier as u8,
            Self::Status(tier) => tier as u8,
        }
    }

    /// Returns which scale this tier belongs to.
    #[must_use]
    pub const fn family(self) -> TierFamily {
        match self {
            Self::Severity(_) => TierFamily::Severity,
            Self::Status(_) => TierFamily::Status,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Severity(tier) => write!(f, "{tier}"),
            Self::Status(tier) => write!(f, "{tier}"),
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = InvalidTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<SeverityTier>()
            .map(Self::Severity)
            .or_else(|_| s.parse::<StatusTier>().map(Self::Status))
            .map_err(|_| InvalidTierError {
                value: s.to_string(),
            })
    }
}

impl From<SeverityTier> for Tier {
    fn from(tier: SeverityTier) -> Self {
        Self::Severity(tier)
    }
}

impl From<StatusTier> for Tier {
    fn from(tier: StatusTier) -> Self {
        Self::Status(tier)
    }
}

/// Error returned when a string names no known tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTierError {
    /// The unrecognized tier name.
    pub value: String,
}

impl std::fmt::Display for InvalidTierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid tier {:?}", self.value)
    }
}

impl std::error::Error for InvalidTierError {}

/// Three-way sentiment label supplied with an event.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SentimentLabel {
    /// Positive
    Positive,
    /// Neutral
    Neutral,
    /// Negative
    Negative,
}

/// Sentiment attached to an event by an upstream model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    /// Predicted label.
    pub label: SentimentLabel,
    /// Model confidence in `[0, 1]`.
    pub score: f64,
}
