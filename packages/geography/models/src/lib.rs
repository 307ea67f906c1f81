#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Gazetteer entry, coordinate, and location resolution types.
//!
//! These types describe the static reference table of named locations and
//! the result of mapping a raw coordinate onto it. They carry no behavior
//! beyond validation helpers; lookups live in `event_map_geography`.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A WGS84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, `-90..=90`.
    pub lat: f64,
    /// Longitude in degrees, `-180..=180`.
    pub lon: f64,
}

impl GeoPoint {
    /// Creates a point from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns `true` if both components are finite and within the WGS84
    /// range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Relative importance of a gazetteer location (used for map emphasis).
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
#[strum(serialize_all = "snake_case")]
pub enum ImportanceTier {
    /// Small province centers
    Low,
    /// Mid-size cities
    Medium,
    /// Large cities
    High,
    /// Metropolitan centers
    Metropolitan,
}

/// One row of the gazetteer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationEntry {
    /// Unique display name (e.g. "İstanbul").
    pub name: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Grouping label (e.g. "Marmara").
    pub region: String,
    /// Relative importance.
    pub importance: ImportanceTier,
}

impl LocationEntry {
    /// Returns the entry's coordinates.
    #[must_use]
    pub const fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// How a coordinate was resolved.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchKind {
    /// Nearest gazetteer entry within the match threshold.
    Gazetteer,
    /// No entry close enough; the label is the formatted coordinate.
    RawCoordinate,
    /// The coordinate was malformed (non-finite or out of range).
    Unknown,
}

/// Result of resolving a coordinate against the gazetteer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Gazetteer name, formatted coordinate, or the unknown-location
    /// sentinel.
    pub label: String,
    /// Distance to the nearest gazetteer entry in kilometers. `None` for
    /// malformed input.
    pub distance_km: Option<f64>,
    /// How the label was produced.
    pub kind: MatchKind,
    /// Representative coordinates for the label: the gazetteer entry's
    /// point for a match, the query point for a raw-coordinate label.
    pub anchor: Option<GeoPoint>,
}
