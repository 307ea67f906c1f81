#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Gazetteer loading and nearest-location resolution.
//!
//! The [`Gazetteer`] is a static, ordered table of named locations loaded
//! once at startup. The [`Resolver`] maps arbitrary coordinates onto it by
//! great-circle distance, falling back to a formatted coordinate label when
//! nothing is close enough.

pub mod gazetteer;
pub mod resolver;

pub use gazetteer::Gazetteer;
pub use resolver::{
    DEFAULT_MATCH_THRESHOLD_KM, EARTH_RADIUS_KM, Resolver, UNKNOWN_LOCATION_LABEL, haversine_km,
};

use thiserror::Error;

/// Errors raised while loading or validating a gazetteer.
///
/// All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum GazetteerError {
    /// The table contains no entries.
    #[error("Gazetteer is empty")]
    Empty,

    /// Two entries share the same name.
    #[error("Duplicate gazetteer entry: {name}")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },

    /// An entry has non-finite or out-of-range coordinates.
    #[error("Invalid coordinates for {name}: ({lat}, {lon})")]
    InvalidCoordinates {
        /// Entry name.
        name: String,
        /// Latitude as read.
        lat: f64,
        /// Longitude as read.
        lon: f64,
    },

    /// TOML parsing failed.
    #[error("TOML error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Reading the gazetteer file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
