//! Static table of named locations.
//!
//! The built-in table covers the 81 Turkish province centers and is baked
//! into the binary via [`include_str!`]. Alternative tables can be loaded
//! from disk with [`Gazetteer::load`].

use std::collections::BTreeSet;
use std::path::Path;

use event_map_geography_models::LocationEntry;
use serde::Deserialize;

use crate::GazetteerError;

/// Embedded Turkish province table.
const TURKEY_TOML: &str = include_str!("../gazetteer/turkey.toml");

#[derive(Debug, Deserialize)]
struct GazetteerFile {
    locations: Vec<LocationEntry>,
}

/// Ordered, validated list of [`LocationEntry`] rows.
///
/// Iteration order is the order entries were declared in; the resolver
/// relies on it to break exact distance ties.
#[derive(Debug, Clone)]
pub struct Gazetteer {
    entries: Vec<LocationEntry>,
}

impl Gazetteer {
    /// Builds a gazetteer from entries, validating names and coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`GazetteerError`] if the list is empty, a name repeats, or
    /// an entry has non-finite or out-of-range coordinates.
    pub fn new(entries: Vec<LocationEntry>) -> Result<Self, GazetteerError> {
        if entries.is_empty() {
            return Err(GazetteerError::Empty);
        }

        let mut seen = BTreeSet::new();
        for entry in &entries {
            if !entry.point().is_valid() {
                return Err(GazetteerError::InvalidCoordinates {
                    name: entry.name.clone(),
                    lat: entry.lat,
                    lon: entry.lon,
                });
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(GazetteerError::DuplicateName {
                    name: entry.name.clone(),
                });
            }
        }

        Ok(Self { entries })
    }

    /// Returns the built-in Turkish province gazetteer.
    ///
    /// # Panics
    ///
    /// Panics if the embedded table is malformed (a compile-time guarantee
    /// since the table is embedded).
    #[must_use]
    pub fn turkey() -> Self {
        Self::from_toml_str(TURKEY_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse turkey.toml: {e}"))
    }

    /// Parses a gazetteer from a TOML document with a `[[locations]]`
    /// array.
    ///
    /// # Errors
    ///
    /// Returns [`GazetteerError::Parse`] on malformed TOML, or any
    /// validation error from [`Gazetteer::new`].
    pub fn from_toml_str(toml_str: &str) -> Result<Self, GazetteerError> {
        let file: GazetteerFile = toml::de::from_str(toml_str)?;
        Self::new(file.locations)
    }

    /// Reads and parses a gazetteer TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`GazetteerError::Io`] if the file cannot be read, or any
    /// error from [`Gazetteer::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, GazetteerError> {
        let contents = std::fs::read_to_string(path)?;
        let gazetteer = Self::from_toml_str(&contents)?;
        log::info!(
            "Loaded {} gazetteer entries from {}",
            gazetteer.len(),
            path.display()
        );
        Ok(gazetteer)
    }

    /// Looks up an entry by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LocationEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// All entries in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[LocationEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false` for a constructed gazetteer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct region names, sorted.
    #[must_use]
    pub fn regions(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.region.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
