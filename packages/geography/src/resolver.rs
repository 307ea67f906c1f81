//! Nearest-location resolution by great-circle distance.

use std::sync::Arc;

use event_map_geography_models::{GeoPoint, MatchKind, Resolution};
use geo::Point;

use crate::Gazetteer;

/// Mean Earth radius used for haversine distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Maximum distance at which a coordinate is attributed to a gazetteer
/// entry.
pub const DEFAULT_MATCH_THRESHOLD_KM: f64 = 50.0;

/// Label for coordinates that cannot be resolved at all.
pub const UNKNOWN_LOCATION_LABEL: &str = "Unknown location";

/// Haversine distance in kilometers between two points (`x` = longitude,
/// `y` = latitude, degrees).
#[must_use]
pub fn haversine_km(from: Point<f64>, to: Point<f64>) -> f64 {
    let lat1 = from.y().to_radians();
    let lat2 = to.y().to_radians();
    let dlat = (to.y() - from.y()).to_radians();
    let dlon = (to.x() - from.x()).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Formats a coordinate as the raw-location label (`"41.01, 28.98"`).
#[must_use]
pub fn raw_label(lat: f64, lon: f64) -> String {
    format!("{lat:.2}, {lon:.2}")
}

/// Maps coordinates onto the nearest gazetteer entry.
///
/// Cheap to clone; the gazetteer is shared.
#[derive(Debug, Clone)]
pub struct Resolver {
    gazetteer: Arc<Gazetteer>,
    points: Arc<[Point<f64>]>,
    max_match_km: f64,
}

impl Resolver {
    /// Creates a resolver with the given match threshold in kilometers.
    #[must_use]
    pub fn new(gazetteer: Arc<Gazetteer>, max_match_km: f64) -> Self {
        let points = gazetteer
            .entries()
            .iter()
            .map(|entry| Point::new(entry.lon, entry.lat))
            .collect();

        Self {
            gazetteer,
            points,
            max_match_km,
        }
    }

    /// Creates a resolver using [`DEFAULT_MATCH_THRESHOLD_KM`].
    #[must_use]
    pub fn with_default_threshold(gazetteer: Arc<Gazetteer>) -> Self {
        Self::new(gazetteer, DEFAULT_MATCH_THRESHOLD_KM)
    }

    /// The shared gazetteer.
    #[must_use]
    pub fn gazetteer(&self) -> &Arc<Gazetteer> {
        &self.gazetteer
    }

    /// Configured match threshold in kilometers.
    #[must_use]
    pub const fn max_match_km(&self) -> f64 {
        self.max_match_km
    }

    /// Resolves a coordinate to a location label.
    ///
    /// Never fails. Malformed input yields [`UNKNOWN_LOCATION_LABEL`];
    /// a coordinate farther than the threshold from every entry yields its
    /// own formatted coordinates as the label. Exact ties go to the entry
    /// declared first.
    #[must_use]
    pub fn resolve(&self, lat: f64, lon: f64) -> Resolution {
        let query = GeoPoint::new(lat, lon);
        if !query.is_valid() {
            return Resolution {
                label: UNKNOWN_LOCATION_LABEL.to_string(),
                distance_km: None,
                kind: MatchKind::Unknown,
                anchor: None,
            };
        }

        let target = Point::new(lon, lat);
        let mut best: Option<(usize, f64)> = None;
        for (index, point) in self.points.iter().enumerate() {
            let distance = haversine_km(target, *point);
            if best.is_none_or(|(_, min)| distance < min) {
                best = Some((index, distance));
            }
        }

        match best {
            Some((index, distance)) if distance <= self.max_match_km => {
                let entry = &self.gazetteer.entries()[index];
                Resolution {
                    label: entry.name.clone(),
                    distance_km: Some(distance),
                    kind: MatchKind::Gazetteer,
                    anchor: Some(entry.point()),
                }
            }
            best => Resolution {
                label: raw_label(lat, lon),
                distance_km: best.map(|(_, distance)| distance),
                kind: MatchKind::RawCoordinate,
                anchor: Some(query),
            },
        }
    }
}
