use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A point on the map in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        GeoPoint { lat, lon }
    }
}

/// Fixed city → coordinate reference table used by the route map.
///
/// Not derived from the dataset: cities it does not know are simply left off
/// the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityCoordinates(BTreeMap<String, GeoPoint>);

impl Default for CityCoordinates {
    fn default() -> Self {
        [
            ("Delhi", GeoPoint::new(28.7041, 77.1025)),
            ("Mumbai", GeoPoint::new(19.0760, 72.8777)),
            ("Bangalore", GeoPoint::new(12.9716, 77.5946)),
            ("Hyderabad", GeoPoint::new(17.3850, 78.4867)),
            ("Kolkata", GeoPoint::new(22.5726, 88.3639)),
            ("Chennai", GeoPoint::new(13.0827, 80.2707)),
        ]
        .into_iter()
        .collect()
    }
}

impl<S: Into<String>> FromIterator<(S, GeoPoint)> for CityCoordinates {
    fn from_iter<I: IntoIterator<Item = (S, GeoPoint)>>(iter: I) -> Self {
        CityCoordinates(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl CityCoordinates {
    pub fn lookup(&self, city: &str) -> Option<GeoPoint> {
        self.0.get(city).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
