//! Region geofence.

use serde::{Deserialize, Serialize};

/// Axis-aligned region, serialized as `[min_lon, min_lat, max_lon, max_lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub const fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Greater Stockholm.
    pub const fn stockholm() -> Self {
        Self::new(17.7, 59.15, 18.35, 59.50)
    }

    /// Strict containment: points on any edge are outside.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon > self.min_lon && lon < self.max_lon && lat > self.min_lat && lat < self.max_lat
    }

    /// A box is usable only if every bound is finite and it has a non-empty
    /// interior.
    pub fn is_valid(&self) -> bool {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
            .iter()
            .all(|v| v.is_finite())
            && self.min_lon < self.max_lon
            && self.min_lat < self.max_lat
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::stockholm()
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([min_lon, min_lat, max_lon, max_lat]: [f64; 4]) -> Self {
        Self::new(min_lon, min_lat, max_lon, max_lat)
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.min_lon, b.min_lat, b.max_lon, b.max_lat]
    }
}
