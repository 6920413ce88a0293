//! Normalized entities shared by every feed source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    /// Returns `None` unless both components are finite.
    pub fn finite(lon: f64, lat: f64) -> Option<Self> {
        (lon.is_finite() && lat.is_finite()).then_some(Self { lon, lat })
    }
}

/// Transport modes recognized on departure boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitMode {
    Metro,
    Bus,
    Tram,
    Train,
    Ferry,
    Ship,
}

impl TransitMode {
    pub const ALL: [TransitMode; 6] = [
        TransitMode::Metro,
        TransitMode::Bus,
        TransitMode::Tram,
        TransitMode::Train,
        TransitMode::Ferry,
        TransitMode::Ship,
    ];

    /// Keys under which a board groups departures of this mode.
    pub fn bucket_keys(self) -> &'static [&'static str] {
        match self {
            TransitMode::Metro => &["metros", "metro"],
            TransitMode::Bus => &["buses", "bus"],
            TransitMode::Tram => &["trams", "tram"],
            TransitMode::Train => &["trains", "train"],
            TransitMode::Ferry => &["ferries", "ferry", "ferrys"],
            TransitMode::Ship => &["ships", "ship"],
        }
    }

    /// Parses a per-departure mode label such as `"METRO"` or `"bus"`.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.bucket_keys().contains(&label.as_str()))
    }
}

/// A single departure as announced by a board.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub mode: TransitMode,
    /// Raw time label, resolved from the first populated time field.
    pub time: Option<String>,
}

/// Attributes carried through from a vehicle position report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleAttributes {
    pub speed: Option<f32>,
    pub bearing: Option<f32>,
    pub route_id: Option<String>,
    pub vehicle_id: Option<String>,
}

/// Departure activity at a hub.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteActivity {
    pub site_id: String,
    pub name: String,
    pub departures: Vec<Departure>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityAttributes {
    Vehicle(VehicleAttributes),
    Site(SiteActivity),
}

/// The common output shape of every feed source.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEntity {
    pub coordinate: Coordinate,
    /// Wall-clock time of the fetch; identical across one invocation.
    pub captured_at: DateTime<Utc>,
    pub attributes: EntityAttributes,
}
