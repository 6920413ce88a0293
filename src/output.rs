//! GeoJSON output for scored points.
//!
//! Every point becomes a `Point` feature whose properties always carry
//! `weight` and `ts`, plus source-specific fields.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;
use tracing::debug;

use crate::model::{Coordinate, EntityAttributes, NormalizedEntity};

/// A weighted point ready for output.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub coordinate: Coordinate,
    pub weight: f64,
    pub properties: JsonObject,
    pub captured_at: DateTime<Utc>,
}

impl ScoredPoint {
    pub fn new(entity: &NormalizedEntity, weight: f64) -> Self {
        let mut properties = JsonObject::new();
        match &entity.attributes {
            EntityAttributes::Vehicle(v) => {
                properties.insert("speed".into(), json!(v.speed));
                properties.insert("bearing".into(), json!(v.bearing));
                properties.insert("route_id".into(), json!(v.route_id));
                properties.insert("vehicle_id".into(), json!(v.vehicle_id));
            }
            EntityAttributes::Site(s) => {
                properties.insert("name".into(), json!(s.name));
                properties.insert("site_id".into(), json!(s.site_id));
                properties.insert("departures".into(), json!(s.departures.len()));
            }
        }

        Self {
            coordinate: entity.coordinate,
            weight,
            properties,
            captured_at: entity.captured_at,
        }
    }
}

/// Collects features in insertion order.
#[derive(Debug, Default)]
pub struct FeatureCollectionBuilder {
    features: Vec<Feature>,
}

impl FeatureCollectionBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            features: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, point: &ScoredPoint) -> &mut Self {
        let mut properties = point.properties.clone();
        properties.insert("weight".into(), json!(point.weight));
        properties.insert(
            "ts".into(),
            json!(point.captured_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        self.features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![
                point.coordinate.lon,
                point.coordinate.lat,
            ]))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn build(self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.features,
            foreign_members: None,
        }
    }
}

/// Writes the collection as JSON to stdout.
pub fn print_json(collection: &FeatureCollection) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, collection)?;
    writeln!(stdout)?;
    Ok(())
}

/// Writes the collection as JSON to `path`, replacing any existing file.
pub fn write_json(path: &Path, collection: &FeatureCollection) -> Result<()> {
    debug!(
        path = %path.display(),
        features = collection.features.len(),
        "Writing feature collection"
    );
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer(&mut writer, collection)?;
    writer.flush()?;
    Ok(())
}
