//! Fabricated vehicle positions for local development and demos.
//!
//! Never selected by configuration; only the CLI's `--mock` flag builds it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::FeedSource;
use crate::error::PipelineError;
use crate::geo::BoundingBox;
use crate::model::{Coordinate, EntityAttributes, NormalizedEntity, VehicleAttributes};

pub struct MockSource {
    bbox: BoundingBox,
    count: usize,
    seed: u64,
}

impl MockSource {
    pub fn new(bbox: BoundingBox, count: usize, seed: u64) -> Self {
        Self { bbox, count, seed }
    }

    /// Generates the points; the same seed always yields the same output.
    pub fn generate(&self, captured_at: DateTime<Utc>) -> Vec<NormalizedEntity> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let b = self.bbox;

        (0..self.count)
            .filter_map(|i| {
                let lon = rng.random_range(b.min_lon..b.max_lon);
                let lat = rng.random_range(b.min_lat..b.max_lat);
                let speed = rng.random_range(0.0f32..20.0);
                let bearing = rng.random_range(0.0f32..360.0);
                let route = rng.random_range(1..=20u32);

                // random_range is half-open, so the lower edge can come up.
                if !b.contains(lon, lat) {
                    return None;
                }

                Some(NormalizedEntity {
                    coordinate: Coordinate { lon, lat },
                    captured_at,
                    attributes: EntityAttributes::Vehicle(VehicleAttributes {
                        speed: Some(speed),
                        bearing: Some(bearing),
                        route_id: Some(format!("mock-{route}")),
                        vehicle_id: Some(format!("mock-vehicle-{i}")),
                    }),
                })
            })
            .collect()
    }
}

#[async_trait]
impl FeedSource for MockSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch(
        &self,
        captured_at: DateTime<Utc>,
    ) -> Result<Vec<NormalizedEntity>, PipelineError> {
        Ok(self.generate(captured_at))
    }
}
