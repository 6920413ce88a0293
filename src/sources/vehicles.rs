use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::FeedSource;
use crate::error::PipelineError;
use crate::fetch::{HttpClient, RetryPolicy, fetch_bytes};
use crate::geo::BoundingBox;
use crate::gtfs_rt::FeedMessage;
use crate::model::{Coordinate, EntityAttributes, NormalizedEntity, VehicleAttributes};
use crate::parser::parse_feed;
use crate::stats::NormalizeStats;

/// Vehicle positions from a GTFS-RT `VehiclePositions` feed.
pub struct VehicleTelemetrySource<C> {
    client: C,
    url: String,
    bbox: BoundingBox,
    retry: RetryPolicy,
}

impl<C: HttpClient> VehicleTelemetrySource<C> {
    /// `client` must already carry the feed's authentication.
    pub fn new(client: C, url: impl Into<String>, bbox: BoundingBox, retry: RetryPolicy) -> Self {
        Self {
            client,
            url: url.into(),
            bbox,
            retry,
        }
    }
}

#[async_trait]
impl<C: HttpClient> FeedSource for VehicleTelemetrySource<C> {
    fn name(&self) -> &'static str {
        "vehicles"
    }

    #[tracing::instrument(skip(self), fields(source = "vehicles"))]
    async fn fetch(
        &self,
        captured_at: DateTime<Utc>,
    ) -> Result<Vec<NormalizedEntity>, PipelineError> {
        let bytes = fetch_bytes(&self.client, &self.url, &self.retry, "vehicle feed").await?;
        debug!(bytes = bytes.len(), "Feed bytes received, parsing");

        let feed = parse_feed(&bytes)?;
        debug!(entity_count = feed.entity.len(), "Feed parsed successfully");

        let (entities, stats) = normalize_feed(&feed, &self.bbox, captured_at);
        stats.log(self.name());
        Ok(entities)
    }
}

/// Turns a decoded feed into in-region vehicle entities.
///
/// Entities without a position, with non-finite coordinates, or outside
/// `bbox` are skipped and counted; none of these are errors.
pub fn normalize_feed(
    feed: &FeedMessage,
    bbox: &BoundingBox,
    captured_at: DateTime<Utc>,
) -> (Vec<NormalizedEntity>, NormalizeStats) {
    let mut stats = NormalizeStats {
        total_entities: feed.entity.len(),
        ..Default::default()
    };
    let mut entities = Vec::new();

    for e in &feed.entity {
        let Some(vp) = &e.vehicle else {
            stats.without_position += 1;
            continue;
        };
        let Some(pos) = &vp.position else {
            stats.without_position += 1;
            continue;
        };

        let Some(coordinate) =
            Coordinate::finite(f64::from(pos.longitude), f64::from(pos.latitude))
        else {
            stats.non_finite += 1;
            continue;
        };

        if !bbox.contains(coordinate.lon, coordinate.lat) {
            stats.out_of_bounds += 1;
            continue;
        }

        entities.push(NormalizedEntity {
            coordinate,
            captured_at,
            attributes: EntityAttributes::Vehicle(VehicleAttributes {
                speed: pos.speed,
                bearing: pos.bearing,
                route_id: vp.trip.as_ref().and_then(|t| t.route_id.clone()),
                vehicle_id: vp.vehicle.as_ref().and_then(|v| v.id.clone()),
            }),
        });
    }

    stats.kept = entities.len();
    (entities, stats)
}
