use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use prost::Message;
use reqwest::{Request, Response};
use serde_json::json;

use transit_heat::config::{HeatConfig, SourceKind};
use transit_heat::fetch::HttpClient;
use transit_heat::geo::BoundingBox;
use transit_heat::gtfs_rt::{FeedEntity, FeedHeader, FeedMessage, Position, VehiclePosition};
use transit_heat::handler::HeatResponse;
use transit_heat::model::{Departure, TransitMode};
use transit_heat::pipeline::Pipeline;
use transit_heat::scoring::{ProximityScorer, ScoringConfig};

/// Serves fixed bodies keyed by URL path and records every request.
#[derive(Clone, Default)]
struct FixtureClient {
    bodies: HashMap<String, (u16, Vec<u8>)>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl FixtureClient {
    fn with(mut self, path: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(path.to_string(), (status, body.into()));
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for FixtureClient {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        self.requested.lock().unwrap().push(req.url().path().to_string());
        let (status, body) = self
            .bodies
            .get(req.url().path())
            .cloned()
            .unwrap_or((404, Vec::new()));
        Ok(http::Response::builder()
            .status(status)
            .body(body)
            .unwrap()
            .into())
    }
}

fn vehicle(id: &str, lat: f32, lon: f32) -> FeedEntity {
    FeedEntity {
        id: id.to_string(),
        vehicle: Some(VehiclePosition {
            position: Some(Position {
                latitude: lat,
                longitude: lon,
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn feed_bytes(entities: Vec<FeedEntity>) -> Vec<u8> {
    FeedMessage {
        header: FeedHeader {
            gtfs_realtime_version: "2.0".to_string(),
            timestamp: Some(1_740_834_300),
            ..Default::default()
        },
        entity: entities,
    }
    .encode_to_vec()
}

fn vehicle_config() -> HeatConfig {
    let mut config = HeatConfig::default().with_api_key("integration-key");
    config.vehicles.url = "https://feeds.example.org/sweden/VehiclePositions.pb".to_string();
    config
}

fn departure_config() -> HeatConfig {
    let mut config = HeatConfig::default();
    config.source = SourceKind::Departures;
    config.departures.sites_url = "https://boards.example.org/v1/sites".to_string();
    config.departures.departures_url =
        "https://boards.example.org/v1/sites/{site_id}/departures".to_string();
    config.departures.hubs = vec!["T-Centralen".to_string(), "Slussen".to_string()];
    config
}

fn sites_body() -> Vec<u8> {
    json!([
        { "id": 9001, "name": "T-Centralen", "lat": 59.3313, "lon": 18.0597 },
        { "id": 9192, "name": "Slussen", "lat": 59.3195, "lon": 18.0722 },
        { "id": 5502, "name": "Kista", "lat": 59.4030, "lon": 17.9445 },
    ])
    .to_string()
    .into_bytes()
}

#[tokio::test]
async fn test_vehicle_feed_keeps_only_in_region_entities() {
    let client = FixtureClient::default().with(
        "/sweden/VehiclePositions.pb",
        200,
        feed_bytes(vec![
            vehicle("stockholm", 59.33, 18.06),
            vehicle("gothenburg", 57.70, 11.97),
        ]),
    );

    let pipeline = Pipeline::from_config(&vehicle_config(), client).expect("pipeline");
    let response = HeatResponse::from_result(pipeline.run().await);

    assert!(response.is_success());
    let features = response.body["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["properties"]["weight"], json!(1.0));
    assert_eq!(features[0]["geometry"]["type"], "Point");
}

#[tokio::test]
async fn test_non_finite_position_is_skipped_silently() {
    let client = FixtureClient::default().with(
        "/sweden/VehiclePositions.pb",
        200,
        feed_bytes(vec![
            vehicle("nan", f32::NAN, 18.06),
            vehicle("inf", 59.33, f32::INFINITY),
            vehicle("ok", 59.34, 18.07),
        ]),
    );

    let pipeline = Pipeline::from_config(&vehicle_config(), client).expect("pipeline");
    let collection = pipeline.run().await.expect("soft skips are not errors");

    assert_eq!(collection.features.len(), 1);
}

#[tokio::test]
async fn test_vehicle_feed_error_status_is_upstream_error() {
    let client = FixtureClient::default().with("/sweden/VehiclePositions.pb", 403, Vec::new());

    let pipeline = Pipeline::from_config(&vehicle_config(), client).expect("pipeline");
    let response = HeatResponse::from_result(pipeline.run().await);

    assert_eq!(response.status, 500);
    assert_eq!(response.body["error"], "UpstreamError");
    let details = response.body["details"].as_str().unwrap();
    assert!(!details.contains("integration-key"));
}

#[tokio::test]
async fn test_garbage_feed_is_decode_error() {
    let client =
        FixtureClient::default().with("/sweden/VehiclePositions.pb", 200, vec![0xff, 0xff, 0xff]);

    let pipeline = Pipeline::from_config(&vehicle_config(), client).expect("pipeline");
    let response = HeatResponse::from_result(pipeline.run().await);

    assert_eq!(response.status, 500);
    assert_eq!(response.body["error"], "DecodeError");
}

#[tokio::test]
async fn test_departure_boards_scored_per_hub() {
    let client = FixtureClient::default()
        .with("/v1/sites", 200, sites_body())
        .with(
            "/v1/sites/9001/departures",
            200,
            json!({ "ResponseData": { "Metros": [
                { "DisplayTime": "Nu" },
                { "DisplayTime": "10 min" },
                { "DisplayTime": "20 min" },
            ]}})
            .to_string(),
        )
        .with(
            "/v1/sites/9192/departures",
            200,
            json!({ "buses": [] }).to_string(),
        );

    let pipeline = Pipeline::from_config(&departure_config(), client.clone()).expect("pipeline");
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 13, 5, 0).unwrap();
    let response = HeatResponse::from_result(pipeline.run_at(now).await);

    assert!(response.is_success());
    let features = response.body["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);

    assert_eq!(features[0]["properties"]["name"], "T-Centralen");
    let busy = features[0]["properties"]["weight"].as_f64().unwrap();
    assert!((busy - 1.0 / 3.0).abs() < 1e-9);

    assert_eq!(features[1]["properties"]["name"], "Slussen");
    assert_eq!(features[1]["properties"]["weight"], json!(0.12));

    assert!(!client.requested().contains(&"/v1/sites/5502/departures".to_string()));
}

#[tokio::test]
async fn test_unlocated_hub_is_still_requested() {
    let client = FixtureClient::default()
        .with(
            "/v1/sites",
            200,
            json!([
                { "id": 9001, "name": "T-Centralen", "lat": 59.3313, "lon": 18.0597 },
                { "id": 9192, "name": "Slussen" },
            ])
            .to_string(),
        )
        .with(
            "/v1/sites/9001/departures",
            200,
            json!({ "metros": [{ "display": "Nu" }] }).to_string(),
        )
        .with("/v1/sites/9192/departures", 503, Vec::new());

    let pipeline = Pipeline::from_config(&departure_config(), client.clone()).expect("pipeline");
    let response = HeatResponse::from_result(pipeline.run().await);

    assert_eq!(response.status, 500);
    assert_eq!(response.body["error"], "UpstreamError");
    assert!(client.requested().contains(&"/v1/sites/9192/departures".to_string()));
}

#[tokio::test]
async fn test_one_failed_hub_fails_the_invocation() {
    let client = FixtureClient::default()
        .with("/v1/sites", 200, sites_body())
        .with(
            "/v1/sites/9001/departures",
            200,
            json!({ "metros": [{ "display": "Nu" }] }).to_string(),
        )
        .with("/v1/sites/9192/departures", 503, Vec::new());

    let pipeline = Pipeline::from_config(&departure_config(), client).expect("pipeline");
    let response = HeatResponse::from_result(pipeline.run().await);

    assert_eq!(response.status, 500);
    assert_eq!(response.body["error"], "UpstreamError");
    assert!(response.body.get("features").is_none());
}

#[tokio::test]
async fn test_every_feature_strictly_inside_region() {
    // Edges chosen to be exact in f32 so boundary points land on the box.
    let bbox = BoundingBox::new(17.75, 59.25, 18.25, 59.5);
    let mut config = vehicle_config();
    config.region.bbox = bbox;

    let client = FixtureClient::default().with(
        "/sweden/VehiclePositions.pb",
        200,
        feed_bytes(vec![
            vehicle("center", 59.375, 18.0),
            vehicle("near-corner", 59.26, 17.76),
            vehicle("west-edge", 59.375, 17.75),
            vehicle("east-edge", 59.375, 18.25),
            vehicle("south-edge", 59.25, 18.0),
            vehicle("north-edge", 59.5, 18.0),
            vehicle("corner", 59.5, 18.25),
            vehicle("outside", 59.75, 18.5),
        ]),
    );

    let collection = Pipeline::from_config(&config, client)
        .expect("pipeline")
        .run()
        .await
        .expect("vehicle run");

    assert_eq!(collection.features.len(), 2);
    for feature in &collection.features {
        let Some(geojson::Value::Point(coords)) = feature.geometry.as_ref().map(|g| &g.value)
        else {
            panic!("expected point geometry");
        };
        assert!(bbox.contains(coords[0], coords[1]), "{coords:?} outside");
        assert!(coords[0] > 17.75 && coords[0] < 18.25);
        assert!(coords[1] > 59.25 && coords[1] < 59.5);
    }
}

#[test]
fn test_proximity_weight_stays_within_bounds() {
    let scorer = ProximityScorer::new(ScoringConfig::default());
    let now = chrono_tz::Europe::Stockholm
        .with_ymd_and_hms(2025, 3, 1, 14, 5, 0)
        .unwrap();
    let labels = ["Nu", "1 min", "3 min", "14:10", "garbage", "02:00"];

    for n in 0..40 {
        let departures: Vec<Departure> = (0..n)
            .map(|i| Departure {
                mode: TransitMode::Bus,
                time: Some(labels[i % labels.len()].to_string()),
            })
            .collect();
        let weight = scorer.score(&departures, &now);
        assert!((0.12..=1.0).contains(&weight), "weight {weight} for {n} departures");
    }
}
