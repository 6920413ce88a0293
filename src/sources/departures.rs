//! Hub crowding from departure-board JSON.
//!
//! The departure API has shipped several JSON shapes over the years. Each
//! record type therefore has an explicit, ordered field-resolution helper
//! below; the first candidate that yields a usable value wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use serde_json::Value;
use tracing::{debug, info};

use super::FeedSource;
use crate::config::DepartureBoardConfig;
use crate::error::PipelineError;
use crate::fetch::{HttpClient, RetryPolicy, fetch_json};
use crate::geo::BoundingBox;
use crate::model::{
    Coordinate, Departure, EntityAttributes, NormalizedEntity, SiteActivity, TransitMode,
};
use crate::stats::NormalizeStats;

/// Departure time fields, most specific first.
const TIME_FIELDS: [&str; 6] = [
    "display",
    "DisplayTime",
    "expected",
    "ExpectedDateTime",
    "scheduled",
    "TimeTabledDateTime",
];

const ID_FIELDS: [&str; 3] = ["id", "siteId", "SiteId"];
const NAME_FIELDS: [&str; 2] = ["name", "Name"];
const LAT_FIELDS: [&str; 2] = ["lat", "latitude"];
const LON_FIELDS: [&str; 3] = ["lon", "lng", "longitude"];

/// An entry of the site directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub id: String,
    pub name: String,
    pub coordinate: Option<Coordinate>,
}

/// Crowding estimates for configured hubs.
pub struct DepartureBoardSource<C> {
    client: C,
    config: DepartureBoardConfig,
    bbox: BoundingBox,
    retry: RetryPolicy,
}

impl<C: HttpClient> DepartureBoardSource<C> {
    pub fn new(
        client: C,
        config: DepartureBoardConfig,
        bbox: BoundingBox,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            config,
            bbox,
            retry,
        }
    }

    /// Fetches the site directory and returns the sites matching the hub
    /// list, in directory order.
    pub async fn hubs(&self) -> Result<Vec<Site>, PipelineError> {
        let directory = fetch_json(
            &self.client,
            &self.config.sites_url,
            &self.retry,
            "site directory",
        )
        .await?;
        let sites = parse_sites(&directory)?;
        debug!(sites = sites.len(), "Site directory received");

        Ok(select_hubs(&sites, &self.config.hubs)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn fetch_board(&self, site: &Site) -> Result<Vec<Departure>, PipelineError> {
        let url = self.config.departures_url_for(&site.id);
        let context = format!("departures for site {}", site.id);
        let doc = fetch_json(&self.client, &url, &self.retry, &context).await?;
        Ok(parse_departures(&doc))
    }
}

#[async_trait]
impl<C: HttpClient> FeedSource for DepartureBoardSource<C> {
    fn name(&self) -> &'static str {
        "departures"
    }

    #[tracing::instrument(skip(self), fields(source = "departures"))]
    async fn fetch(
        &self,
        captured_at: DateTime<Utc>,
    ) -> Result<Vec<NormalizedEntity>, PipelineError> {
        let hubs = self.hubs().await?;
        let mut stats = NormalizeStats {
            total_entities: hubs.len(),
            hubs_selected: hubs.len(),
            ..Default::default()
        };

        info!(
            hubs = hubs.len(),
            concurrency = self.config.concurrency,
            "Fetching departure boards"
        );

        // Every selected hub is requested, located or not. Any failed board
        // aborts the whole batch; dropping the stream cancels the requests
        // still in flight.
        let requests: Vec<_> = hubs.iter().map(|site| self.fetch_board(site)).collect();
        let boards: Vec<Vec<Departure>> = stream::iter(requests)
            .buffered(self.config.concurrency)
            .try_collect()
            .await?;

        let mut entities = Vec::with_capacity(hubs.len());
        for (site, departures) in hubs.into_iter().zip(boards) {
            let coordinate = match site.coordinate {
                None => {
                    stats.without_coordinate += 1;
                    continue;
                }
                Some(c) if !self.bbox.contains(c.lon, c.lat) => {
                    stats.out_of_bounds += 1;
                    continue;
                }
                Some(c) => c,
            };

            stats.departures += departures.len();
            entities.push(NormalizedEntity {
                coordinate,
                captured_at,
                attributes: EntityAttributes::Site(SiteActivity {
                    site_id: site.id,
                    name: site.name,
                    departures,
                }),
            });
        }

        stats.kept = entities.len();
        stats.log(self.name());
        Ok(entities)
    }
}

/// Parses the site directory. Accepts a bare array or an object holding the
/// array under `sites` or `ResponseData`. Entries without an id or name
/// are skipped.
///
/// # Errors
///
/// [`PipelineError::Decode`] if no site list can be found.
pub fn parse_sites(doc: &Value) -> Result<Vec<Site>, PipelineError> {
    let list = doc
        .as_array()
        .or_else(|| field(doc, "sites").and_then(Value::as_array))
        .or_else(|| field(doc, "ResponseData").and_then(Value::as_array))
        .ok_or_else(|| PipelineError::decode("site directory", "no site list in response"))?;

    Ok(list
        .iter()
        .filter_map(|item| {
            Some(Site {
                id: first_of(item, &ID_FIELDS, as_id)?,
                name: first_of(item, &NAME_FIELDS, as_text)?,
                coordinate: resolve_coordinate(item),
            })
        })
        .collect())
}

/// Sites whose name contains any hub name, ignoring case.
pub fn select_hubs<'a>(sites: &'a [Site], hubs: &[String]) -> Vec<&'a Site> {
    let hubs: Vec<String> = hubs.iter().map(|h| h.to_lowercase()).collect();
    sites
        .iter()
        .filter(|site| {
            let name = site.name.to_lowercase();
            hubs.iter().any(|hub| name.contains(hub.as_str()))
        })
        .collect()
}

/// Resolves a site's coordinate: explicit lat/lon pair, then a nested
/// `location` object, then GeoJSON-style `geometry.coordinates`.
pub fn resolve_coordinate(site: &Value) -> Option<Coordinate> {
    lat_lon_pair(site)
        .or_else(|| field(site, "location").and_then(lat_lon_pair))
        .or_else(|| {
            let coords = field(site, "geometry")
                .and_then(|g| field(g, "coordinates"))
                .and_then(Value::as_array)?;
            match coords.as_slice() {
                [lon, lat, ..] => Coordinate::finite(as_number(lon)?, as_number(lat)?),
                _ => None,
            }
        })
}

/// Flattens a departures response into one list.
///
/// Mode buckets (`metros`, `buses`, ...) are read in [`TransitMode::ALL`]
/// order, optionally nested under `ResponseData`; a flat `departures`
/// array tagged by `line.transport_mode` is read afterwards.
pub fn parse_departures(doc: &Value) -> Vec<Departure> {
    let root = field(doc, "ResponseData")
        .filter(|v| v.is_object())
        .unwrap_or(doc);

    let mut departures = Vec::new();

    for mode in TransitMode::ALL {
        let bucket = mode
            .bucket_keys()
            .iter()
            .find_map(|key| field(root, key).and_then(Value::as_array));
        if let Some(items) = bucket {
            departures.extend(items.iter().map(|item| Departure {
                mode,
                time: resolve_time(item),
            }));
        }
    }

    if let Some(items) = field(root, "departures").and_then(Value::as_array) {
        departures.extend(items.iter().filter_map(|item| {
            let label = field(item, "line")
                .and_then(|line| field(line, "transport_mode"))
                .or_else(|| field(item, "transport_mode"))
                .and_then(Value::as_str)?;
            Some(Departure {
                mode: TransitMode::from_label(label)?,
                time: resolve_time(item),
            })
        }));
    }

    departures
}

fn resolve_time(item: &Value) -> Option<String> {
    first_of(item, &TIME_FIELDS, as_text)
}

fn lat_lon_pair(obj: &Value) -> Option<Coordinate> {
    let lat = first_of(obj, &LAT_FIELDS, as_number)?;
    let lon = first_of(obj, &LON_FIELDS, as_number)?;
    Coordinate::finite(lon, lat)
}

/// Case-insensitive object field lookup.
fn field<'a>(obj: &'a Value, key: &str) -> Option<&'a Value> {
    obj.as_object()?
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

fn first_of<T>(obj: &Value, keys: &[&str], extract: fn(&Value) -> Option<T>) -> Option<T> {
    keys.iter().find_map(|key| field(obj, key).and_then(extract))
}

fn as_number(v: &Value) -> Option<f64> {
    let n: Option<f64> = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

fn as_text(v: &Value) -> Option<String> {
    v.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn as_id(v: &Value) -> Option<String> {
    match v {
        Value::Number(n) => Some(n.to_string()),
        _ => as_text(v),
    }
}
