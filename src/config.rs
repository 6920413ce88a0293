//! Static startup configuration.
//!
//! Every field defaults to the Stockholm deployment, so a config file only
//! needs to list what it overrides:
//!
//! ```json
//! {
//!   "source": "departures",
//!   "departures": { "hubs": ["T-Centralen", "Slussen"], "concurrency": 2 }
//! }
//! ```
//!
//! The API key is never read from the file; it comes from `GTFS_KEY`.

use std::fmt;
use std::path::Path;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::fetch::RetryPolicy;
use crate::fetch::auth::FeedAuth;
use crate::geo::BoundingBox;
use crate::scoring::ScoringConfig;

/// Environment variable holding the vehicle feed API key.
pub const API_KEY_ENV: &str = "GTFS_KEY";

/// Placeholder substituted with a site id in [`DepartureBoardConfig::departures_url`].
pub const SITE_ID_PLACEHOLDER: &str = "{site_id}";

/// Which production feed the pipeline reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Vehicle positions from the GTFS-RT feed.
    #[default]
    Vehicles,
    /// Crowding estimates from hub departure boards.
    Departures,
}

/// An API key that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiSecret(String);

impl ApiSecret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiSecret(***)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub bbox: BoundingBox,
    /// Zone in which departure-board clock times are read.
    pub timezone: Tz,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            bbox: BoundingBox::stockholm(),
            timezone: chrono_tz::Europe::Stockholm,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleFeedConfig {
    pub url: String,
    pub auth: FeedAuth,
    /// Upper bound on emitted features; larger sets are thinned.
    pub max_features: usize,
}

impl Default for VehicleFeedConfig {
    fn default() -> Self {
        Self {
            url: "https://opendata.samtrafiken.se/gtfs-rt/sweden/VehiclePositions.pb".to_string(),
            auth: FeedAuth::default(),
            max_features: 1500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DepartureBoardConfig {
    pub sites_url: String,
    /// Per-site departures URL containing [`SITE_ID_PLACEHOLDER`].
    pub departures_url: String,
    /// Sites whose name contains any of these (case-insensitive) are hubs.
    pub hubs: Vec<String>,
    /// Maximum number of departure requests in flight.
    pub concurrency: usize,
    pub scoring: ScoringConfig,
}

impl DepartureBoardConfig {
    pub fn departures_url_for(&self, site_id: &str) -> String {
        self.departures_url.replace(SITE_ID_PLACEHOLDER, site_id)
    }
}

impl Default for DepartureBoardConfig {
    fn default() -> Self {
        Self {
            sites_url: "https://transport.integration.sl.se/v1/sites?expand=true".to_string(),
            departures_url: "https://transport.integration.sl.se/v1/sites/{site_id}/departures"
                .to_string(),
            hubs: [
                "T-Centralen",
                "Slussen",
                "Odenplan",
                "Fridhemsplan",
                "Gullmarsplan",
                "Liljeholmen",
                "Tekniska högskolan",
                "Medborgarplatsen",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            concurrency: 4,
            scoring: ScoringConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Budget for one whole invocation when served over HTTP.
    pub request_deadline_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            request_deadline_secs: 25,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatConfig {
    pub source: SourceKind,
    pub region: RegionConfig,
    pub vehicles: VehicleFeedConfig,
    pub departures: DepartureBoardConfig,
    pub http: HttpConfig,
    #[serde(skip)]
    pub api_key: Option<ApiSecret>,
}

impl HeatConfig {
    /// Loads the config file at `path` (or defaults) and the API key from
    /// the environment, then validates the settings.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Configuration`] if the file cannot be read or parsed
    /// or a setting is out of range.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let key = std::env::var(API_KEY_ENV).ok();
        let config = match key {
            Some(key) => config.with_api_key(key),
            None => config,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            PipelineError::configuration(format!("invalid config {}: {e}", path.display()))
        })
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.api_key = (!key.is_empty()).then_some(ApiSecret(key));
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(ApiSecret::expose)
    }

    /// Checks that every tunable is in range.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.region.bbox.is_valid() {
            return Err(PipelineError::configuration(
                "region.bbox must be finite with min < max on both axes",
            ));
        }

        let scoring = &self.departures.scoring;
        if !(scoring.horizon_minutes.is_finite() && scoring.horizon_minutes > 0.0) {
            return Err(PipelineError::configuration(
                "departures.scoring.horizon_minutes must be positive",
            ));
        }
        if !(scoring.divisor.is_finite() && scoring.divisor > 0.0) {
            return Err(PipelineError::configuration(
                "departures.scoring.divisor must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&scoring.floor) {
            return Err(PipelineError::configuration(
                "departures.scoring.floor must be within [0, 1]",
            ));
        }
        if self.departures.concurrency == 0 {
            return Err(PipelineError::configuration(
                "departures.concurrency must be at least 1",
            ));
        }
        if self.source == SourceKind::Departures && self.departures.hubs.is_empty() {
            return Err(PipelineError::configuration(
                "departures.hubs must name at least one hub",
            ));
        }
        // A blank name is a substring of every site name.
        if self.departures.hubs.iter().any(|h| h.trim().is_empty()) {
            return Err(PipelineError::configuration(
                "departures.hubs must not contain blank names",
            ));
        }
        if self.http.timeout_secs == 0 || self.http.connect_timeout_secs == 0 {
            return Err(PipelineError::configuration(
                "http timeouts must be at least one second",
            ));
        }
        if self.http.request_deadline_secs == 0 {
            return Err(PipelineError::configuration(
                "http.request_deadline_secs must be at least one second",
            ));
        }

        Ok(())
    }

    /// Checks that the selected source has the secrets it needs.
    pub fn require_credentials(&self) -> Result<(), PipelineError> {
        if self.source == SourceKind::Vehicles
            && self.vehicles.auth.requires_auth()
            && self.api_key().is_none()
        {
            return Err(PipelineError::configuration(format!(
                "{API_KEY_ENV} must be set for the vehicle feed"
            )));
        }
        Ok(())
    }
}
