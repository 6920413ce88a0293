//! One linear pass: fetch, normalize, filter, score, thin, emit.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use geojson::FeatureCollection;
use tracing::{debug, info};

use crate::config::{HeatConfig, SourceKind};
use crate::error::PipelineError;
use crate::fetch::{BasicClient, HttpClient};
use crate::output::{FeatureCollectionBuilder, ScoredPoint};
use crate::scoring::{ProximityScorer, Scorer, UniformScorer};
use crate::sources::{DepartureBoardSource, FeedSource, MockSource, VehicleTelemetrySource};
use crate::thin::thin;

pub struct Pipeline {
    source: Box<dyn FeedSource>,
    scorer: Box<dyn Scorer>,
    /// `None` disables thinning.
    max_features: Option<usize>,
    timezone: Tz,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn FeedSource>,
        scorer: Box<dyn Scorer>,
        max_features: Option<usize>,
        timezone: Tz,
    ) -> Self {
        Self {
            source,
            scorer,
            max_features,
            timezone,
        }
    }

    /// Builds the production pipeline for the configured source on top of
    /// `client`. Authentication for the vehicle feed is layered on here.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Configuration`] if the settings are invalid or a
    /// required secret is missing. Nothing is fetched before this check.
    pub fn from_config<C: HttpClient + 'static>(
        config: &HeatConfig,
        client: C,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        config.require_credentials()?;

        let bbox = config.region.bbox;
        let retry = config.http.retry;

        let pipeline = match config.source {
            SourceKind::Vehicles => {
                let client = config.vehicles.auth.wrap(client, config.api_key())?;
                Self::new(
                    Box::new(VehicleTelemetrySource::new(
                        client,
                        config.vehicles.url.clone(),
                        bbox,
                        retry,
                    )),
                    Box::new(UniformScorer),
                    Some(config.vehicles.max_features),
                    config.region.timezone,
                )
            }
            SourceKind::Departures => Self::new(
                Box::new(DepartureBoardSource::new(
                    client,
                    config.departures.clone(),
                    bbox,
                    retry,
                )),
                Box::new(ProximityScorer::new(config.departures.scoring)),
                None,
                config.region.timezone,
            ),
        };
        Ok(pipeline)
    }

    /// [`Pipeline::from_config`] with a fresh [`BasicClient`] using the
    /// configured timeouts.
    pub fn with_default_client(config: &HeatConfig) -> Result<Self, PipelineError> {
        let client = BasicClient::with_timeouts(
            Duration::from_secs(config.http.timeout_secs),
            Duration::from_secs(config.http.connect_timeout_secs),
        )?;
        Self::from_config(config, client)
    }

    /// Pipeline over [`MockSource`] points, for local development.
    pub fn mock(config: &HeatConfig, count: usize, seed: u64) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self::new(
            Box::new(MockSource::new(config.region.bbox, count, seed)),
            Box::new(UniformScorer),
            Some(config.vehicles.max_features),
            config.region.timezone,
        ))
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub async fn run(&self) -> Result<FeatureCollection, PipelineError> {
        self.run_at(Utc::now()).await
    }

    /// Runs one invocation with `now` as the capture and scoring time.
    #[tracing::instrument(skip(self), fields(source = self.source.name()))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<FeatureCollection, PipelineError> {
        let entities = self.source.fetch(now).await?;
        let local_now = now.with_timezone(&self.timezone);

        let points: Vec<ScoredPoint> = entities
            .iter()
            .map(|entity| ScoredPoint::new(entity, self.scorer.weigh(entity, &local_now)))
            .collect();

        let scored = points.len();
        let points = match self.max_features {
            Some(max) => thin(points, max),
            None => points,
        };
        if points.len() < scored {
            debug!(before = scored, after = points.len(), "Thinned output");
        }

        let mut builder = FeatureCollectionBuilder::with_capacity(points.len());
        for point in &points {
            builder.push(point);
        }

        info!(features = builder.len(), thinned = scored - points.len(), "Pipeline complete");
        Ok(builder.build())
    }

    /// Runs one invocation unless `cancel` resolves first, in which case
    /// all outstanding fetches are dropped and [`PipelineError::Cancelled`]
    /// is returned.
    pub async fn run_until<F>(&self, cancel: F) -> Result<FeatureCollection, PipelineError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.run() => result,
            () = cancel => {
                info!(source = self.source.name(), "Pipeline cancelled");
                Err(PipelineError::Cancelled)
            }
        }
    }
}
