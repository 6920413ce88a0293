//! Feed sources: every variant fetches one upstream and normalizes it into
//! [`NormalizedEntity`] values inside the configured region.

pub mod departures;
pub mod mock;
pub mod vehicles;

pub use departures::DepartureBoardSource;
pub use mock::MockSource;
pub use vehicles::VehicleTelemetrySource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::PipelineError;
use crate::model::NormalizedEntity;

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Fetches and normalizes one snapshot. `captured_at` is stamped on
    /// every returned entity.
    async fn fetch(&self, captured_at: DateTime<Utc>)
    -> Result<Vec<NormalizedEntity>, PipelineError>;
}
