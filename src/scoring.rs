//! Heat weights for normalized entities.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::model::{Departure, EntityAttributes, NormalizedEntity};
use crate::time::parse_minutes;

/// Assigns a heat weight to each entity.
pub trait Scorer: Send + Sync {
    fn weigh(&self, entity: &NormalizedEntity, now: &DateTime<Tz>) -> f64;
}

/// Every vehicle counts the same.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformScorer;

impl Scorer for UniformScorer {
    fn weigh(&self, _entity: &NormalizedEntity, _now: &DateTime<Tz>) -> f64 {
        1.0
    }
}

/// Tunables for [`ProximityScorer`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Forward window in minutes; departures beyond it do not count.
    pub horizon_minutes: f64,
    /// Raw score that maps to full intensity.
    pub divisor: f64,
    /// Minimum weight, keeps quiet hubs visible.
    pub floor: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            horizon_minutes: 30.0,
            divisor: 6.0,
            floor: 0.12,
        }
    }
}

/// Closeness-weighted crowd estimate over near-term departures.
///
/// Each departure `m` minutes away with `0 <= m <= horizon` contributes
/// `1 - m / horizon`. The sum is divided by `divisor` and clamped to
/// `[floor, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct ProximityScorer {
    config: ScoringConfig,
}

impl ProximityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn raw_score(&self, departures: &[Departure], now: &DateTime<Tz>) -> f64 {
        let horizon = self.config.horizon_minutes;
        departures
            .iter()
            .map(|d| parse_minutes(d.time.as_deref(), now))
            .filter(|m| (0.0..=horizon).contains(m))
            .map(|m| 1.0 - m / horizon)
            .sum()
    }

    pub fn score(&self, departures: &[Departure], now: &DateTime<Tz>) -> f64 {
        let raw = self.raw_score(departures, now);
        // Never panics on a floor above 1 or NaN, unlike `f64::clamp`.
        (raw / self.config.divisor).max(self.config.floor).min(1.0)
    }
}

impl Scorer for ProximityScorer {
    fn weigh(&self, entity: &NormalizedEntity, now: &DateTime<Tz>) -> f64 {
        match &entity.attributes {
            EntityAttributes::Site(site) => self.score(&site.departures, now),
            EntityAttributes::Vehicle(_) => self.config.floor,
        }
    }
}
