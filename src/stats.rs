use serde::Serialize;
use tracing::info;

/// Counters collected while normalizing one upstream response.
///
/// None of the skip reasons are errors; they are logged so that a feed
/// that suddenly loses positions or drifts outside the region is visible.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub total_entities: usize,

    // soft skips
    pub without_position: usize,
    pub non_finite: usize,
    pub out_of_bounds: usize,

    // departure boards
    pub without_coordinate: usize,
    pub hubs_selected: usize,
    pub departures: usize,

    pub kept: usize,
}

impl NormalizeStats {
    pub fn skipped(&self) -> usize {
        self.without_position + self.non_finite + self.out_of_bounds + self.without_coordinate
    }

    pub fn kept_pct(&self) -> f64 {
        pct(self.kept, self.total_entities)
    }

    pub fn log(&self, source: &str) {
        info!(
            source,
            total = self.total_entities,
            without_position = self.without_position,
            non_finite = self.non_finite,
            out_of_bounds = self.out_of_bounds,
            skipped = self.skipped(),
            without_coordinate = self.without_coordinate,
            hubs_selected = self.hubs_selected,
            departures = self.departures,
            kept = self.kept,
            kept_pct = self.kept_pct(),
            "Feed normalized"
        );
    }
}

pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}
