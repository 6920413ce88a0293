use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hard cap on attempts regardless of configuration.
pub const MAX_ATTEMPTS: u32 = 3;

/// Bounded exponential backoff for transient upstream failures
/// (transport errors, HTTP 429, HTTP 5xx).
///
/// The default of one attempt means no retry at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Effective number of attempts, between 1 and [`MAX_ATTEMPTS`].
    pub fn attempts(&self) -> u32 {
        self.max_attempts.clamp(1, MAX_ATTEMPTS)
    }

    /// Delay before retrying after the `attempt`-th failure (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(MAX_ATTEMPTS);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}
