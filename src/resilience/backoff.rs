//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Delay before retry `n`: `base^n` units plus uniform jitter in `[0, jitter_max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    exponent_base: u32,
    unit_ms: u64,
    jitter_max_ms: u64,
}

impl ExponentialBackoff {
    pub fn new(exponent_base: u32, unit: Duration, jitter_max: Duration) -> Self {
        Self {
            exponent_base,
            unit_ms: unit.as_millis() as u64,
            jitter_max_ms: jitter_max.as_millis() as u64,
        }
    }

    /// The deterministic part of the delay before retry `attempt` (1-based).
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.exponent_base).saturating_pow(attempt);
        Duration::from_millis(self.unit_ms.saturating_mul(factor))
    }

    /// Full delay before retry `attempt`, drawing jitter from `rng`.
    pub fn delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let jitter = if self.jitter_max_ms > 0 {
            rng.gen_range(0..self.jitter_max_ms)
        } else {
            0
        };
        self.base_delay(attempt) + Duration::from_millis(jitter)
    }

    /// Full delay using the thread-local generator.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        self.delay(attempt, &mut rand::thread_rng())
    }

    pub fn jitter_max(&self) -> Duration {
        Duration::from_millis(self.jitter_max_ms)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(1), Duration::from_millis(100))
    }
}
