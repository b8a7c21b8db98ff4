//! Jittered sleep intervals

use rand::Rng;
use std::time::Duration;

/// A base interval with a symmetric uniform spread
///
/// Samples fall in `[base - spread, base + spread]`, inclusive on both ends,
/// saturating at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    base: Duration,
    spread: Duration,
}

impl Jitter {
    pub fn new(base: Duration, spread: Duration) -> Self {
        Self { base, spread }
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn spread(&self) -> Duration {
        self.spread
    }

    /// Draw the next sleep duration (millisecond resolution)
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.spread.is_zero() {
            return self.base;
        }

        let spread_ms = u64::try_from(self.spread.as_millis()).unwrap_or(u64::MAX);
        let offset_ms = rng.random_range(0..=spread_ms.saturating_mul(2));

        self.base
            .saturating_add(Duration::from_millis(offset_ms))
            .saturating_sub(self.spread)
    }
}
