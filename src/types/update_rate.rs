//! Rate control for display subscriptions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a subscriber wants display updates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every engine tick
    EveryTick,

    /// At most this many updates per second.
    /// Rates at or above the source tick rate behave like `EveryTick`.
    Max(u32),
}

impl UpdateRate {
    /// Minimum spacing between updates, or `None` when no throttling is needed.
    pub fn interval(self, source_hz: f64) -> Option<Duration> {
        match self {
            UpdateRate::EveryTick => None,
            UpdateRate::Max(0) => None,
            UpdateRate::Max(hz) if f64::from(hz) >= source_hz => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}
