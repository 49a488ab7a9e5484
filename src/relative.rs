//! Live time gaps to the neighbouring cars on the leaderboard
//!
//! Gaps are estimated from the spline distance between two cars divided by
//! their average speed. Everything here is a pure function of one snapshot.

use std::fmt;

use crate::config::DEFAULT_GAP_THRESHOLD_MS;
use crate::types::{CarIdentity, TelemetrySnapshot};

/// Lower bound applied to each car's speed before averaging, in m/s.
pub const MIN_SPEED_MS: f32 = 0.1;

/// Car indices ordered by leaderboard position; cars with an invalid position are left out.
pub fn leaderboard(snapshot: &TelemetrySnapshot) -> Vec<usize> {
    let mut order: Vec<(usize, usize)> = snapshot
        .cars
        .iter()
        .enumerate()
        .filter_map(|(index, car)| car.position().map(|position| (position, index)))
        .collect();
    order.sort_unstable();
    order.into_iter().map(|(_, index)| index).collect()
}

/// Spline distance from `me` to `other`, wrapped into `[-0.5, 0.5]`.
///
/// Positive when `other` is ahead on track.
pub fn wrapped_delta(other: f32, me: f32) -> f32 {
    let delta = other - me;
    if delta < -0.5 {
        delta + 1.0
    } else if delta > 0.5 {
        delta - 1.0
    } else {
        delta
    }
}

/// Gap in milliseconds from a car at `me_pos` to one at `other_pos`.
pub fn gap_millis(
    other_pos: f32,
    me_pos: f32,
    other_speed: f32,
    me_speed: f32,
    track_length_m: f32,
) -> f64 {
    let meters = f64::from(wrapped_delta(other_pos, me_pos)) * f64::from(track_length_m);
    let speed =
        (f64::from(other_speed.max(MIN_SPEED_MS)) + f64::from(me_speed.max(MIN_SPEED_MS))) / 2.0;
    meters / speed * 1000.0
}

/// Gap to one neighbouring car.
#[derive(Debug, Clone, PartialEq)]
pub struct CarGap {
    pub car_index: usize,
    pub car: CarIdentity,
    /// Signed gap in milliseconds, positive when the other car is ahead on track
    pub gap_ms: f64,
}

/// Relative position of the focused car.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Relative {
    /// No focused car, or the focused car has no leaderboard position.
    #[default]
    NoData,
    /// Neither neighbour is close enough to show.
    InLead,
    /// At least one neighbour within the threshold.
    Gaps { ahead: Option<CarGap>, behind: Option<CarGap> },
}

impl fmt::Display for Relative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relative::NoData => Ok(()),
            Relative::InLead => f.write_str("In Lead"),
            Relative::Gaps { ahead: Some(ahead), behind: Some(behind) } => {
                write!(
                    f,
                    "↑ {} -{} ↓ {} +{}",
                    ahead.car.short_label(),
                    format_gap(ahead.gap_ms),
                    behind.car.short_label(),
                    format_gap(behind.gap_ms)
                )
            }
            Relative::Gaps { ahead: Some(ahead), behind: None } => {
                write!(f, "↑ {} -{}", ahead.car.short_label(), format_gap(ahead.gap_ms))
            }
            Relative::Gaps { ahead: None, behind: Some(behind) } => {
                write!(f, "Lead ↓ {} +{}", behind.car.short_label(), format_gap(behind.gap_ms))
            }
            Relative::Gaps { ahead: None, behind: None } => f.write_str("In Lead"),
        }
    }
}

/// Format the magnitude of a gap as `M:SS.mmm`.
pub fn format_gap(gap_ms: f64) -> String {
    let ms = gap_ms.abs().round() as i64;
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    format!("{minutes}:{seconds:02}.{:03}", ms % 1_000)
}

/// Computes [`Relative`] for the focused car of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeGapCalculator {
    threshold_ms: f64,
}

impl Default for RelativeGapCalculator {
    fn default() -> Self {
        Self { threshold_ms: DEFAULT_GAP_THRESHOLD_MS }
    }
}

impl RelativeGapCalculator {
    /// Calculator discarding gaps larger than `threshold_ms`.
    pub fn new(threshold_ms: f64) -> Self {
        Self { threshold_ms }
    }

    pub fn threshold_ms(&self) -> f64 {
        self.threshold_ms
    }

    /// Gaps from the focused car to its leaderboard neighbours.
    pub fn compute(&self, snapshot: &TelemetrySnapshot) -> Relative {
        let Some((focused, me)) = snapshot.focused() else {
            return Relative::NoData;
        };
        let order = leaderboard(snapshot);
        let Some(slot) = order.iter().position(|&index| index == focused) else {
            return Relative::NoData;
        };

        let gap_to = |index: usize| {
            let other = snapshot.car(index)?;
            let gap_ms = gap_millis(
                other.spline_position,
                me.spline_position,
                other.speed_ms,
                me.speed_ms,
                snapshot.track_length_m,
            );
            (gap_ms.abs() <= self.threshold_ms).then(|| CarGap {
                car_index: index,
                car: other.identity(),
                gap_ms,
            })
        };

        let ahead = slot.checked_sub(1).and_then(|s| order.get(s)).and_then(|&i| gap_to(i));
        let behind = order.get(slot + 1).and_then(|&i| gap_to(i));

        match (ahead, behind) {
            (None, None) => Relative::InLead,
            (ahead, behind) => Relative::Gaps { ahead, behind },
        }
    }
}
