//! Lap time representation and `M:SS.mmm` formatting

use serde::{Deserialize, Serialize};
use std::fmt;

/// Text shown for a time value that is zero or negative.
pub const INVALID_TIME: &str = "invalid";

/// Placeholder shown on a label while no time is available.
pub const NO_TIME: &str = "--:--.---";

/// A strictly positive lap time in milliseconds.
///
/// Telemetry reports "not available" as zero or a negative number; those values
/// never become a `LapTime`, so every stored record is positive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct LapTime(u32);

impl LapTime {
    /// Convert a raw telemetry value. Returns `None` for values `<= 0` or beyond `u32`.
    pub fn from_millis(ms: i64) -> Option<Self> {
        if ms <= 0 {
            return None;
        }
        u32::try_from(ms).ok().map(Self)
    }

    /// Milliseconds as stored on disk.
    pub fn as_millis(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for LapTime {
    type Error = String;

    fn try_from(ms: i64) -> Result<Self, Self::Error> {
        Self::from_millis(ms).ok_or_else(|| format!("lap time must be positive, got {ms}"))
    }
}

impl From<LapTime> for u32 {
    fn from(time: LapTime) -> Self {
        time.0
    }
}

impl fmt::Display for LapTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_millis(i64::from(self.0)))
    }
}

/// Format milliseconds as `M:SS.mmm`, or [`INVALID_TIME`] for non-positive input.
pub fn format_millis(ms: i64) -> String {
    if ms <= 0 {
        return INVALID_TIME.to_string();
    }
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!("{minutes}:{seconds:02}.{millis:03}")
}

/// Format an optional lap time, falling back to `none`.
pub fn format_previous(time: Option<LapTime>) -> String {
    time.map_or_else(|| "none".to_string(), |t| t.to_string())
}
