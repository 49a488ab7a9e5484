//! Replay source for recorded snapshot sequences
//!
//! A replay file is YAML with a tick rate and a list of snapshots:
//!
//! ```yaml
//! tick_rate: 60
//! frames:
//!   - session: 1
//!     track_name: magione
//!     cars:
//!       - car_name: ktm_xbow_r
//!         last_lap_ms: 78800
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use tokio::time::{Duration, Interval, interval};
use tracing::{debug, info, trace, warn};

use crate::source::TelemetrySource;
use crate::types::TelemetrySnapshot;
use crate::{RecordError, Result};

/// Tick rate assumed when a replay file does not state one.
pub const DEFAULT_TICK_RATE: f64 = 60.0;

fn default_tick_rate() -> f64 {
    DEFAULT_TICK_RATE
}

/// On-disk replay document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFile {
    #[serde(default = "default_tick_rate")]
    pub tick_rate: f64,
    #[serde(default)]
    pub frames: Vec<TelemetrySnapshot>,
}

impl ReplayFile {
    /// Parse a replay document.
    pub fn parse(yaml: &str) -> Result<Self> {
        let file: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| RecordError::parse_error("replay file", e.to_string()))?;
        if !file.tick_rate.is_finite() || file.tick_rate <= 0.0 {
            return Err(RecordError::parse_error(
                "replay file",
                format!("tick_rate must be positive, got {}", file.tick_rate),
            ));
        }
        Ok(file)
    }
}

/// Replays recorded snapshots at their recorded pace, scaled by a speed factor.
#[derive(Debug)]
pub struct ReplaySource {
    frames: VecDeque<TelemetrySnapshot>,
    total_frames: usize,
    tick_rate: f64,
    /// Playback speed multiplier (1.0 = normal, 2.0 = double speed)
    speed: f64,
    /// Created on first use so a source can be built outside a runtime
    interval: Option<Interval>,
}

impl ReplaySource {
    /// Load a replay file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|e| RecordError::io_error(path, e))?;
        let file = ReplayFile::parse(&yaml)?;
        info!(
            path = %path.display(),
            frames = file.frames.len(),
            tick_rate = file.tick_rate,
            "Opened replay file"
        );
        Ok(Self::from_file(file))
    }

    /// Replay an in-memory document.
    pub fn from_file(file: ReplayFile) -> Self {
        Self::from_frames(file.tick_rate, file.frames)
    }

    /// Replay `frames` at `tick_rate` ticks per second.
    pub fn from_frames(
        tick_rate: f64,
        frames: impl IntoIterator<Item = TelemetrySnapshot>,
    ) -> Self {
        let frames: VecDeque<_> = frames.into_iter().collect();
        let tick_rate = if tick_rate.is_finite() && tick_rate > 0.0 {
            tick_rate
        } else {
            DEFAULT_TICK_RATE
        };
        Self { total_frames: frames.len(), frames, tick_rate, speed: 1.0, interval: None }
    }

    /// Builder form of [`set_speed`](Self::set_speed).
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.set_speed(speed);
        self
    }

    /// Set playback speed, clamped to `0.1..=10.0`. Non-finite values are
    /// ignored and the current speed is kept.
    pub fn set_speed(&mut self, speed: f64) {
        if !speed.is_finite() {
            warn!(speed, current = self.speed, "Ignoring non-finite playback speed");
            return;
        }
        self.speed = speed.clamp(0.1, 10.0);
        self.interval = None;
        debug!(speed = self.speed, "Playback speed set");
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Total number of frames in the replay.
    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// Frames already delivered.
    pub fn current_frame(&self) -> usize {
        self.total_frames - self.frames.len()
    }

    /// Playback length at normal speed.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_frames as f64 / self.tick_rate)
    }

    fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / (self.tick_rate * self.speed))
    }
}

#[async_trait::async_trait]
impl TelemetrySource for ReplaySource {
    async fn next_snapshot(&mut self) -> Result<Option<TelemetrySnapshot>> {
        if self.frames.is_empty() {
            debug!(frames = self.total_frames, "Reached end of replay");
            return Ok(None);
        }

        let period = self.frame_period();
        self.interval.get_or_insert_with(|| interval(period)).tick().await;

        let snapshot = self.frames.pop_front();
        trace!(frame = self.current_frame(), total = self.total_frames, "Replay frame");
        Ok(snapshot)
    }

    fn tick_rate(&self) -> f64 {
        self.tick_rate * self.speed
    }
}
