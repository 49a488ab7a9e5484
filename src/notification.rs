//! Record and finish announcements
//!
//! The engine does not render anything itself. It hands each announcement to a
//! [`NotificationSink`] supplied by the host, which may put it on screen, write
//! it to a console, or collect it for tests.

use std::fmt;
use tracing::info;

use crate::store::TrackBest;
use crate::types::{CarIdentity, LapTime, TrackKey, format_millis, format_previous};

/// Single-line announcement produced by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Fastest lap on the track across all cars.
    TrackRecord {
        track: TrackKey,
        car: CarIdentity,
        time: LapTime,
        /// Record that was beaten, `None` for the first entry on a track
        previous: Option<TrackBest>,
    },
    /// Faster than the car's own stored best, slower than the track record.
    PersonalBest {
        track: TrackKey,
        car: CarIdentity,
        time: LapTime,
        /// The car's previous best, `None` for its first entry
        previous: Option<LapTime>,
    },
    /// A car crossed the line at the end of the race.
    Finished {
        track: TrackKey,
        car: CarIdentity,
        driver: String,
        /// One-based place
        position: Option<usize>,
        /// Raw last-lap value, formatted as `invalid` when not positive
        last_lap_ms: i32,
    },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::TrackRecord { track, car, time, previous } => {
                let previous = previous
                    .as_ref()
                    .map_or_else(|| "none".to_string(), |p| format!("{} by {}", p.time, p.car));
                write!(
                    f,
                    "NEW TRACK RECORD: {car} on {track}! Time: {time} (Previous: {previous})"
                )
            }
            Notification::PersonalBest { track, car, time, previous } => {
                let previous = format_previous(*previous);
                write!(
                    f,
                    "NEW PERSONAL BEST: {car} on {track}! Time: {time} (Previous: {previous})"
                )
            }
            Notification::Finished { track, car, driver, position, last_lap_ms } => {
                let place = position.map_or_else(|| "?".to_string(), |p| p.to_string());
                write!(
                    f,
                    "P{place} - {driver} in {car} finished at {track} with time {}",
                    format_millis(i64::from(*last_lap_ms))
                )
            }
        }
    }
}

/// Receiver of engine announcements.
pub trait NotificationSink {
    /// Deliver one announcement. Must not block the tick.
    fn notify(&mut self, notification: Notification);
}

/// Collects announcements in memory.
impl NotificationSink for Vec<Notification> {
    fn notify(&mut self, notification: Notification) {
        self.push(notification);
    }
}

/// Writes announcements to the `tracing` log at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&mut self, notification: Notification) {
        info!(target: "trackstats::announce", "{}", notification);
    }
}

/// Forwards announcements over an unbounded channel; dropped receivers are ignored.
impl NotificationSink for tokio::sync::mpsc::UnboundedSender<Notification> {
    fn notify(&mut self, notification: Notification) {
        let _ = self.send(notification);
    }
}
