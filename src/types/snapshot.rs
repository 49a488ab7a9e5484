//! Per-tick telemetry snapshot supplied by the host simulator

use serde::{Deserialize, Serialize};

use super::{CarIdentity, LapTime, TrackKey};

/// State of one car for a single tick.
///
/// Mirrors the simulator's per-car accessors. Time fields are raw milliseconds
/// where zero or negative means "not available"; use the typed accessors to get
/// validated values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarSample {
    /// Completed laps
    pub lap_count: i32,
    /// Running time of the lap in progress
    pub current_lap_ms: i32,
    /// Time of the last completed lap
    pub last_lap_ms: i32,
    /// Best lap of this session according to the simulator
    pub best_lap_ms: i32,
    /// Normalized spline position in `[0, 1)`
    pub spline_position: f32,
    /// Speed in meters per second
    pub speed_ms: f32,
    /// Zero-based realtime leaderboard position, negative when unknown
    pub leaderboard_position: i32,
    /// Simulator's own race-finished flag
    pub race_finished: bool,
    /// Technical car name
    pub car_name: String,
    /// Driver display name
    pub driver_name: String,
}

impl CarSample {
    /// Record key for this car.
    pub fn identity(&self) -> CarIdentity {
        CarIdentity::new(self.car_name.clone())
    }

    /// Last completed lap, if valid.
    pub fn last_lap(&self) -> Option<LapTime> {
        LapTime::from_millis(i64::from(self.last_lap_ms))
    }

    /// Lap in progress, if valid.
    pub fn current_lap(&self) -> Option<LapTime> {
        LapTime::from_millis(i64::from(self.current_lap_ms))
    }

    /// Session best reported by the simulator, if valid.
    pub fn session_best(&self) -> Option<LapTime> {
        LapTime::from_millis(i64::from(self.best_lap_ms))
    }

    /// Leaderboard position, `None` for the negative sentinel.
    pub fn position(&self) -> Option<usize> {
        usize::try_from(self.leaderboard_position).ok()
    }
}

/// Read-only view of every car, supplied once per tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySnapshot {
    /// Session generation; a change starts a new session
    pub session: u32,
    /// Technical track name
    pub track_name: String,
    /// Track layout name, if the track has several
    pub track_layout: Option<String>,
    /// Track length in meters
    pub track_length_m: f32,
    /// Car the camera is focused on, negative when none
    pub focused_car: i32,
    /// Cars indexed by simulator car id
    pub cars: Vec<CarSample>,
}

impl TelemetrySnapshot {
    /// Key of the active track configuration.
    pub fn track_key(&self) -> TrackKey {
        TrackKey::new(self.track_name.clone(), self.track_layout.as_deref())
    }

    /// Car by index.
    pub fn car(&self, index: usize) -> Option<&CarSample> {
        self.cars.get(index)
    }

    /// Index of the focused car when it refers to a car in this snapshot.
    pub fn focused_index(&self) -> Option<usize> {
        usize::try_from(self.focused_car).ok().filter(|&index| index < self.cars.len())
    }

    /// Focused car with its index.
    pub fn focused(&self) -> Option<(usize, &CarSample)> {
        self.focused_index().and_then(|index| self.car(index).map(|car| (index, car)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_values_map_to_none() {
        let car = CarSample {
            last_lap_ms: 0,
            best_lap_ms: -1,
            leaderboard_position: -1,
            ..Default::default()
        };
        assert!(car.last_lap().is_none());
        assert!(car.session_best().is_none());
        assert!(car.position().is_none());
    }

    #[test]
    fn focused_car_must_exist() {
        let mut snapshot = TelemetrySnapshot {
            cars: vec![CarSample::default(), CarSample::default()],
            focused_car: 1,
            ..Default::default()
        };
        assert_eq!(snapshot.focused_index(), Some(1));

        snapshot.focused_car = 2;
        assert!(snapshot.focused().is_none());

        snapshot.focused_car = -1;
        assert!(snapshot.focused().is_none());
    }

    #[test]
    fn snapshot_deserializes_with_defaults() {
        let yaml = "track_name: monza\ncars:\n  - car_name: bmw_m3_e30\n    last_lap_ms: 95000\n";
        let snapshot: TelemetrySnapshot = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(snapshot.track_key(), TrackKey::new("monza", None));
        assert_eq!(snapshot.cars[0].last_lap().map(LapTime::as_millis), Some(95_000));
        assert_eq!(snapshot.cars[0].leaderboard_position, 0);
    }
}
