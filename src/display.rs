//! Label texts for the on-screen widget
//!
//! [`DisplayModel`] keeps the few values that outlive a tick (lap counter,
//! record holder, stored car best) and renders a [`DisplayState`] from them and
//! the current snapshot. Stored values are re-read at most once per refresh
//! interval.

use serde::Serialize;
use std::time::{Duration, Instant};

use crate::relative::Relative;
use crate::store::TrackBest;
use crate::types::{LapTime, NO_TIME, TelemetrySnapshot};

/// Text of every label for one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    pub laps: String,
    pub current: String,
    pub best: String,
    pub last_lap: String,
    pub relative: String,
    pub track_record: String,
}

fn time_or_placeholder(time: Option<LapTime>) -> String {
    time.map_or_else(|| NO_TIME.to_string(), |t| t.to_string())
}

/// Session-scoped display state.
#[derive(Debug, Clone)]
pub struct DisplayModel {
    refresh: Duration,
    last_refresh: Option<Instant>,
    lap_count: i32,
    track_record: Option<TrackBest>,
    car_best: Option<LapTime>,
}

impl DisplayModel {
    pub fn new(refresh: Duration) -> Self {
        Self { refresh, last_refresh: None, lap_count: 0, track_record: None, car_best: None }
    }

    /// Whether stored values are due to be re-read.
    pub fn needs_refresh(&self, now: Instant) -> bool {
        self.last_refresh.is_none_or(|last| now.saturating_duration_since(last) >= self.refresh)
    }

    /// Replace the stored values shown on the labels.
    pub fn refresh_records(
        &mut self,
        track_record: Option<TrackBest>,
        car_best: Option<LapTime>,
        now: Instant,
    ) {
        self.track_record = track_record;
        self.car_best = car_best;
        self.last_refresh = Some(now);
    }

    /// Show a new record holder without waiting for the next refresh.
    pub fn set_track_record(&mut self, record: TrackBest) {
        self.track_record = Some(record);
    }

    pub fn track_record(&self) -> Option<&TrackBest> {
        self.track_record.as_ref()
    }

    /// Raise the lap counter. Returns the new count when it increased.
    pub fn observe_lap_count(&mut self, lap_count: i32) -> Option<i32> {
        (lap_count > self.lap_count).then(|| {
            self.lap_count = lap_count;
            lap_count
        })
    }

    pub fn lap_count(&self) -> i32 {
        self.lap_count
    }

    /// Render the labels for the focused car.
    ///
    /// `last_lap_seen` is the last lap already reported for the focused car.
    pub fn render(
        &self,
        snapshot: &TelemetrySnapshot,
        last_lap_seen: Option<LapTime>,
        relative: &Relative,
    ) -> DisplayState {
        let focused = snapshot.focused().map(|(_, car)| car);

        let current = focused.and_then(|car| car.current_lap());
        let best = [
            focused.and_then(|car| car.session_best()),
            self.car_best,
            focused.and_then(|car| car.last_lap()),
        ]
        .into_iter()
        .flatten()
        .min();

        let track_record = self.track_record.as_ref().map_or_else(
            || "Track Record: None".to_string(),
            |record| format!("Track Record: {} by {}", record.time, record.car),
        );

        DisplayState {
            laps: format!("Laps: {}", self.lap_count),
            current: format!("Current: {}", time_or_placeholder(current)),
            best: format!("Best: {}", time_or_placeholder(best)),
            last_lap: format!("Last Lap: {}", time_or_placeholder(last_lap_seen)),
            relative: relative.to_string(),
            track_record,
        }
    }

    /// Forget everything tied to the previous session.
    pub fn reset(&mut self) {
        *self = Self::new(self.refresh);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CarIdentity, CarSample};

    fn time(ms: i64) -> LapTime {
        LapTime::from_millis(ms).unwrap()
    }

    fn focused(car: CarSample) -> TelemetrySnapshot {
        TelemetrySnapshot { track_name: "monza".to_string(), cars: vec![car], ..Default::default() }
    }

    #[test]
    fn empty_session_shows_placeholders() {
        let model = DisplayModel::new(Duration::from_secs(2));
        let state = model.render(&focused(CarSample::default()), None, &Relative::NoData);

        assert_eq!(
            state,
            DisplayState {
                laps: "Laps: 0".to_string(),
                current: "Current: --:--.---".to_string(),
                best: "Best: --:--.---".to_string(),
                last_lap: "Last Lap: --:--.---".to_string(),
                relative: String::new(),
                track_record: "Track Record: None".to_string(),
            }
        );
    }

    #[test]
    fn best_is_the_minimum_of_available_sources() {
        let mut model = DisplayModel::new(Duration::from_secs(2));
        let car = CarSample {
            current_lap_ms: 12_345,
            best_lap_ms: 95_000,
            last_lap_ms: 97_000,
            ..Default::default()
        };

        let state = model.render(&focused(car.clone()), Some(time(97_000)), &Relative::InLead);
        assert_eq!(state.best, "Best: 1:35.000");
        assert_eq!(state.current, "Current: 0:12.345");
        assert_eq!(state.last_lap, "Last Lap: 1:37.000");
        assert_eq!(state.relative, "In Lead");

        model.refresh_records(None, Some(time(94_000)), Instant::now());
        let state = model.render(&focused(car), None, &Relative::InLead);
        assert_eq!(state.best, "Best: 1:34.000");

        let first_lap = CarSample { last_lap_ms: 90_000, ..Default::default() };
        let state = model.render(&focused(first_lap), None, &Relative::NoData);
        assert_eq!(state.best, "Best: 1:30.000");
    }

    #[test]
    fn records_refresh_on_interval_or_immediately_on_new_record() {
        let start = Instant::now();
        let mut model = DisplayModel::new(Duration::from_secs(2));
        assert!(model.needs_refresh(start));

        model.refresh_records(None, None, start);
        assert!(!model.needs_refresh(start + Duration::from_millis(1999)));
        assert!(model.needs_refresh(start + Duration::from_secs(2)));

        model.set_track_record(TrackBest { time: time(89_000), car: CarIdentity::new("B") });
        let state = model.render(&focused(CarSample::default()), None, &Relative::NoData);
        assert_eq!(state.track_record, "Track Record: 1:29.000 by B");
    }

    #[test]
    fn lap_counter_only_moves_forward() {
        let mut model = DisplayModel::new(Duration::from_secs(2));
        assert_eq!(model.observe_lap_count(0), None);
        assert_eq!(model.observe_lap_count(1), Some(1));
        assert_eq!(model.observe_lap_count(1), None);
        assert_eq!(model.observe_lap_count(3), Some(3));

        model.reset();
        assert_eq!(model.lap_count(), 0);
        assert!(model.track_record().is_none());
    }
}
