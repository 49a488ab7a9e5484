//! Per-tick orchestration
//!
//! [`Engine`] owns every piece of session state. The host calls
//! [`tick`](Engine::tick) once per frame with a fresh snapshot; the engine
//! detects lap and finish events, runs them through the record service, and
//! renders the display labels. Nothing in a tick returns an error: storage
//! problems are logged and degrade.

use std::time::Instant;
use tracing::{debug, info, trace};

use crate::config::EngineConfig;
use crate::detector::{LapEvent, LapEventDetector};
use crate::display::{DisplayModel, DisplayState};
use crate::notification::{Notification, NotificationSink};
use crate::relative::{Relative, RelativeGapCalculator};
use crate::service::{RecordOutcome, RecordService};
use crate::store::{RecordStore, TrackBest};
use crate::types::{CarSample, TelemetrySnapshot, TrackKey};

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Session state was cleared before this tick was processed
    pub session_reset: bool,
    pub events: Vec<LapEvent>,
    /// Record outcome of each event that carried a valid lap time
    pub outcomes: Vec<RecordOutcome>,
    pub relative: Relative,
    pub display: DisplayState,
}

impl TickReport {
    /// Whether any lap in this tick set a new track record.
    pub fn has_track_record(&self) -> bool {
        self.outcomes.iter().any(RecordOutcome::is_track_record)
    }
}

/// Lap and record tracking for one simulator process.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    detector: LapEventDetector,
    service: RecordService,
    calculator: RelativeGapCalculator,
    display: DisplayModel,
    session: Option<(u32, TrackKey)>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        info!(
            records_dir = %config.records_dir.display(),
            finish_policy = ?config.finish_policy,
            "Creating engine"
        );
        Self {
            detector: LapEventDetector::new(config.finish_policy),
            service: RecordService::new(RecordStore::from_config(&config)),
            calculator: RelativeGapCalculator::new(config.gap_threshold_ms),
            display: DisplayModel::new(config.display_refresh()),
            session: None,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Record store backing this engine.
    pub fn store(&self) -> &RecordStore {
        self.service.store()
    }

    pub fn store_mut(&mut self) -> &mut RecordStore {
        self.service.store_mut()
    }

    pub fn detector(&self) -> &LapEventDetector {
        &self.detector
    }

    /// Process one snapshot.
    pub fn tick(
        &mut self,
        snapshot: &TelemetrySnapshot,
        sink: &mut impl NotificationSink,
    ) -> TickReport {
        self.tick_at(snapshot, Instant::now(), sink)
    }

    /// Process one snapshot at an explicit instant.
    ///
    /// `now` drives both the display refresh interval and the record cache.
    pub fn tick_at(
        &mut self,
        snapshot: &TelemetrySnapshot,
        now: Instant,
        sink: &mut impl NotificationSink,
    ) -> TickReport {
        let track = snapshot.track_key();
        let session_reset = self.enter_session(snapshot.session, &track);

        let events = self.detector.observe(snapshot);
        let mut outcomes = Vec::new();

        for event in &events {
            if let LapEvent::RaceFinished { car_index, position, .. } = *event {
                if let Some(car) = snapshot.car(car_index) {
                    let finished = Notification::Finished {
                        track: track.clone(),
                        car: car.identity(),
                        driver: car.driver_name.clone(),
                        position,
                        last_lap_ms: car.last_lap_ms,
                    };
                    info!(car_index, "{}", finished);
                    sink.notify(finished);
                }
            }

            let Some(outcome) = self.service.process_event(snapshot, event, now, sink) else {
                continue;
            };
            if outcome.is_track_record() {
                let holder = snapshot.car(event.car_index()).map(CarSample::identity);
                if let (Some(car), Some(time)) = (holder, event.lap_time()) {
                    self.display.set_track_record(TrackBest { time, car });
                }
            }
            outcomes.push(outcome);
        }

        let focused = snapshot.focused();
        if let Some((_, car)) = focused {
            if let Some(laps) = self.display.observe_lap_count(car.lap_count) {
                info!(laps, "Lap completed");
            }
        }

        if self.display.needs_refresh(now) {
            let track_best = self.service.track_best_at(&track, now);
            let car_best = focused
                .and_then(|(_, car)| self.service.car_best_at(&track, &car.identity(), now));
            debug!(?track_best, ?car_best, "Refreshed displayed records");
            self.display.refresh_records(track_best, car_best, now);
        }

        let relative = self.calculator.compute(snapshot);
        let last_lap_seen = focused.and_then(|(index, _)| self.detector.last_lap_seen(index));
        let display = self.display.render(snapshot, last_lap_seen, &relative);

        trace!(events = events.len(), outcomes = outcomes.len(), "Tick processed");
        TickReport { session_reset, events, outcomes, relative, display }
    }

    /// Clear all session-scoped state.
    pub fn reset_session(&mut self) {
        self.detector.reset();
        self.display.reset();
        self.service.store_mut().clear_cache();
    }

    /// Track the active session, resetting state when it changes.
    fn enter_session(&mut self, generation: u32, track: &TrackKey) -> bool {
        match &self.session {
            Some((current, key)) if *current == generation && key == track => false,
            Some((previous, previous_track)) => {
                info!(
                    previous,
                    generation,
                    %previous_track,
                    %track,
                    "Session changed, resetting"
                );
                self.reset_session();
                self.session = Some((generation, track.clone()));
                true
            }
            None => {
                info!(generation, %track, "Session started");
                self.session = Some((generation, track.clone()));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::FinishPolicy;
    use crate::store::LapRecord;
    use crate::types::{CarIdentity, LapTime};
    use std::time::Duration;

    fn engine_in(dir: &std::path::Path) -> Engine {
        Engine::new(EngineConfig {
            finish_policy: FinishPolicy::FlagOnly,
            ..EngineConfig::with_records_dir(dir)
        })
    }

    fn car(name: &str, last_lap_ms: i32) -> CarSample {
        CarSample {
            car_name: name.to_string(),
            driver_name: format!("{name} driver"),
            last_lap_ms,
            leaderboard_position: 0,
            ..Default::default()
        }
    }

    fn snapshot(session: u32, cars: Vec<CarSample>) -> TelemetrySnapshot {
        TelemetrySnapshot {
            session,
            track_name: "nurburgring".to_string(),
            track_length_m: 5148.0,
            cars,
            ..Default::default()
        }
    }

    #[test]
    fn lap_completion_sets_and_displays_track_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        let mut sink = Vec::new();

        engine.tick(&snapshot(1, vec![car("B", 0)]), &mut sink);
        let report = engine.tick(&snapshot(1, vec![car("B", 89_000)]), &mut sink);

        assert!(report.has_track_record());
        assert_eq!(report.display.track_record, "Track Record: 1:29.000 by B");
        assert_eq!(report.display.last_lap, "Last Lap: 1:29.000");
        assert_eq!(sink.len(), 1);

        // Same lap on later ticks is not reprocessed
        let report = engine.tick(&snapshot(1, vec![car("B", 89_000)]), &mut sink);
        assert!(report.events.is_empty());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn finish_produces_one_finish_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        let mut sink = Vec::new();
        let finished = CarSample { race_finished: true, ..car("ks_audi_r8_lms", 107_900) };

        for _ in 0..5 {
            engine.tick(&snapshot(1, vec![finished.clone()]), &mut sink);
        }

        let lines: Vec<String> = sink
            .iter()
            .filter(|n| matches!(n, Notification::Finished { .. }))
            .map(ToString::to_string)
            .collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0],
            "P1 - ks_audi_r8_lms driver in ks_audi_r8_lms finished at nurburgring \
             with time 1:47.900"
        );
        // Lap and finish carry the same time; only the first is a record
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn session_change_resets_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        let mut sink = Vec::new();

        engine.tick(&snapshot(1, vec![car("B", 95_000)]), &mut sink);
        assert_eq!(engine.detector().last_lap_seen(0).map(LapTime::as_millis), Some(95_000));

        let report = engine.tick(&snapshot(2, vec![car("B", 0)]), &mut sink);
        assert!(report.session_reset);
        assert!(engine.detector().last_lap_seen(0).is_none());
        assert_eq!(report.display.last_lap, "Last Lap: --:--.---");
    }

    #[test]
    fn layout_change_resets_state() {
        use crate::test_utils::{self, SnapshotBuilder};

        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        let mut sink = Vec::new();
        let on_layout = |layout: Option<&'static str>| {
            SnapshotBuilder::new()
                .session(3)
                .track("ks_nordschleife", layout)
                .car(test_utils::car("ks_porsche_911_gt3_r", 0, 0))
                .car(test_utils::car("bmw_m3_e30", 1, 410_000))
                .focused(1)
                .build()
        };

        engine.tick(&on_layout(Some("endurance")), &mut sink);
        assert_eq!(engine.detector().last_lap_seen(1).map(LapTime::as_millis), Some(410_000));
        assert!(dir.path().join("ks_nordschleife__endurance.csv").exists());

        let report = engine.tick(&on_layout(None), &mut sink);
        assert!(report.session_reset);
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.display.last_lap, "Last Lap: 6:50.000");
        assert!(dir.path().join("ks_nordschleife.csv").exists());
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn displayed_record_refreshes_from_store_on_interval() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        let mut sink = Vec::new();
        let start = Instant::now();

        engine.tick_at(&snapshot(1, vec![car("B", 0)]), start, &mut sink);

        let track = TrackKey::new("nurburgring", None);
        let record: LapRecord =
            [(CarIdentity::new("A"), LapTime::from_millis(90_000).unwrap())].into_iter().collect();
        engine.store_mut().try_save(&track, &record).unwrap();

        let early = engine.tick_at(
            &snapshot(1, vec![car("B", 0)]),
            start + Duration::from_millis(500),
            &mut sink,
        );
        assert_eq!(early.display.track_record, "Track Record: None");

        let later = engine.tick_at(
            &snapshot(1, vec![car("B", 0)]),
            start + Duration::from_secs(2),
            &mut sink,
        );
        assert_eq!(later.display.track_record, "Track Record: 1:30.000 by A");
    }

    #[test]
    fn record_cache_ages_with_the_tick_instant() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        let mut sink = Vec::new();
        let start = Instant::now();

        engine.tick_at(&snapshot(1, vec![car("B", 0)]), start, &mut sink);
        std::fs::write(dir.path().join("nurburgring.csv"), "Car,Time_ms\nZ,80000\n").unwrap();

        let cached = engine.tick_at(
            &snapshot(1, vec![car("B", 0)]),
            start + Duration::from_secs(3),
            &mut sink,
        );
        assert_eq!(cached.display.track_record, "Track Record: None");

        let expired = engine.tick_at(
            &snapshot(1, vec![car("B", 0)]),
            start + Duration::from_secs(61),
            &mut sink,
        );
        assert_eq!(expired.display.track_record, "Track Record: 1:20.000 by Z");
    }

    #[test]
    fn relative_is_computed_for_the_focused_car() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        let mut sink = Vec::new();

        let report = engine.tick(&snapshot(1, vec![car("B", 0)]), &mut sink);
        assert_eq!(report.relative, Relative::InLead);
        assert_eq!(report.display.relative, "In Lead");
        assert_eq!(report.display.laps, "Laps: 0");
    }
}
