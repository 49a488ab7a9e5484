//! Edge detection of lap completions and race finishes
//!
//! The simulator only exposes polled state: a "last lap" value and a finished
//! flag that stay set for many ticks. [`LapEventDetector`] compares each
//! snapshot with what it has already seen and turns those levels into
//! one-shot [`LapEvent`]s.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

use crate::types::{CarSample, LapTime, TelemetrySnapshot};

/// Raw leaderboard value the leader heuristic compares against.
///
/// Compared with the simulator's raw (zero-based) value, not the displayed place.
pub const LEADER_HEURISTIC_POSITION: i32 = 1;

/// How a car is judged to have finished the race.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishPolicy {
    /// Finished flag, or at least one lap done while holding the leader position.
    ///
    /// The leader half can fire for a car that is merely leading a race still
    /// in progress.
    #[default]
    FlagOrLeader,
    /// Only the simulator's finished flag counts.
    FlagOnly,
}

impl FinishPolicy {
    /// Whether `car` counts as finished under this policy.
    pub fn is_finished(self, car: &CarSample) -> bool {
        match self {
            FinishPolicy::FlagOnly => car.race_finished,
            FinishPolicy::FlagOrLeader => {
                car.race_finished
                    || (car.lap_count > 0 && car.leaderboard_position == LEADER_HEURISTIC_POSITION)
            }
        }
    }
}

/// Discrete event derived from successive snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LapEvent {
    /// A new last-lap value appeared for a car.
    LapCompleted { car_index: usize, lap_time: LapTime },
    /// A car met the finish predicate for the first time this session.
    RaceFinished {
        car_index: usize,
        /// Last lap at the moment of finishing, `None` when the simulator had no valid time
        lap_time: Option<LapTime>,
        /// One-based finishing place, `None` when the leaderboard position was invalid
        position: Option<usize>,
    },
}

impl LapEvent {
    /// Car the event refers to.
    pub fn car_index(&self) -> usize {
        match self {
            LapEvent::LapCompleted { car_index, .. } | LapEvent::RaceFinished { car_index, .. } => {
                *car_index
            }
        }
    }

    /// Lap time eligible for record processing.
    pub fn lap_time(&self) -> Option<LapTime> {
        match self {
            LapEvent::LapCompleted { lap_time, .. } => Some(*lap_time),
            LapEvent::RaceFinished { lap_time, .. } => *lap_time,
        }
    }
}

/// Turns polled telemetry into lap and finish events, each emitted once.
///
/// State is scoped to one session; call [`reset`](Self::reset) when the session
/// or track changes.
#[derive(Debug, Clone, Default)]
pub struct LapEventDetector {
    policy: FinishPolicy,
    last_lap_seen: HashMap<usize, LapTime>,
    finished: HashSet<usize>,
}

impl LapEventDetector {
    /// Detector using the given finish policy.
    pub fn new(policy: FinishPolicy) -> Self {
        Self { policy, ..Default::default() }
    }

    /// Active finish policy.
    pub fn policy(&self) -> FinishPolicy {
        self.policy
    }

    /// Compare `snapshot` against previous ticks and return the new events.
    ///
    /// For each car a lap event precedes its finish event.
    pub fn observe(&mut self, snapshot: &TelemetrySnapshot) -> Vec<LapEvent> {
        let mut events = Vec::new();

        for (car_index, car) in snapshot.cars.iter().enumerate() {
            if let Some(lap_time) = car.last_lap() {
                if self.last_lap_seen.insert(car_index, lap_time) != Some(lap_time) {
                    debug!(car_index, lap_ms = lap_time.as_millis(), "Lap completed");
                    events.push(LapEvent::LapCompleted { car_index, lap_time });
                }
            }

            if self.finished.contains(&car_index) || !self.policy.is_finished(car) {
                continue;
            }

            self.finished.insert(car_index);
            let lap_time = car.last_lap();
            let position = car.position().map(|p| p + 1);
            debug!(car_index, ?position, flag = car.race_finished, "Race finished");
            events.push(LapEvent::RaceFinished { car_index, lap_time, position });
        }

        trace!(cars = snapshot.cars.len(), events = events.len(), "Observed snapshot");
        events
    }

    /// Last lap already reported for a car.
    pub fn last_lap_seen(&self, car_index: usize) -> Option<LapTime> {
        self.last_lap_seen.get(&car_index).copied()
    }

    /// Whether a finish was already reported for a car.
    pub fn has_finished(&self, car_index: usize) -> bool {
        self.finished.contains(&car_index)
    }

    /// Number of cars reported finished.
    pub fn finished_count(&self) -> usize {
        self.finished.len()
    }

    /// Forget all session state.
    pub fn reset(&mut self) {
        self.last_lap_seen.clear();
        self.finished.clear();
    }
}
