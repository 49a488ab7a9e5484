//! Personal-best and track-record classification
//!
//! [`RecordService`] is the only writer of the [`RecordStore`]. For every lap
//! it decides between three outcomes, using strict comparisons so an equal
//! time is never announced twice:
//!
//! | lap vs car best | lap vs track best | outcome         |
//! |-----------------|-------------------|-----------------|
//! | `>=`            | any               | not improved    |
//! | `<` or none     | `<` or none       | track record    |
//! | `<` or none     | `>=`              | personal best   |

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::detector::LapEvent;
use crate::notification::{Notification, NotificationSink};
use crate::store::{RecordStore, TrackBest};
use crate::types::{CarIdentity, LapTime, TelemetrySnapshot, TrackKey};

/// What a submitted lap did to the stored records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Not faster than the car's stored best.
    NotImproved { best: LapTime },
    /// New best for the car, not for the track.
    PersonalBest { previous: Option<LapTime> },
    /// New fastest lap on the track.
    TrackRecord { previous: Option<TrackBest> },
    /// The stored table could not be read; the lap was not evaluated.
    Unavailable,
    /// The car has no name to file the lap under; the lap was not evaluated.
    Rejected,
}

impl RecordOutcome {
    /// Whether the store was updated.
    pub fn is_improvement(&self) -> bool {
        matches!(self, RecordOutcome::PersonalBest { .. } | RecordOutcome::TrackRecord { .. })
    }

    /// Whether the lap set a new track record.
    pub fn is_track_record(&self) -> bool {
        matches!(self, RecordOutcome::TrackRecord { .. })
    }
}

/// Classifies laps against stored records and keeps the store up to date.
#[derive(Debug)]
pub struct RecordService {
    store: RecordStore,
}

impl RecordService {
    /// Service writing to `store`.
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Underlying store.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Underlying store, mutably.
    pub fn store_mut(&mut self) -> &mut RecordStore {
        &mut self.store
    }

    /// Evaluate a detector event against the records of the snapshot's track.
    ///
    /// `now` ages the store's cache. Returns `None` when the event carries no
    /// valid lap time or refers to a car that is missing from the snapshot or
    /// has no name.
    pub fn process_event(
        &mut self,
        snapshot: &TelemetrySnapshot,
        event: &LapEvent,
        now: Instant,
        sink: &mut impl NotificationSink,
    ) -> Option<RecordOutcome> {
        let car_index = event.car_index();
        let Some(car) = snapshot.car(car_index) else {
            warn!(car_index, "Lap event for unknown car");
            return None;
        };

        let Some(time) = event.lap_time() else {
            warn!(car_index, raw_ms = car.last_lap_ms, "Ignoring invalid lap time");
            return None;
        };

        let identity = car.identity();
        if identity.is_blank() {
            warn!(car_index, %time, "Ignoring lap of car without name");
            return None;
        }

        Some(self.submit_at(&snapshot.track_key(), &identity, time, now, sink))
    }

    /// Evaluate one lap, update the store and announce an improvement.
    ///
    /// A blank car is [`RecordOutcome::Rejected`]: its row could never be read
    /// back, so storing it would forget the best and re-announce it later.
    pub fn submit(
        &mut self,
        track: &TrackKey,
        car: &CarIdentity,
        time: LapTime,
        sink: &mut impl NotificationSink,
    ) -> RecordOutcome {
        self.submit_at(track, car, time, Instant::now(), sink)
    }

    /// [`submit`](Self::submit) with the store's cache aged to `now`.
    pub fn submit_at(
        &mut self,
        track: &TrackKey,
        car: &CarIdentity,
        time: LapTime,
        now: Instant,
        sink: &mut impl NotificationSink,
    ) -> RecordOutcome {
        if car.is_blank() {
            warn!(%track, %time, "Refusing to record lap of car without name");
            return RecordOutcome::Rejected;
        }

        debug!(%track, %car, %time, "Checking record");

        let mut record = match self.store.try_load_at(track, now) {
            Ok(record) => record,
            Err(e) => {
                warn!(%track, %car, error = %e, "Records unavailable, skipping lap");
                return RecordOutcome::Unavailable;
            }
        };

        let previous_car_best = record.get(car);
        let previous_track_best = RecordStore::best_of(&record);

        if let Some(best) = previous_car_best.filter(|&best| time >= best) {
            debug!(%track, %car, %time, %best, "Not an improvement");
            return RecordOutcome::NotImproved { best };
        }

        let is_track_record = previous_track_best.as_ref().is_none_or(|best| time < best.time);

        record.insert(car.clone(), time);
        self.store.save_at(track, &record, now);

        let (outcome, notification) = if is_track_record {
            (
                RecordOutcome::TrackRecord { previous: previous_track_best.clone() },
                Notification::TrackRecord {
                    track: track.clone(),
                    car: car.clone(),
                    time,
                    previous: previous_track_best,
                },
            )
        } else {
            (
                RecordOutcome::PersonalBest { previous: previous_car_best },
                Notification::PersonalBest {
                    track: track.clone(),
                    car: car.clone(),
                    time,
                    previous: previous_car_best,
                },
            )
        };

        info!(%track, %car, %time, track_record = is_track_record, "New best lap");
        sink.notify(notification);
        outcome
    }

    /// Current track record, reading through the cache.
    pub fn track_best(&mut self, track: &TrackKey) -> Option<TrackBest> {
        self.track_best_at(track, Instant::now())
    }

    pub fn track_best_at(&mut self, track: &TrackKey, now: Instant) -> Option<TrackBest> {
        RecordStore::best_of(&self.store.load_at(track, now))
    }

    /// Stored best of one car, reading through the cache.
    pub fn car_best(&mut self, track: &TrackKey, car: &CarIdentity) -> Option<LapTime> {
        self.car_best_at(track, car, Instant::now())
    }

    pub fn car_best_at(
        &mut self,
        track: &TrackKey,
        car: &CarIdentity,
        now: Instant,
    ) -> Option<LapTime> {
        self.store.load_at(track, now).get(car)
    }
}
