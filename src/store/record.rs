//! Best-lap table for a single track configuration

use std::collections::BTreeMap;

use crate::types::{CarIdentity, LapTime};

/// Fastest lap on a track across all cars. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackBest {
    /// Lap time of the record
    pub time: LapTime,
    /// Car holding the record
    pub car: CarIdentity,
}

/// Mapping from car to its best lap on one track configuration.
///
/// Times only ever improve through [`LapRecord::improve`]; [`LapRecord::insert`]
/// overwrites unconditionally and is meant for building tables from storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LapRecord {
    times: BTreeMap<CarIdentity, LapTime>,
}

impl LapRecord {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Best time for a car.
    pub fn get(&self, car: &CarIdentity) -> Option<LapTime> {
        self.times.get(car).copied()
    }

    /// Set a car's time, returning the previous one.
    pub fn insert(&mut self, car: CarIdentity, time: LapTime) -> Option<LapTime> {
        self.times.insert(car, time)
    }

    /// Store `time` only if it is strictly faster than the car's current best.
    pub fn improve(&mut self, car: CarIdentity, time: LapTime) -> bool {
        match self.times.get(&car) {
            Some(&existing) if time >= existing => false,
            _ => {
                self.times.insert(car, time);
                true
            }
        }
    }

    /// Number of cars with a time.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Entries in car order.
    pub fn iter(&self) -> impl Iterator<Item = (&CarIdentity, LapTime)> {
        self.times.iter().map(|(car, &time)| (car, time))
    }

    /// Entries fastest first; equal times fall back to car order.
    pub fn sorted_by_time(&self) -> Vec<(&CarIdentity, LapTime)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// Fastest entry, `None` when the table is empty.
    pub fn best(&self) -> Option<TrackBest> {
        self.iter()
            .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
            .map(|(car, time)| TrackBest { time, car: car.clone() })
    }
}

impl FromIterator<(CarIdentity, LapTime)> for LapRecord {
    fn from_iter<I: IntoIterator<Item = (CarIdentity, LapTime)>>(iter: I) -> Self {
        Self { times: iter.into_iter().collect() }
    }
}
