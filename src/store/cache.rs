//! Time-bounded cache of loaded record tables

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::LapRecord;
use crate::types::TrackKey;

/// Record table with the instant it was loaded or written.
#[derive(Debug, Clone)]
pub struct CachedRecordSet {
    /// Cached table
    pub record: LapRecord,
    /// When the table was read from or written to storage
    pub loaded_at: Instant,
}

impl CachedRecordSet {
    /// Create new cache entry
    pub fn new(record: LapRecord, loaded_at: Instant) -> Self {
        Self { record, loaded_at }
    }

    /// Age of the entry at `now`.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.loaded_at)
    }

    /// Check if the entry can still be trusted at `now`
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) < ttl
    }
}

/// Per-track cache of record tables bounded by a time-to-live.
///
/// Expired entries are not evicted eagerly; they are replaced on the next load.
#[derive(Debug, Clone)]
pub struct RecordCache {
    ttl: Duration,
    entries: HashMap<TrackKey, CachedRecordSet>,
}

impl RecordCache {
    /// Empty cache with the given time-to-live.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: HashMap::new() }
    }

    /// Configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Entry for `key`, fresh or not.
    pub fn entry(&self, key: &TrackKey) -> Option<&CachedRecordSet> {
        self.entries.get(key)
    }

    /// Table for `key` if it is younger than the TTL at `now`.
    pub fn get_fresh(&self, key: &TrackKey, now: Instant) -> Option<&LapRecord> {
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| &entry.record)
    }

    /// Store a table stamped with `now`.
    pub fn insert(&mut self, key: TrackKey, record: LapRecord, now: Instant) {
        self.entries.insert(key, CachedRecordSet::new(record, now));
    }

    /// Drop the entry for `key`.
    pub fn invalidate(&mut self, key: &TrackKey) {
        self.entries.remove(key);
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries, fresh or expired.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
