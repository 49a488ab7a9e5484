//! Persistent best-lap storage
//!
//! [`RecordStore`] keeps one CSV file per track configuration under a records
//! directory and fronts it with a [`RecordCache`]. Reads inside the TTL window
//! never touch the disk; writes always go straight to disk and refresh the
//! cache, so a load right after a save sees what was saved.
//!
//! Two flavours of each operation exist:
//! - `try_load` / `try_save` return a [`Result`] for callers that need to
//!   decide whether to proceed (the record service skips a lap rather than
//!   overwrite a table it could not read);
//! - `load` / `save` log failures and degrade to an empty table or a no-op,
//!   for callers on the display path.
//!
//! ```rust
//! use trackstats::store::RecordStore;
//! use trackstats::types::{CarIdentity, LapTime, TrackKey};
//! use std::time::Duration;
//!
//! # let dir = std::env::temp_dir().join("trackstats-doc-store");
//! let mut store = RecordStore::new(&dir, Duration::from_secs(60));
//! let key = TrackKey::new("magione", None);
//!
//! let mut record = store.load(&key);
//! record.improve(CarIdentity::new("ktm_xbow_r"), LapTime::from_millis(78_800).unwrap());
//! store.save(&key, &record);
//!
//! let best = RecordStore::best_of(&store.load(&key)).unwrap();
//! assert_eq!(best.time.to_string(), "1:18.800");
//! ```

mod cache;
pub mod file;
mod record;

pub use cache::{CachedRecordSet, RecordCache};
pub use record::{LapRecord, TrackBest};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::types::{CarIdentity, LapTime, TrackKey};
use crate::{RecordError, Result};

/// One row of the record catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Record file stem (track, plus `__layout` for non-default layouts)
    pub track: String,
    /// Car holding the time
    pub car: CarIdentity,
    /// Best lap of the car on that track
    pub time: LapTime,
}

/// Best-lap tables persisted per track with a read cache.
#[derive(Debug)]
pub struct RecordStore {
    records_dir: PathBuf,
    cache: RecordCache,
}

impl RecordStore {
    /// Store rooted at `records_dir` whose cached tables live for `ttl`.
    pub fn new(records_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self { records_dir: records_dir.into(), cache: RecordCache::new(ttl) }
    }

    /// Store configured from engine settings.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.records_dir.clone(), config.cache_ttl())
    }

    /// Directory holding the record files.
    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    /// Record file for a track configuration.
    pub fn path_for(&self, key: &TrackKey) -> PathBuf {
        self.records_dir.join(format!("{}.{}", key.file_stem(), file::EXTENSION))
    }

    /// Cache backing this store.
    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    /// Load a table, logging failures and returning an empty table instead.
    pub fn load(&mut self, key: &TrackKey) -> LapRecord {
        self.load_at(key, Instant::now())
    }

    /// [`load`](Self::load) evaluated at an explicit instant.
    pub fn load_at(&mut self, key: &TrackKey, now: Instant) -> LapRecord {
        self.try_load_at(key, now).unwrap_or_else(|e| {
            warn!(track = %key, error = %e, "Failed to load records, using empty table");
            LapRecord::new()
        })
    }

    /// Load a table, serving from cache while it is fresh.
    pub fn try_load(&mut self, key: &TrackKey) -> Result<LapRecord> {
        self.try_load_at(key, Instant::now())
    }

    /// [`try_load`](Self::try_load) evaluated at an explicit instant.
    ///
    /// A missing file is an empty table; the file is created with its header
    /// as a side effect. Failed reads leave the cache untouched.
    pub fn try_load_at(&mut self, key: &TrackKey, now: Instant) -> Result<LapRecord> {
        if let Some(record) = self.cache.get_fresh(key, now) {
            debug!(track = %key, entries = record.len(), "Using cached records");
            return Ok(record.clone());
        }

        if let Some(entry) = self.cache.entry(key) {
            let age_secs = entry.age(now).as_secs_f64();
            debug!(track = %key, age_secs, "Record cache expired");
        }

        let path = self.path_for(key);
        let record = match file::read_table(&path)? {
            Some(table) => {
                info!(
                    track = %key,
                    entries = table.record.len(),
                    skipped = table.skipped,
                    "Loaded records"
                );
                table.record
            }
            None => {
                info!(track = %key, path = %path.display(), "No record file, creating one");
                file::write_header(&path)?;
                LapRecord::new()
            }
        };

        self.cache.insert(key.clone(), record.clone(), now);
        Ok(record)
    }

    /// Persist a table, logging failures.
    pub fn save(&mut self, key: &TrackKey, record: &LapRecord) {
        self.save_at(key, record, Instant::now());
    }

    /// [`save`](Self::save) with the cache entry stamped at `now`.
    pub fn save_at(&mut self, key: &TrackKey, record: &LapRecord, now: Instant) {
        if let Err(e) = self.try_save_at(key, record, now) {
            warn!(track = %key, error = %e, "Failed to save records");
        }
    }

    /// Persist a table atomically and refresh the cache.
    ///
    /// On failure the cache entry is dropped so the next load rereads the disk.
    pub fn try_save(&mut self, key: &TrackKey, record: &LapRecord) -> Result<()> {
        self.try_save_at(key, record, Instant::now())
    }

    /// [`try_save`](Self::try_save) with the cache entry stamped at `now`.
    pub fn try_save_at(&mut self, key: &TrackKey, record: &LapRecord, now: Instant) -> Result<()> {
        let path = self.path_for(key);
        match file::write_atomic(&path, record) {
            Ok(()) => {
                self.cache.insert(key.clone(), record.clone(), now);
                info!(track = %key, entries = record.len(), "Saved records");
                Ok(())
            }
            Err(e) => {
                self.cache.invalidate(key);
                Err(e)
            }
        }
    }

    /// Fastest entry of a table.
    pub fn best_of(record: &LapRecord) -> Option<TrackBest> {
        record.best()
    }

    /// Forget the cached table for one track.
    pub fn invalidate(&mut self, key: &TrackKey) {
        self.cache.invalidate(key);
    }

    /// Forget every cached table.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Every record in the records directory, logging failures.
    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.try_catalog().unwrap_or_else(|e| {
            warn!(dir = %self.records_dir.display(), error = %e, "Failed to list records");
            Vec::new()
        })
    }

    /// Every record in the records directory, sorted by track then time.
    ///
    /// Bypasses the cache. Files that cannot be read are logged and skipped.
    pub fn try_catalog(&self) -> Result<Vec<CatalogEntry>> {
        let entries = match fs::read_dir(&self.records_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RecordError::io_error(&self.records_dir, e)),
        };

        let mut catalog = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some(file::EXTENSION) {
                continue;
            }
            let Some(track) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };

            match file::read_table(&path) {
                Ok(Some(table)) => catalog.extend(table.record.iter().map(|(car, time)| {
                    CatalogEntry { track: track.clone(), car: car.clone(), time }
                })),
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable record file")
                }
            }
        }

        catalog.sort_by(|a, b| {
            a.track.cmp(&b.track).then(a.time.cmp(&b.time)).then_with(|| a.car.cmp(&b.car))
        });
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn time(ms: i64) -> LapTime {
        LapTime::from_millis(ms).unwrap()
    }

    fn store_in(dir: &Path) -> RecordStore {
        RecordStore::new(dir, Duration::from_secs(60))
    }

    #[test]
    fn missing_file_is_created_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir.path().join("records"));
        let key = TrackKey::new("imola", None);

        let record = store.try_load(&key).unwrap();

        assert!(record.is_empty());
        assert_eq!(fs::read_to_string(store.path_for(&key)).unwrap(), "Car,Time_ms\n");
    }

    #[test]
    fn loads_within_ttl_ignore_file_changes_until_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path());
        let key = TrackKey::new("monza", None);
        let path = store.path_for(&key);
        fs::write(&path, "Car,Time_ms\nbmw_z4_gt3,108100\n").unwrap();

        let start = Instant::now();
        let first = store.load_at(&key, start);

        fs::write(&path, "Car,Time_ms\nbmw_z4_gt3,107000\n").unwrap();
        let second = store.load_at(&key, start + Duration::from_secs(30));
        assert_eq!(first, second);

        let third = store.load_at(&key, start + Duration::from_secs(61));
        assert_eq!(third.get(&CarIdentity::new("bmw_z4_gt3")), Some(time(107_000)));
    }

    #[test]
    fn save_refreshes_cache_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path());
        let key = TrackKey::new("spa", Some("gp"));

        let mut record = store.load(&key);
        record.improve(CarIdentity::new("ferrari_488_gt3"), time(136_500));
        store.save(&key, &record);

        assert_eq!(store.load(&key), record);
        assert!(store.path_for(&key).ends_with("spa__gp.csv"));
    }

    #[test]
    fn storage_failures_degrade_to_empty_and_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "occupied").unwrap();
        let mut store = store_in(&blocker);
        let key = TrackKey::new("mugello", None);

        assert!(store.try_load(&key).is_err());
        assert!(store.load(&key).is_empty());

        let record: LapRecord = [(CarIdentity::new("a"), time(83_000))].into_iter().collect();
        assert!(store.try_save(&key, &record).is_err());
        store.save(&key, &record);
        assert!(store.cache().is_empty());
    }

    #[test]
    fn best_of_empty_record_is_none() {
        assert!(RecordStore::best_of(&LapRecord::new()).is_none());
    }

    #[test]
    fn catalog_lists_every_track_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("spa.csv"), "Car,Time_ms\nb,137000\na,136000\n").unwrap();
        fs::write(dir.path().join("imola.csv"), "Car,Time_ms\nc,102100\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join("monza.csv.tmp"), "Car,Time_ms\nd,1\n").unwrap();

        let catalog = store_in(dir.path()).catalog();
        let rows: Vec<_> = catalog
            .iter()
            .map(|e| (e.track.as_str(), e.car.as_str(), e.time.as_millis()))
            .collect();
        assert_eq!(rows, [("imola", "c", 102_100), ("spa", "a", 136_000), ("spa", "b", 137_000)]);
    }

    #[test]
    fn catalog_of_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(&dir.path().join("absent")).catalog().is_empty());
    }

    proptest! {
        #[test]
        fn save_then_uncached_load_round_trips(
            entries in prop::collection::btree_map(
                " {0,2}[a-z][a-z0-9_ ]{0,20}",
                1u32..10_000_000,
                0..20,
            )
        ) {
            let dir = tempfile::tempdir().unwrap();
            let mut store = store_in(dir.path());
            let key = TrackKey::new("round_trip", Some("layout"));
            let record: LapRecord = entries
                .into_iter()
                .map(|(car, ms)| (CarIdentity::new(car), time(i64::from(ms))))
                .collect();

            store.try_save(&key, &record).unwrap();
            store.clear_cache();

            prop_assert_eq!(store.try_load(&key).unwrap(), record);
        }
    }
}
