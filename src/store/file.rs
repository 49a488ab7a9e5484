//! CSV layout of record files
//!
//! One file per track configuration, header `Car,Time_ms`, one row per car with
//! the time as a plain integer. Files stay human-editable, so parsing is
//! row-tolerant: a broken row is logged and skipped and the rest of the table
//! still loads.
//!
//! Older versions of the logger wrote a third column with the car's display
//! name. Such rows are accepted as migration input; only the first two columns
//! are read and the next save writes the two-column layout.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::LapRecord;
use crate::types::{CarIdentity, LapTime};
use crate::{RecordError, Result};

/// Column names of the canonical layout.
pub const HEADER: [&str; 2] = ["Car", "Time_ms"];

/// Extension of record files.
pub const EXTENSION: &str = "csv";

/// Outcome of parsing one record file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTable {
    /// Valid entries
    pub record: LapRecord,
    /// Rows that could not be used
    pub skipped: usize,
    /// Rows read from the legacy three-column layout
    pub migrated: usize,
}

/// Read a record file. Returns `Ok(None)` when the file does not exist.
pub fn read_table(path: &Path) -> Result<Option<ParsedTable>> {
    match File::open(path) {
        Ok(file) => Ok(Some(parse_table(file, path))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RecordError::io_error(path, e)),
    }
}

/// Parse record rows from any reader. `origin` is only used for log context.
pub fn parse_table<R: Read>(reader: R, origin: &Path) -> ParsedTable {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut table = ParsedTable::default();
    for (index, row) in csv_reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(
                    file = %origin.display(),
                    row = index + 1,
                    error = %e,
                    "Skipping unreadable row"
                );
                table.skipped += 1;
                continue;
            }
        };

        if index == 0 {
            match header_kind(&row) {
                HeaderKind::Named => continue,
                HeaderKind::Unnamed => {
                    warn!(
                        file = %origin.display(),
                        row = 1,
                        value = row.get(1).unwrap_or_default(),
                        "First row has a non-numeric time, treating it as a header"
                    );
                    table.skipped += 1;
                    continue;
                }
                HeaderKind::None => {}
            }
        }

        let (Some(car), Some(raw_time)) = (row.get(0), row.get(1)) else {
            warn!(file = %origin.display(), row = index + 1, "Skipping row with missing fields");
            table.skipped += 1;
            continue;
        };

        if car.is_empty() {
            warn!(file = %origin.display(), row = index + 1, "Skipping row without car name");
            table.skipped += 1;
            continue;
        }

        let Some(time) = raw_time.parse::<i64>().ok().and_then(LapTime::from_millis) else {
            warn!(
                file = %origin.display(),
                row = index + 1,
                value = raw_time,
                "Skipping row with invalid time"
            );
            table.skipped += 1;
            continue;
        };

        if row.len() >= 3 {
            table.migrated += 1;
        }

        // Duplicate rows from hand edits keep the faster time.
        table.record.improve(CarIdentity::new(car), time);
    }

    if table.migrated > 0 {
        debug!(file = %origin.display(), rows = table.migrated, "Read legacy three-column rows");
    }

    table
}

enum HeaderKind {
    /// `Car,Time_ms` in any case
    Named,
    /// Anything else with a non-numeric second column
    Unnamed,
    None,
}

fn header_kind(row: &csv::StringRecord) -> HeaderKind {
    let matches_names = row.len() >= HEADER.len()
        && row.iter().zip(HEADER).all(|(field, name)| field.eq_ignore_ascii_case(name));
    if matches_names {
        HeaderKind::Named
    } else if row.get(1).is_some_and(|time| time.parse::<i64>().is_err()) {
        HeaderKind::Unnamed
    } else {
        HeaderKind::None
    }
}

/// Create a record file holding only the header.
pub fn write_header(path: &Path) -> Result<()> {
    write_atomic(path, &LapRecord::new())
}

/// Write the whole table, fastest first, replacing the file in one rename.
///
/// The table is written to a sibling temporary file which is then renamed over
/// the target, so readers see either the old or the new table.
pub fn write_atomic(path: &Path, record: &LapRecord) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| RecordError::io_error(parent, e))?;
    }

    let temp_path = temp_path_for(path);
    if let Err(e) = write_rows(&temp_path, record) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        RecordError::io_error(path, e)
    })
}

fn write_rows(temp_path: &Path, record: &LapRecord) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(temp_path).map_err(|e| RecordError::csv_error(temp_path, e))?;

    writer.write_record(HEADER).map_err(|e| RecordError::csv_error(temp_path, e))?;
    for (car, time) in record.sorted_by_time() {
        let millis = time.as_millis().to_string();
        writer
            .write_record([car.as_str(), millis.as_str()])
            .map_err(|e| RecordError::csv_error(temp_path, e))?;
    }

    let file = writer.into_inner().map_err(|e| {
        RecordError::io_error(temp_path, io::Error::new(e.error().kind(), e.error().to_string()))
    })?;
    file.sync_all().map_err(|e| RecordError::io_error(temp_path, e))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
