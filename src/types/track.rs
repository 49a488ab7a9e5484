//! Track and car identities used as record keys

use serde::{Deserialize, Serialize};
use std::fmt;

/// Layout name used when the simulator reports none.
pub const DEFAULT_LAYOUT: &str = "default";

/// Separator between track and layout in record file names.
const LAYOUT_SEPARATOR: &str = "__";

/// Identifies a racing configuration: technical track name plus layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackKey {
    track: String,
    layout: String,
}

impl TrackKey {
    /// Build a key, substituting [`DEFAULT_LAYOUT`] for a missing or blank layout.
    pub fn new(track: impl Into<String>, layout: Option<&str>) -> Self {
        let layout = match layout.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => DEFAULT_LAYOUT.to_string(),
        };
        Self { track: track.into().trim().to_string(), layout }
    }

    /// Technical track name.
    pub fn track(&self) -> &str {
        &self.track
    }

    /// Layout name, [`DEFAULT_LAYOUT`] when the track has a single configuration.
    pub fn layout(&self) -> &str {
        &self.layout
    }

    /// Whether this key uses the default layout.
    pub fn is_default_layout(&self) -> bool {
        self.layout == DEFAULT_LAYOUT
    }

    /// File stem of the record file for this key.
    ///
    /// Default layouts keep the bare track name so tables written before layouts
    /// were tracked are picked up unchanged.
    pub fn file_stem(&self) -> String {
        let track = sanitize(&self.track);
        if self.is_default_layout() {
            track
        } else {
            format!("{track}{LAYOUT_SEPARATOR}{}", sanitize(&self.layout))
        }
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default_layout() {
            f.write_str(&self.track)
        } else {
            write!(f, "{} ({})", self.track, self.layout)
        }
    }
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') { "_".to_string() } else { cleaned }
}

/// Technical (non-localized) car name used as the record key.
///
/// Surrounding whitespace is stripped on construction, matching how record
/// files are read back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CarIdentity(String);

impl CarIdentity {
    /// Wrap a technical car name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    /// The technical name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the simulator reported no name. Blank identities cannot be
    /// stored as records.
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }

    /// Compact label for tight displays: last `_` segment, at most 8 characters.
    pub fn short_label(&self) -> String {
        let tail = self.0.rsplit('_').next().unwrap_or(&self.0);
        tail.chars().take(8).collect()
    }
}

impl fmt::Display for CarIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CarIdentity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for CarIdentity {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<CarIdentity> for String {
    fn from(car: CarIdentity) -> Self {
        car.0
    }
}
