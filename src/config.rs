//! Engine configuration
//!
//! Configuration is a small YAML document. Every key is optional; missing keys
//! take the defaults below, and a missing file is the same as an empty one.
//!
//! ```yaml
//! records_dir: records
//! cache_ttl_secs: 60
//! display_refresh_ms: 2000
//! gap_threshold_ms: 30000
//! finish_policy: flag_or_leader
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::detector::FinishPolicy;
use crate::{RecordError, Result};

/// Gaps above this many milliseconds are treated as implausible.
pub const DEFAULT_GAP_THRESHOLD_MS: f64 = 30_000.0;

/// Tunables for a tracking [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding one record file per track configuration
    pub records_dir: PathBuf,
    /// Seconds a loaded record table is trusted before rereading the file
    pub cache_ttl_secs: u64,
    /// Milliseconds between refreshes of the displayed track record
    pub display_refresh_ms: u64,
    /// Relative gaps above this magnitude are dropped
    pub gap_threshold_ms: f64,
    /// How race finishes are detected
    pub finish_policy: FinishPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            records_dir: PathBuf::from("records"),
            cache_ttl_secs: 60,
            display_refresh_ms: 2_000,
            gap_threshold_ms: DEFAULT_GAP_THRESHOLD_MS,
            finish_policy: FinishPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults with a specific records directory.
    pub fn with_records_dir(records_dir: impl Into<PathBuf>) -> Self {
        Self { records_dir: records_dir.into(), ..Default::default() }
    }

    /// Load configuration from a YAML file, falling back to defaults if it is absent.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration: {}", path.display()))?;
        let config: Self = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
        config.validate(path)?;

        debug!(?config, "Loaded configuration");
        Ok(config)
    }

    /// Write configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let content = serde_yaml_ng::to_string(self).context("Failed to serialize configuration")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write configuration: {}", path.display()))?;
        Ok(())
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self, origin: &Path) -> Result<()> {
        if self.records_dir.as_os_str().is_empty() {
            return Err(RecordError::config_error(origin, "records_dir must not be empty"));
        }
        if !self.gap_threshold_ms.is_finite() || self.gap_threshold_ms <= 0.0 {
            return Err(RecordError::config_error(
                origin,
                format!("gap_threshold_ms must be positive, got {}", self.gap_threshold_ms),
            ));
        }
        Ok(())
    }

    /// Record cache time-to-live.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Track-record display refresh interval.
    pub fn display_refresh(&self) -> Duration {
        Duration::from_millis(self.display_refresh_ms)
    }
}
