//! Error types for record tracking.
//!
//! Every fallible operation in the crate reports a [`RecordError`]. The engine
//! never lets one escape into the tick loop: callers of the degrading APIs
//! (`RecordStore::load`, `RecordStore::save`) get a logged warning and an
//! empty or unchanged record instead.
//!
//! ## Error Categories
//!
//! - **I/O Errors**: Record files or directories that cannot be read or written
//! - **CSV Errors**: Record files whose structure the CSV reader rejects
//! - **Parse Errors**: Replay fixtures or values that fail to decode
//! - **Config Errors**: Invalid or unreadable engine configuration
//! - **Source Errors**: Telemetry sources that fail to produce snapshots
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use trackstats::RecordError;
//!
//! let error = RecordError::source_failed("replay file truncated");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for record operations.
pub type Result<T, E = RecordError> = std::result::Result<T, E>;

/// Main error type for record tracking operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RecordError {
    #[error("Record file error: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record file: {path}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Invalid configuration in {path}: {details}")]
    Config { path: PathBuf, details: String },

    #[error("Telemetry source failed: {reason}")]
    Source {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl RecordError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            RecordError::Io { .. } => true,
            RecordError::Source { .. } => true,
            RecordError::Timeout { .. } => true,
            RecordError::Csv { .. } => false,
            RecordError::Parse { .. } => false,
            RecordError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            RecordError::Io { .. } => vec![
                "Check the records directory exists and is writable",
                "Ensure sufficient disk space",
                "Close other programs holding the record file open",
            ],
            RecordError::Csv { .. } => vec![
                "Open the record file and fix or remove the broken rows",
                "Delete the record file to start a fresh table",
            ],
            RecordError::Parse { .. } => vec![
                "Check data format compatibility",
                "Verify source data integrity",
            ],
            RecordError::Config { .. } => vec![
                "Check the configuration file against the documented keys",
                "Remove the configuration file to fall back to defaults",
            ],
            RecordError::Source { .. } => vec![
                "Ensure the simulator session is running",
                "Verify the replay file is complete",
            ],
            RecordError::Timeout { .. } => vec![
                "Increase timeout duration",
                "Check system performance",
            ],
        }
    }

    /// Helper constructor for I/O errors with path context.
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RecordError::Io { path: path.into(), source }
    }

    /// Helper constructor for CSV errors with path context.
    pub fn csv_error(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        RecordError::Csv { path: path.into(), source }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        RecordError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        RecordError::Config { path: path.into(), details: details.into() }
    }

    /// Helper constructor for telemetry source failures.
    pub fn source_failed(reason: impl Into<String>) -> Self {
        RecordError::Source { reason: reason.into(), source: None }
    }

    /// Helper constructor for telemetry source failures with an underlying cause.
    pub fn source_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        RecordError::Source { reason: reason.into(), source: Some(source) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn error_messages_carry_their_context(
            reason in ".*",
            details in ".*",
            track in "[a-z_]{1,16}",
        ) {
            let source = RecordError::source_failed(reason.clone());
            prop_assert!(source.to_string().contains(&reason));

            let parse = RecordError::parse_error("replay frame", details.clone());
            prop_assert!(parse.to_string().contains(&details));

            let path = PathBuf::from(format!("records/{track}.csv"));
            let io = RecordError::io_error(
                path.clone(),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            );
            prop_assert!(io.to_string().contains(&track));
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<RecordError>();

        let error = RecordError::source_failed("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn recovery_methods_work() {
        let io = RecordError::io_error(
            "records/monza.csv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let config = RecordError::config_error("trackstats.yaml", "cache_ttl must be positive");

        assert!(io.is_retryable());
        assert!(!config.is_retryable());
        assert!(RecordError::Timeout { duration: Duration::from_secs(1) }.is_retryable());

        for suggestion in io.recovery_suggestions().iter().chain(&config.recovery_suggestions()) {
            assert!(suggestion.len() > 5);
        }
    }

    #[test]
    fn source_chain_is_preserved() {
        let inner = std::io::Error::other("pipe closed");
        let error = RecordError::source_failed_with_source("replay", Box::new(inner));
        let source = std::error::Error::source(&error).expect("source should be kept");
        assert_eq!(source.to_string(), "pipe closed");
    }
}
