//! Lap, personal-best and track-record tracking for racing simulator telemetry.
//!
//! Trackstats consumes one telemetry snapshot per simulator tick, detects lap
//! completions and race finishes, keeps a CSV-backed table of best laps per
//! track and car, and announces new personal bests and track records. It also
//! computes live gaps to the neighbouring cars for an on-screen widget.
//!
//! # Features
//!
//! - **Edge detection**: polled lap and finish state becomes one-shot events
//! - **Persistent records**: one CSV file per track, atomic writes, TTL read cache
//! - **Relative timing**: gaps to the cars ahead and behind, wrapped across the line
//! - **Replay**: recorded snapshot sequences driven through the engine on tokio
//!
//! ## Example (synchronous host loop)
//!
//! ```rust
//! use trackstats::{Engine, EngineConfig, LogSink};
//! use trackstats::types::{CarSample, TelemetrySnapshot};
//!
//! # let dir = std::env::temp_dir().join("trackstats-doc-lib");
//! let mut engine = Engine::new(EngineConfig::with_records_dir(&dir));
//! let mut sink = LogSink;
//!
//! let snapshot = TelemetrySnapshot {
//!     track_name: "magione".to_string(),
//!     cars: vec![CarSample {
//!         car_name: "ktm_xbow_r".to_string(),
//!         last_lap_ms: 78_800,
//!         ..Default::default()
//!     }],
//!     ..Default::default()
//! };
//!
//! let report = engine.tick(&snapshot, &mut sink);
//! assert_eq!(report.display.last_lap, "Last Lap: 1:18.800");
//! ```
//!
//! ## Example (replay)
//!
//! ```rust,no_run
//! use trackstats::{EngineConfig, TrackStats, UpdateRate};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     trackstats::init_logging();
//!     let config = EngineConfig::load("trackstats.yaml")?;
//!     let mut session = TrackStats::replay("race.yaml", config).await?;
//!
//!     let mut labels = session.display_updates(UpdateRate::Max(2));
//!     let mut notifications = session.notifications();
//!     tokio::spawn(async move {
//!         while let Some(notification) = notifications.next().await {
//!             println!("{notification}");
//!         }
//!     });
//!     while let Some(state) = labels.next().await {
//!         println!("{} | {}", state.current, state.relative);
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Tracking engine
pub mod detector;
pub mod display;
pub mod engine;
pub mod notification;
pub mod relative;
pub mod service;
pub mod store;

// Stream-based host layer
pub mod driver;
pub mod session;
pub mod source;
pub mod sources;
pub mod stream;

pub use config::EngineConfig;
pub use detector::{FinishPolicy, LapEvent, LapEventDetector};
pub use display::DisplayState;
pub use engine::{Engine, TickReport};
pub use error::*;
pub use notification::{LogSink, Notification, NotificationSink};
pub use relative::{Relative, RelativeGapCalculator};
pub use service::{RecordOutcome, RecordService};
pub use session::ReplaySession;
pub use source::TelemetrySource;
pub use store::{CatalogEntry, LapRecord, RecordStore, TrackBest};
pub use types::UpdateRate;

/// Filter used by [`init_logging`] when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "trackstats=info";

/// Install a `tracing` subscriber writing to stderr.
///
/// Honours `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`]. Does nothing if
/// a global subscriber is already installed.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Unified entry point for trackstats engines and sessions.
pub struct TrackStats;

impl TrackStats {
    /// Engine for a host that drives ticks itself.
    pub fn engine(config: EngineConfig) -> Engine {
        Engine::new(config)
    }

    /// Engine configured from a YAML file; a missing file means defaults.
    pub fn engine_from_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Engine> {
        Ok(Engine::new(EngineConfig::load(path)?))
    }

    /// Replay a recorded snapshot file through a fresh engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid replay
    /// document.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use trackstats::{EngineConfig, TrackStats};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> trackstats::Result<()> {
    /// let session = TrackStats::replay("race.yaml", EngineConfig::default()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn replay(
        path: impl AsRef<std::path::Path>,
        config: EngineConfig,
    ) -> Result<ReplaySession> {
        ReplaySession::open(path, config).await
    }
}
