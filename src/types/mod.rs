//! Core types for lap and record tracking.
//!
//! ## Architecture
//!
//! - [`TelemetrySnapshot`] / [`CarSample`] hold one tick of simulator state
//! - [`TrackKey`] and [`CarIdentity`] key the persisted records
//! - [`LapTime`] is a validated, strictly positive millisecond count
//! - [`UpdateRate`] controls how often display subscribers are woken
//!
//! ## Usage Example
//!
//! ```rust
//! use trackstats::types::{CarSample, LapTime, TelemetrySnapshot};
//!
//! let snapshot = TelemetrySnapshot {
//!     track_name: "monza".to_string(),
//!     track_length_m: 5793.0,
//!     focused_car: 0,
//!     cars: vec![CarSample {
//!         car_name: "ks_ferrari_488_gt3".to_string(),
//!         last_lap_ms: 107_512,
//!         ..Default::default()
//!     }],
//!     ..Default::default()
//! };
//!
//! let (_, car) = snapshot.focused().unwrap();
//! assert_eq!(car.last_lap(), LapTime::from_millis(107_512));
//! assert_eq!(car.last_lap().unwrap().to_string(), "1:47.512");
//! ```

mod lap_time;
mod snapshot;
mod track;
mod update_rate;

pub use lap_time::{INVALID_TIME, LapTime, NO_TIME, format_millis, format_previous};
pub use snapshot::{CarSample, TelemetrySnapshot};
pub use track::{CarIdentity, DEFAULT_LAYOUT, TrackKey};
pub use update_rate::UpdateRate;
