//! Built-in telemetry sources

pub mod replay;

pub use replay::{ReplayFile, ReplaySource};
