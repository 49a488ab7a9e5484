//! Telemetry source trait

use crate::Result;
use crate::types::TelemetrySnapshot;

/// Supplier of telemetry snapshots for the [`Driver`](crate::driver::Driver).
///
/// A source paces itself: `next_snapshot` resolves when the next tick is due.
#[async_trait::async_trait]
pub trait TelemetrySource: Send + 'static {
    /// Wait for the next snapshot.
    ///
    /// Returns:
    /// - `Ok(Some(snapshot))` - next tick
    /// - `Ok(None)` - source exhausted
    /// - `Err(e)` - read failed; the driver retries with backoff
    async fn next_snapshot(&mut self) -> Result<Option<TelemetrySnapshot>>;

    /// Ticks per second delivered by this source.
    fn tick_rate(&self) -> f64;
}
