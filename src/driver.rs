//! Driver runs the engine against a telemetry source on a tokio task

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::display::DisplayState;
use crate::engine::Engine;
use crate::notification::Notification;
use crate::source::TelemetrySource;

/// Consecutive source errors tolerated before the driver gives up.
pub const MAX_ERRORS: u32 = 10;

/// Result of spawning the driver task
pub struct DriverChannels {
    /// Latest rendered labels, `None` until the first tick
    pub display: watch::Receiver<Option<Arc<DisplayState>>>,
    /// Record and finish announcements in the order they happened
    pub notifications: mpsc::UnboundedReceiver<Notification>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
    /// Resolves to the engine once the task stops
    pub task: JoinHandle<Engine>,
}

/// Spawns and runs the tick loop.
///
/// The task owns both the source and the engine; state leaves it only through
/// the channels in [`DriverChannels`].
pub struct Driver;

impl Driver {
    /// Spawn the tick loop for `source`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S>(source: S, engine: Engine) -> DriverChannels
    where
        S: TelemetrySource,
    {
        let (display_tx, display_rx) = watch::channel(None);
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(Self::tick_loop(
            source,
            engine,
            display_tx,
            notify_tx,
            cancel.clone(),
        ));

        DriverChannels { display: display_rx, notifications: notify_rx, cancel, task }
    }

    async fn tick_loop<S>(
        mut source: S,
        mut engine: Engine,
        display_tx: watch::Sender<Option<Arc<DisplayState>>>,
        mut notify_tx: mpsc::UnboundedSender<Notification>,
        cancel: CancellationToken,
    ) -> Engine
    where
        S: TelemetrySource,
    {
        info!(tick_rate = source.tick_rate(), "Tick loop started");
        let mut tick_count = 0u64;
        let mut error_count = 0u32;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Tick loop cancelled");
                    break;
                }
                result = source.next_snapshot() => result,
            };

            match result {
                Ok(Some(snapshot)) => {
                    tick_count += 1;
                    error_count = 0;

                    let report = engine.tick(&snapshot, &mut notify_tx);
                    trace!(tick_count, events = report.events.len(), "Tick");

                    if display_tx.send(Some(Arc::new(report.display))).is_err() {
                        debug!("Display receiver dropped, shutting down");
                        break;
                    }
                }
                Ok(None) => {
                    info!(tick_count, "Telemetry source ended");
                    break;
                }
                Err(e) => {
                    error_count += 1;
                    error!(error = %e, error_count, max = MAX_ERRORS, "Telemetry source error");

                    if error_count >= MAX_ERRORS {
                        error!("Too many source errors, shutting down");
                        break;
                    }

                    tokio::time::sleep(backoff(error_count)).await;
                }
            }
        }

        info!(tick_count, "Tick loop ended");
        engine
    }
}

/// Delay before retrying after the given number of consecutive errors: 100ms, 200ms, ... 1.6s.
fn backoff(error_count: u32) -> Duration {
    Duration::from_millis(50 * (1 << error_count.min(5)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::types::{CarSample, TelemetrySnapshot};
    use crate::{RecordError, Result};

    /// Yields scripted results, then ends.
    struct ScriptedSource {
        script: std::collections::VecDeque<Result<Option<TelemetrySnapshot>>>,
    }

    #[async_trait::async_trait]
    impl TelemetrySource for ScriptedSource {
        async fn next_snapshot(&mut self) -> Result<Option<TelemetrySnapshot>> {
            self.script.pop_front().unwrap_or(Ok(None))
        }

        fn tick_rate(&self) -> f64 {
            60.0
        }
    }

    fn lap(ms: i32) -> TelemetrySnapshot {
        TelemetrySnapshot {
            track_name: "magione".to_string(),
            cars: vec![CarSample {
                car_name: "ktm_xbow_r".to_string(),
                last_lap_ms: ms,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn backoff_grows_then_caps() {
        assert_eq!(backoff(1), Duration::from_millis(100));
        assert_eq!(backoff(2), Duration::from_millis(200));
        assert_eq!(backoff(5), Duration::from_millis(1600));
        assert_eq!(backoff(9), Duration::from_millis(1600));
    }

    #[tokio::test]
    async fn ticks_engine_and_forwards_notifications() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(EngineConfig::with_records_dir(dir.path()));
        let source = ScriptedSource {
            script: [Ok(Some(lap(0))), Ok(Some(lap(80_000))), Ok(Some(lap(79_000)))].into(),
        };

        let mut channels = Driver::spawn(source, engine);
        let engine = channels.task.await.unwrap();

        let mut notifications = Vec::new();
        while let Ok(notification) = channels.notifications.try_recv() {
            notifications.push(notification);
        }
        assert_eq!(notifications.len(), 2);
        assert!(matches!(notifications[1], Notification::TrackRecord { .. }));

        let display = channels.display.borrow().clone().unwrap();
        assert_eq!(display.last_lap, "Last Lap: 1:19.000");
        assert_eq!(engine.detector().last_lap_seen(0).map(|t| t.as_millis()), Some(79_000));
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(EngineConfig::with_records_dir(dir.path()));
        let source = ScriptedSource {
            script: [Err(RecordError::source_failed("hiccup")), Ok(Some(lap(80_000)))].into(),
        };

        let channels = Driver::spawn(source, engine);
        channels.task.await.unwrap();

        let display = channels.display.borrow().clone().unwrap();
        assert_eq!(display.last_lap, "Last Lap: 1:20.000");
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop() {
        struct Stalled;

        #[async_trait::async_trait]
        impl TelemetrySource for Stalled {
            async fn next_snapshot(&mut self) -> Result<Option<TelemetrySnapshot>> {
                futures::future::pending().await
            }

            fn tick_rate(&self) -> f64 {
                60.0
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(EngineConfig::with_records_dir(dir.path()));
        let channels = Driver::spawn(Stalled, engine);
        channels.cancel.cancel();

        let stopped = tokio::time::timeout(Duration::from_secs(1), channels.task).await;
        assert!(stopped.is_ok());
        assert!(channels.display.borrow().is_none());
    }
}
