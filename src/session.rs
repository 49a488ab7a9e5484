//! Replay session: a replay file driven through the engine on a background task

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{UnboundedReceiverStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::display::DisplayState;
use crate::driver::Driver;
use crate::engine::Engine;
use crate::notification::Notification;
use crate::source::TelemetrySource;
use crate::sources::ReplaySource;
use crate::stream::ThrottleExt;
use crate::types::UpdateRate;
use crate::{RecordError, Result};

/// How long [`ReplaySession::open`] waits for the first rendered tick.
pub const FIRST_TICK_TIMEOUT: Duration = Duration::from_secs(5);

/// Engine running against a telemetry source on a background task.
///
/// Dropping the session cancels the task.
pub struct ReplaySession {
    display: watch::Receiver<Option<Arc<DisplayState>>>,
    notifications: Option<mpsc::UnboundedReceiver<Notification>>,
    source_hz: f64,
    cancel: CancellationToken,
    task: Option<JoinHandle<Engine>>,
}

impl ReplaySession {
    /// Open a replay file and start ticking an engine built from `config`.
    ///
    /// Waits for the first tick before returning so display subscriptions
    /// start with data.
    pub async fn open(path: impl AsRef<Path>, config: EngineConfig) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Opening replay session");

        let source = ReplaySource::open(path)?;
        let session = Self::start(source, Engine::new(config));

        if let Err(e) = session.wait_for_display(FIRST_TICK_TIMEOUT).await {
            warn!(error = %e, "No display state from replay");
        }

        info!(source_hz = session.source_hz, "Replay session opened");
        Ok(session)
    }

    /// Run `engine` against any telemetry source.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S>(source: S, engine: Engine) -> Self
    where
        S: TelemetrySource,
    {
        let source_hz = source.tick_rate();
        let channels = Driver::spawn(source, engine);
        Self {
            display: channels.display,
            notifications: Some(channels.notifications),
            source_hz,
            cancel: channels.cancel,
            task: Some(channels.task),
        }
    }

    /// Wait until a display state is available.
    pub async fn wait_for_display(&self, timeout: Duration) -> Result<Arc<DisplayState>> {
        let mut display = self.display.clone();
        let first = tokio::time::timeout(timeout, async move {
            // Errors once the driver is gone; whatever was last sent is still readable
            let _ = display.wait_for(Option::is_some).await;
            display.borrow().clone()
        })
        .await;

        match first {
            Ok(Some(state)) => Ok(state),
            Ok(None) => Err(RecordError::source_failed("session ended before the first tick")),
            Err(_) => Err(RecordError::Timeout { duration: timeout }),
        }
    }

    /// Stream of display states at the requested rate.
    pub fn display_updates(&self, rate: UpdateRate) -> BoxStream<'static, Arc<DisplayState>> {
        let states =
            WatchStream::new(self.display.clone()).filter_map(|state| async move { state });

        match rate.interval(self.source_hz) {
            None => states.boxed(),
            Some(period) => states.throttle(period).boxed(),
        }
    }

    /// Record and finish announcements.
    ///
    /// The announcements can only be taken once; later calls return an empty stream.
    pub fn notifications(&mut self) -> impl Stream<Item = Notification> + Send + 'static {
        match self.notifications.take() {
            Some(rx) => UnboundedReceiverStream::new(rx).boxed(),
            None => {
                debug!("Notifications already taken");
                futures::stream::empty().boxed()
            }
        }
    }

    /// Most recent display state.
    pub fn current_display(&self) -> Option<Arc<DisplayState>> {
        self.display.borrow().clone()
    }

    /// Tick rate of the underlying source.
    pub fn source_hz(&self) -> f64 {
        self.source_hz
    }

    /// Stop the background task.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the source to run out and take the engine back.
    ///
    /// Returns `None` if the task panicked or the engine was already taken.
    pub async fn finish(mut self) -> Option<Engine> {
        let task = self.task.take()?;
        match task.await {
            Ok(engine) => Some(engine),
            Err(e) => {
                warn!(error = %e, "Tick loop failed");
                None
            }
        }
    }
}

impl Drop for ReplaySession {
    fn drop(&mut self) {
        debug!("Dropping replay session");
        self.cancel.cancel();
    }
}
