//! Latest-wins stream throttling

use futures::Stream;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Instant, Sleep, sleep};

/// Extension trait to add throttling to any Stream
pub trait ThrottleExt: Stream {
    /// Emit at most one item per `period`.
    ///
    /// The first item passes through immediately. Items arriving while the
    /// period is running replace each other and only the latest is emitted
    /// when it ends. A pending item is flushed before the stream finishes.
    ///
    /// Must be called from within a tokio runtime.
    fn throttle(self, period: Duration) -> Throttle<Self>
    where
        Self: Sized,
    {
        Throttle::new(self, period)
    }
}

impl<T: Stream> ThrottleExt for T {}

pin_project! {
    /// Stream returned by [`ThrottleExt::throttle`].
    pub struct Throttle<S: Stream> {
        #[pin]
        stream: S,
        #[pin]
        delay: Sleep,
        period: Duration,
        pending: Option<S::Item>,
        cooling_down: bool,
        exhausted: bool,
    }
}

impl<S: Stream> Throttle<S> {
    pub fn new(stream: S, period: Duration) -> Self {
        Self {
            stream,
            delay: sleep(Duration::ZERO),
            period,
            pending: None,
            cooling_down: false,
            exhausted: false,
        }
    }
}

impl<S: Stream> Stream for Throttle<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Drain whatever is ready, keeping only the latest
        while !*this.exhausted {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.pending = Some(item),
                Poll::Ready(None) => *this.exhausted = true,
                Poll::Pending => break,
            }
        }

        if *this.cooling_down {
            if this.delay.as_mut().poll(cx).is_pending() {
                if *this.exhausted && this.pending.is_none() {
                    return Poll::Ready(None);
                }
                return Poll::Pending;
            }
            *this.cooling_down = false;
        }

        match this.pending.take() {
            Some(item) => {
                this.delay.as_mut().reset(Instant::now() + *this.period);
                *this.cooling_down = true;
                Poll::Ready(Some(item))
            }
            None if *this.exhausted => Poll::Ready(None),
            None => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::pin::pin;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    #[tokio::test]
    async fn burst_collapses_to_latest() {
        let items: Vec<u32> =
            futures::stream::iter(1..=5).throttle(Duration::from_millis(20)).collect().await;
        assert_eq!(items, [5]);
    }

    #[tokio::test]
    async fn first_item_is_immediate_then_spaced() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let mut stream =
            pin!(UnboundedReceiverStream::new(rx).throttle(Duration::from_millis(50)));

        tx.send(1).unwrap();
        let start = Instant::now();
        assert_eq!(stream.next().await, Some(1));
        assert!(start.elapsed() < Duration::from_millis(50));

        tx.send(2).unwrap();
        tx.send(3).unwrap();
        assert_eq!(stream.next().await, Some(3));
        assert!(start.elapsed() >= Duration::from_millis(50));

        drop(tx);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn idle_source_does_not_end_the_stream() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let mut stream =
            pin!(UnboundedReceiverStream::new(rx).throttle(Duration::from_millis(5)));

        let idle = tokio::time::timeout(Duration::from_millis(30), stream.next()).await;
        assert!(idle.is_err());

        tx.send(7).unwrap();
        assert_eq!(stream.next().await, Some(7));
    }

    #[tokio::test]
    async fn pending_item_is_flushed_before_end() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let mut stream =
            pin!(UnboundedReceiverStream::new(rx).throttle(Duration::from_millis(20)));

        tx.send(1).unwrap();
        assert_eq!(stream.next().await, Some(1));
        tx.send(2).unwrap();
        drop(tx);

        assert_eq!(stream.next().await, Some(2));
        assert_eq!(stream.next().await, None);
    }
}
