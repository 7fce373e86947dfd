//! # Channel-backed event streams.
//!
//! [`channel`] pairs an [`Observer`] with an [`EventStream`]: every event the observer receives is
//! cloned into an unbounded tokio channel and read back on the async side.
//!
//! ## Rules
//! - The stream yields events in delivery order and ends right after the terminal event.
//! - If every sender is dropped first (the submission's lifetime ended), the stream ends without one.
//! - Sending never blocks the producing task.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::error::StreamError;
use crate::events::Event;
use crate::lifetime::Lifetime;
use crate::observers::{Observer, ObserverRef};
use crate::tasks::Task;

/// Observer half of [`channel`].
struct ChannelObserver<V, E> {
    tx: mpsc::UnboundedSender<Event<V, E>>,
}

impl<V, E> Observer<V, E> for ChannelObserver<V, E>
where
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn on_event(&self, event: &Event<V, E>) {
        // The receiver is gone once the caller dropped its stream; nobody is left to tell.
        let _ = self.tx.send(event.clone());
    }
}

/// Creates an observer and the stream that reads what it receives.
///
/// ## Example
/// ```rust
/// use taskgate::{Event, Observer, channel};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (observer, stream) = channel::<u32, String>();
/// observer.on_event(&Event::Value(1));
/// observer.on_event(&Event::Completed);
///
/// assert_eq!(stream.result().await, Ok(vec![1]));
/// # }
/// ```
pub fn channel<V, E>() -> (ObserverRef<V, E>, EventStream<V, E>)
where
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let observer: ObserverRef<V, E> = Arc::new(ChannelObserver { tx });
    (
        observer,
        EventStream {
            rx,
            finished: false,
        },
    )
}

/// Receiving half of [`channel`]; a [`Stream`] of [`Event`]s.
#[derive(Debug)]
pub struct EventStream<V, E> {
    rx: mpsc::UnboundedReceiver<Event<V, E>>,
    finished: bool,
}

impl<V, E> EventStream<V, E>
where
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Starts `task` with a fresh lifetime and returns the stream of its events.
    ///
    /// Ending the returned [`Lifetime`] cancels this caller's submission.
    pub fn start<T>(task: &T) -> (Self, Lifetime)
    where
        T: Task<V, E> + ?Sized,
    {
        let (observer, stream) = channel();
        let lifetime = Lifetime::new();
        task.start(observer, &lifetime);
        (stream, lifetime)
    }
}

impl<V, E> EventStream<V, E> {
    /// Returns an already-delivered event without waiting.
    pub fn try_next(&mut self) -> Option<Event<V, E>> {
        if self.finished {
            return None;
        }
        let ev = self.rx.try_recv().ok()?;
        if ev.is_terminal() {
            self.finished = true;
        }
        Some(ev)
    }

    /// Reads every remaining event, terminal included.
    pub async fn collect_events(self) -> Vec<Event<V, E>> {
        self.collect().await
    }

    /// Reads the remaining values until the terminal event.
    ///
    /// - `Completed` → `Ok(values)`
    /// - `Failed(e)` → `Err(StreamError::Failed(e))`
    /// - closed without a terminal event → `Err(StreamError::Closed)`
    pub async fn result(mut self) -> Result<Vec<V>, StreamError<E>> {
        let mut values = Vec::new();
        while let Some(ev) = self.next().await {
            match ev {
                Event::Value(v) => values.push(v),
                Event::Completed => return Ok(values),
                Event::Failed(e) => return Err(StreamError::Failed(e)),
            }
        }
        Err(StreamError::Closed)
    }
}

impl<V, E> Stream for EventStream<V, E> {
    type Item = Event<V, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(ev)) => {
                if ev.is_terminal() {
                    self.finished = true;
                }
                Poll::Ready(Some(ev))
            }
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
