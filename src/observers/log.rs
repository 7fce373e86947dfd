//! # LogObserver - event tracer
//!
//! An observer that records every event through `tracing` and then forwards it.
//! Use it to see what a submission receives without changing the consumer.
//!
//! ## Example output (with a fmt subscriber)
//! ```text
//! DEBUG taskgate::observers::log: event label="thumb" kind="value" value=3
//! INFO  taskgate::observers::log: execution completed label="thumb"
//! WARN  taskgate::observers::log: execution failed label="thumb" error="timeout"
//! ```

use std::borrow::Cow;
use std::fmt::Debug;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::events::Event;
use crate::observers::{Observer, ObserverRef};

/// Event tracing observer.
pub struct LogObserver<V, E> {
    label: Cow<'static, str>,
    inner: Option<ObserverRef<V, E>>,
}

impl<V, E> LogObserver<V, E> {
    /// Logs events under `label`, then forwards them to `inner`.
    #[must_use]
    pub fn new(label: impl Into<Cow<'static, str>>, inner: ObserverRef<V, E>) -> Self {
        Self {
            label: label.into(),
            inner: Some(inner),
        }
    }

    /// Logs events under `label` and drops them.
    #[must_use]
    pub fn sink(label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: label.into(),
            inner: None,
        }
    }

    /// Same as [`LogObserver::new`], returned as a shared handle.
    pub fn arc(label: impl Into<Cow<'static, str>>, inner: ObserverRef<V, E>) -> Arc<Self> {
        Arc::new(Self::new(label, inner))
    }
}

impl<V, E> Observer<V, E> for LogObserver<V, E>
where
    V: Debug + 'static,
    E: Debug + 'static,
{
    fn on_event(&self, event: &Event<V, E>) {
        match event {
            Event::Value(v) => {
                debug!(label = %self.label, kind = "value", value = ?v, "event");
            }
            Event::Completed => {
                info!(label = %self.label, "execution completed");
            }
            Event::Failed(e) => {
                warn!(label = %self.label, error = ?e, "execution failed");
            }
        }
        if let Some(inner) = &self.inner {
            inner.on_event(event);
        }
    }
}
