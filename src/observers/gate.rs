//! # Delivery gate for one caller.
//!
//! Wraps a caller's observer so that:
//! - nothing is delivered once the caller's [`Lifetime`] has ended;
//! - nothing is delivered after the first terminal event.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::events::Event;
use crate::lifetime::Lifetime;
use crate::observers::{Observer, ObserverRef};

pub(crate) struct Gated<V, E> {
    inner: ObserverRef<V, E>,
    lifetime: Lifetime,
    done: AtomicBool,
}

impl<V, E> Gated<V, E> {
    pub(crate) fn new(inner: ObserverRef<V, E>, lifetime: Lifetime) -> Self {
        Self {
            inner,
            lifetime,
            done: AtomicBool::new(false),
        }
    }
}

impl<V, E> Observer<V, E> for Gated<V, E>
where
    V: 'static,
    E: 'static,
{
    fn on_event(&self, event: &Event<V, E>) {
        if self.done.load(Ordering::Acquire) || self.lifetime.is_ended() {
            return;
        }
        if event.is_terminal() && self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.on_event(event);
    }
}
