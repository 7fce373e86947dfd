//! # Observer: receivers of task events
//!
//! The [`Observer`] trait is the sink side of every submission. A task started with an observer
//! reports each [`Event`] to it, in order, ending with exactly one terminal event.
//!
//! # High-level architecture:
//! ```text
//! Task::start(observer, lifetime)
//!     └─► observer.on_event(&Value(..))   (0..n times)
//!     └─► observer.on_event(&Completed | &Failed(e))   (exactly once)
//!
//! Coalesced key:
//!   one execution ──► fan-out ──┬─► observer #1
//!                               ├─► observer #2
//!                               └─► observer #n   (same events, same order)
//! ```
//!
//! # Example: custom observer
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use taskgate::{Event, Observer};
//!
//! #[derive(Default)]
//! struct CountValues(AtomicUsize);
//!
//! impl Observer<String, std::io::Error> for CountValues {
//!     fn on_event(&self, event: &Event<String, std::io::Error>) {
//!         if let Event::Value(_) = event {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//! }
//!
//! let obs = CountValues::default();
//! obs.on_event(&Event::Value("a".into()));
//! assert_eq!(obs.0.load(Ordering::Relaxed), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::events::Event;

/// # Shared handle to an observer object.
pub type ObserverRef<V, E> = Arc<dyn Observer<V, E>>;

/// # Trait for receiving the events of one execution.
///
/// Called synchronously from whatever context the task emits on; keep it quick
/// and hand heavy work off (see [`channel`](crate::channel)).
pub trait Observer<V, E>: Send + Sync + 'static {
    /// Called for every delivered [`Event`].
    fn on_event(&self, event: &Event<V, E>);
}

/// # Closure-backed observer.
///
/// ```rust
/// use taskgate::{Event, Observer, ObserverFn, ObserverRef};
///
/// let obs: ObserverRef<u8, ()> = ObserverFn::arc(|ev: &Event<u8, ()>| {
///     println!("{}", ev.as_label());
/// });
/// obs.on_event(&Event::Completed);
/// ```
pub struct ObserverFn<F> {
    f: F,
}

impl<F> ObserverFn<F> {
    /// Wraps a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps a closure and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F> fmt::Debug for ObserverFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverFn").finish_non_exhaustive()
    }
}

impl<V, E, F> Observer<V, E> for ObserverFn<F>
where
    F: Fn(&Event<V, E>) + Send + Sync + 'static,
{
    fn on_event(&self, event: &Event<V, E>) {
        (self.f)(event)
    }
}
