//! # Task abstraction.
//!
//! A [`Task`] is an opaque, restartable unit of work. Starting it with an observer and a
//! [`Lifetime`] begins one execution, whose events go to that observer:
//! zero or more [`Event::Value`](crate::Event::Value)s, then exactly one terminal event.
//!
//! The scheduler never inspects, compares or hashes tasks; it only decides *when* to call
//! [`Task::start`]. The common handle type is [`TaskRef`], an `Arc<dyn Task>`.
//!
//! Queue and coalescer handles ([`QueuedTask`](crate::QueuedTask),
//! [`CoalescedTask`](crate::CoalescedTask)) are tasks themselves, so they compose.

use std::sync::Arc;

use crate::lifetime::Lifetime;
use crate::observers::ObserverRef;

/// # Shared handle to a task object.
pub type TaskRef<V, E> = Arc<dyn Task<V, E>>;

/// # Startable, cancelable unit of work.
///
/// ### Contract
/// - Every call to `start` begins an independent execution.
/// - An execution emits exactly one terminal event and nothing after it.
/// - `start` must not block; long work belongs on a runtime (see [`TaskFn`](crate::TaskFn)).
/// - Once `lifetime` ends the execution should stop; it may skip its terminal event.
///
/// # Example
/// ```
/// use taskgate::{Event, Lifetime, Observer, ObserverRef, Task};
///
/// /// Emits its constant synchronously.
/// struct Just(u32);
///
/// impl Task<u32, String> for Just {
///     fn start(&self, observer: ObserverRef<u32, String>, lifetime: &Lifetime) {
///         if lifetime.is_ended() {
///             return;
///         }
///         observer.on_event(&Event::Value(self.0));
///         observer.on_event(&Event::Completed);
///     }
/// }
/// ```
pub trait Task<V, E>: Send + Sync + 'static {
    /// Begins one execution, reporting to `observer` until it terminates or `lifetime` ends.
    fn start(&self, observer: ObserverRef<V, E>, lifetime: &Lifetime);
}

impl<V, E, T> Task<V, E> for Arc<T>
where
    T: Task<V, E> + ?Sized,
{
    fn start(&self, observer: ObserverRef<V, E>, lifetime: &Lifetime) {
        (**self).start(observer, lifetime)
    }
}
