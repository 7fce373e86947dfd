//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(Emitter<V, E>, CancellationToken) -> Fut`, producing a fresh
//! future per start. The future runs on the tokio runtime the task was created on, whichever
//! thread starts it; its `Result` becomes the terminal event.
//!
//! ## Concurrency semantics
//! - Each [`Task::start`] creates a **new** future owning its own state.
//! - No hidden mutation between starts; shared state goes in an explicit `Arc<...>` inside the closure.
//! - Ending the lifetime drops the future at its next await point; no terminal event is sent then.
//!
//! ## Example
//! ```rust
//! use tokio::runtime::Handle;
//! use tokio_util::sync::CancellationToken;
//! use taskgate::{Emitter, EventStream, TaskError, TaskFn};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let count = TaskFn::arc("count", |out: Emitter<u32, TaskError>, _ctx: CancellationToken| async move {
//!     for i in 0..3 {
//!         out.send(i);
//!     }
//!     Ok::<(), TaskError>(())
//! });
//!
//! let (stream, _lifetime) = EventStream::start(&count);
//! assert_eq!(stream.result().await, Ok(vec![0, 1, 2]));
//! # }
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::events::Event;
use crate::lifetime::Lifetime;
use crate::observers::ObserverRef;
use crate::tasks::Task;

/// Value sender handed to a [`TaskFn`] body.
pub struct Emitter<V, E> {
    observer: ObserverRef<V, E>,
}

impl<V: 'static, E: 'static> Emitter<V, E> {
    /// Emits one [`Event::Value`].
    pub fn send(&self, value: V) {
        self.observer.on_event(&Event::Value(value));
    }
}

impl<V, E> Clone for Emitter<V, E> {
    fn clone(&self) -> Self {
        Self {
            observer: Arc::clone(&self.observer),
        }
    }
}

impl<V, E> fmt::Debug for Emitter<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter").finish_non_exhaustive()
    }
}

/// Function-backed task implementation.
///
/// Wraps a closure that *creates* a new future per start.
#[derive(Debug)]
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    runtime: Handle,
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task bound to the current tokio runtime.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a shared handle.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime; use [`TaskFn::with_runtime`] there.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self::with_runtime(name, Handle::current(), f)
    }

    /// Creates a task whose executions are spawned on `runtime`.
    pub fn with_runtime(name: impl Into<Cow<'static, str>>, runtime: Handle, f: F) -> Self {
        Self {
            name: name.into(),
            runtime,
            f,
        }
    }

    /// Creates the task and returns it as a shared handle.
    ///
    /// # Panics
    /// Same as [`TaskFn::new`].
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }

    /// Returns the task name used in trace records.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<V, E, F, Fut> Task<V, E> for TaskFn<F>
where
    F: Fn(Emitter<V, E>, CancellationToken) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    V: 'static,
    E: Send + 'static,
{
    fn start(&self, observer: ObserverRef<V, E>, lifetime: &Lifetime) {
        if lifetime.is_ended() {
            return;
        }

        let token = lifetime.token();
        let emitter = Emitter {
            observer: Arc::clone(&observer),
        };
        let fut = (self.f)(emitter, token.clone());
        let name = self.name.clone();

        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    trace!(task = %name, "execution abandoned");
                }
                res = fut => {
                    observer.on_event(&Event::from_result(res));
                }
            }
        });
    }
}
