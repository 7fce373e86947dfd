//! # Cancellation scope of a single submission.
//!
//! A [`Lifetime`] is handed to [`Task::start`](crate::Task::start) together with the observer.
//! It ends at most once. Ending it:
//! - cancels the underlying [`CancellationToken`] (async task bodies watch it);
//! - runs every hook registered with [`Lifetime::on_end`], exactly once, on the ending thread.
//!
//! Hooks registered after the lifetime ended run immediately on the registering thread.
//! A hook that is no longer needed can be dropped with [`Lifetime::remove_hook`], so a long-lived
//! lifetime shared by many submissions does not accumulate them.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use taskgate::Lifetime;
//!
//! let lifetime = Lifetime::new();
//! let hits = Arc::new(AtomicUsize::new(0));
//!
//! let h = Arc::clone(&hits);
//! lifetime.on_end(move || { h.fetch_add(1, Ordering::SeqCst); });
//!
//! lifetime.end();
//! lifetime.end(); // no-op
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! assert!(lifetime.token().is_cancelled());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

type Hook = Box<dyn FnOnce() + Send + 'static>;

/// Shared cancellation scope (cheap to clone; all clones observe the same state).
#[derive(Clone, Default)]
pub struct Lifetime {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    token: CancellationToken,
    state: Mutex<HookState>,
}

#[derive(Default)]
struct HookState {
    ended: bool,
    next_hook: u64,
    // Keyed by registration order.
    hooks: BTreeMap<u64, Hook>,
}

/// Handle to a hook registered with [`Lifetime::on_end`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

impl Lifetime {
    /// Creates a live lifetime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the token cancelled when this lifetime ends.
    pub fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    /// Returns `true` once [`end`](Self::end) has been called on any clone.
    pub fn is_ended(&self) -> bool {
        self.inner.state.lock().ended
    }

    /// Ends the lifetime: cancels the token and runs all hooks.
    ///
    /// Idempotent; only the first call does anything.
    pub fn end(&self) {
        let hooks = {
            let mut state = self.inner.state.lock();
            if state.ended {
                return;
            }
            state.ended = true;
            std::mem::take(&mut state.hooks)
        };

        self.inner.token.cancel();
        for hook in hooks.into_values() {
            hook();
        }
    }

    /// Registers a hook to run when the lifetime ends.
    ///
    /// Runs `hook` right away if the lifetime has already ended. The returned id can be passed to
    /// [`remove_hook`](Self::remove_hook).
    pub fn on_end(&self, hook: impl FnOnce() + Send + 'static) -> HookId {
        let id = {
            let mut state = self.inner.state.lock();
            let id = state.next_hook;
            state.next_hook += 1;
            if !state.ended {
                state.hooks.insert(id, Box::new(hook));
                return HookId(id);
            }
            id
        };
        hook();
        HookId(id)
    }

    /// Unregisters a hook that has not run yet.
    ///
    /// Returns `false` if the hook already ran or was removed before.
    pub fn remove_hook(&self, id: HookId) -> bool {
        let removed = self.inner.state.lock().hooks.remove(&id.0);
        removed.is_some()
    }

    #[cfg(test)]
    pub(crate) fn hook_count(&self) -> usize {
        self.inner.state.lock().hooks.len()
    }

    /// Waits until the lifetime ends.
    pub async fn ended(&self) {
        self.inner.token.cancelled().await;
    }
}

impl fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Lifetime")
            .field("ended", &state.ended)
            .field("hooks", &state.hooks.len())
            .finish()
    }
}
