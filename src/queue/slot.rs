use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::events::Event;
use crate::lifetime::{HookId, Lifetime};
use crate::observers::{Gated, Observer};

use super::core::Shared;

/// One occupied unit of the concurrency limit.
///
/// Released by whichever comes first: the execution's terminal event or the end of its
/// lifetime. Later calls are no-ops, so a slot can never be freed twice.
pub(super) struct Slot<V, E> {
    queue: Weak<Shared<V, E>>,
    released: AtomicBool,
    lifetime: Lifetime,
    hook: Mutex<Option<HookId>>,
}

impl<V, E> Slot<V, E>
where
    V: 'static,
    E: 'static,
{
    pub fn new(queue: Weak<Shared<V, E>>, lifetime: Lifetime) -> Self {
        Self {
            queue,
            released: AtomicBool::new(false),
            lifetime,
            hook: Mutex::new(None),
        }
    }

    /// Releases the slot when the lifetime ends; right away if it already has.
    pub fn arm(self: &Arc<Self>) {
        let slot = Arc::clone(self);
        let id = self.lifetime.on_end(move || slot.release());
        if self.released.load(Ordering::Acquire) {
            return;
        }
        *self.hook.lock() = Some(id);
    }

    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        let hook = self.hook.lock().take();
        if let Some(hook) = hook {
            self.lifetime.remove_hook(hook);
        }
        if let Some(queue) = self.queue.upgrade() {
            queue.release_slot();
        }
    }

    #[cfg(test)]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

/// Observer installed between a running task and its caller.
///
/// Frees the slot on the terminal event, then forwards the event through the caller's gate.
pub(super) struct SlotObserver<V, E> {
    slot: Arc<Slot<V, E>>,
    downstream: Gated<V, E>,
}

impl<V, E> SlotObserver<V, E> {
    pub fn new(slot: Arc<Slot<V, E>>, downstream: Gated<V, E>) -> Self {
        Self { slot, downstream }
    }
}

impl<V, E> Observer<V, E> for SlotObserver<V, E>
where
    V: 'static,
    E: 'static,
{
    fn on_event(&self, event: &Event<V, E>) {
        if event.is_terminal() {
            self.slot.release();
        }
        self.downstream.on_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_without_queue_is_harmless() {
        let slot: Slot<u32, String> = Slot::new(Weak::new(), Lifetime::new());
        slot.release();
        slot.release();
        assert!(slot.is_released());
    }

    #[test]
    fn release_drops_the_lifetime_hook() {
        let lifetime = Lifetime::new();
        let slot: Arc<Slot<u32, String>> = Arc::new(Slot::new(Weak::new(), lifetime.clone()));
        slot.arm();
        assert_eq!(lifetime.hook_count(), 1);

        slot.release();
        assert_eq!(lifetime.hook_count(), 0);
        assert_eq!(Arc::strong_count(&slot), 1);
    }

    #[test]
    fn arming_on_an_ended_lifetime_releases_at_once() {
        let lifetime = Lifetime::new();
        lifetime.end();
        let slot: Arc<Slot<u32, String>> = Arc::new(Slot::new(Weak::new(), lifetime));
        slot.arm();
        assert!(slot.is_released());
    }
}
