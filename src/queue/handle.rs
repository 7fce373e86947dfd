use std::fmt;
use std::sync::Arc;

use crate::lifetime::Lifetime;
use crate::observers::ObserverRef;
use crate::tasks::{Task, TaskRef};

use super::core::Shared;

/// Task-like handle returned by [`AdmissionQueue::submit`](crate::AdmissionQueue::submit).
///
/// Each [`start`](Task::start) is one submission: the wrapped task runs immediately if a slot is
/// free, otherwise once every earlier waiter has been admitted. Events reach the observer only
/// after the wrapped task has actually started.
pub struct QueuedTask<V, E> {
    queue: Arc<Shared<V, E>>,
    task: TaskRef<V, E>,
}

impl<V, E> QueuedTask<V, E> {
    pub(super) fn new(queue: Arc<Shared<V, E>>, task: TaskRef<V, E>) -> Self {
        Self { queue, task }
    }
}

impl<V, E> Task<V, E> for QueuedTask<V, E>
where
    V: 'static,
    E: 'static,
{
    fn start(&self, observer: ObserverRef<V, E>, lifetime: &Lifetime) {
        if lifetime.is_ended() {
            return;
        }
        self.queue
            .enqueue(Arc::clone(&self.task), observer, lifetime.clone());
    }
}

impl<V, E> Clone for QueuedTask<V, E> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            task: Arc::clone(&self.task),
        }
    }
}

impl<V, E> fmt::Debug for QueuedTask<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedTask").finish_non_exhaustive()
    }
}
