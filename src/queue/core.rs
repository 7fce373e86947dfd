use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::config::QueueConfig;
use crate::error::ConfigError;
use crate::lifetime::Lifetime;
use crate::observers::{Gated, ObserverRef};
use crate::tasks::{Task, TaskRef};

use super::drain::start_serialized;
use super::handle::QueuedTask;
use super::pending::PendingItem;
use super::slot::{Slot, SlotObserver};

/// Point-in-time view of a queue's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSnapshot {
    /// Configured concurrency limit.
    pub limit: usize,
    /// Executions currently holding a slot.
    pub running: usize,
    /// Started submissions waiting for a slot.
    pub pending: usize,
}

/// Bounded-concurrency admission queue.
///
/// At most `limit` executions run at once; further submissions wait in FIFO order and the oldest
/// one is admitted as soon as a slot frees. Cloning yields another handle to the same queue.
///
/// ## Example
/// ```rust
/// use taskgate::{AdmissionQueue, Event, Lifetime, ObserverRef, Task};
///
/// struct Noop;
/// impl Task<(), ()> for Noop {
///     fn start(&self, _observer: ObserverRef<(), ()>, _lifetime: &Lifetime) {}
/// }
///
/// let queue = AdmissionQueue::<(), ()>::new(1).unwrap();
/// let a = queue.submit(Noop);
/// let b = queue.submit(Noop);
///
/// let sink: ObserverRef<(), ()> = taskgate::ObserverFn::arc(|_: &Event<(), ()>| {});
/// a.start(sink.clone(), &Lifetime::new());
/// b.start(sink, &Lifetime::new());
///
/// assert_eq!(queue.running(), 1);
/// assert_eq!(queue.pending(), 1);
/// ```
pub struct AdmissionQueue<V, E> {
    shared: Arc<Shared<V, E>>,
}

pub(super) struct Shared<V, E> {
    name: Cow<'static, str>,
    limit: usize,
    next_id: AtomicU64,
    state: Mutex<State<V, E>>,
}

struct State<V, E> {
    running: usize,
    waiting: VecDeque<PendingItem<V, E>>,
}

impl<V, E> AdmissionQueue<V, E>
where
    V: 'static,
    E: 'static,
{
    /// Creates a queue allowing `limit` concurrent executions.
    ///
    /// Returns [`ConfigError::ZeroLimit`] when `limit == 0`.
    pub fn new(limit: usize) -> Result<Self, ConfigError> {
        Self::from_config(QueueConfig::new(limit))
    }

    /// Creates a queue from a full configuration.
    pub fn from_config(cfg: QueueConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                name: cfg.name,
                limit: cfg.limit,
                next_id: AtomicU64::new(0),
                state: Mutex::new(State {
                    running: 0,
                    waiting: VecDeque::new(),
                }),
            }),
        })
    }

    /// Wraps `task` so that every start of the returned handle goes through this queue.
    ///
    /// Nothing is scheduled until the handle is started.
    pub fn submit(&self, task: impl Task<V, E>) -> QueuedTask<V, E> {
        let task: TaskRef<V, E> = Arc::new(task);
        QueuedTask::new(Arc::clone(&self.shared), task)
    }

    /// Returns the label used in log records.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Returns the configured concurrency limit.
    pub fn limit(&self) -> usize {
        self.shared.limit
    }

    /// Returns the number of executions holding a slot.
    pub fn running(&self) -> usize {
        self.shared.state.lock().running
    }

    /// Returns the number of submissions waiting for a slot.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().waiting.len()
    }

    /// Reads running and pending counts under one lock.
    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.shared.state.lock();
        QueueSnapshot {
            limit: self.shared.limit,
            running: state.running,
            pending: state.waiting.len(),
        }
    }
}

impl<V, E> Clone for AdmissionQueue<V, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V, E> fmt::Debug for AdmissionQueue<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("AdmissionQueue")
            .field("name", &self.shared.name)
            .field("limit", &self.shared.limit)
            .field("running", &state.running)
            .field("pending", &state.waiting.len())
            .finish()
    }
}

impl<V, E> Shared<V, E>
where
    V: 'static,
    E: 'static,
{
    /// Starts the submission now if a slot is free, otherwise appends it to the wait list.
    pub(super) fn enqueue(
        self: &Arc<Self>,
        task: TaskRef<V, E>,
        observer: ObserverRef<V, E>,
        lifetime: Lifetime,
    ) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::downgrade(self);
        let withdraw_hook = lifetime.on_end(move || {
            if let Some(queue) = queue.upgrade() {
                queue.withdraw(id);
            }
        });
        if lifetime.is_ended() {
            return;
        }

        let item = PendingItem {
            id,
            task,
            observer,
            lifetime,
            withdraw_hook,
        };
        let admitted = {
            let mut state = self.state.lock();
            if state.running < self.limit {
                state.running += 1;
                debug!(queue = %self.name, running = state.running, pending = state.waiting.len(), "task admitted");
                Some(item)
            } else {
                state.waiting.push_back(item);
                debug!(queue = %self.name, running = state.running, pending = state.waiting.len(), "task queued");
                None
            }
        };

        if let Some(item) = admitted {
            self.run(item);
        }
    }

    /// Starts an item whose slot has already been counted.
    fn run(self: &Arc<Self>, item: PendingItem<V, E>) {
        let PendingItem {
            task,
            observer,
            lifetime,
            withdraw_hook,
            ..
        } = item;
        lifetime.remove_hook(withdraw_hook);

        let slot = Arc::new(Slot::new(Arc::downgrade(self), lifetime.clone()));
        slot.arm();
        if lifetime.is_ended() {
            return;
        }

        let observer = Arc::new(SlotObserver::new(
            slot,
            Gated::new(observer, lifetime.clone()),
        ));
        start_serialized(move || {
            if !lifetime.is_ended() {
                task.start(observer, &lifetime);
            }
        });
    }

    /// Frees one slot and admits the oldest live waiter, if any.
    pub(super) fn release_slot(self: &Arc<Self>) {
        let mut discarded = Vec::new();
        let next = {
            let mut state = self.state.lock();
            debug_assert!(state.running > 0, "slot released with nothing running");
            state.running -= 1;

            let next = loop {
                match state.waiting.pop_front() {
                    Some(item) if item.lifetime.is_ended() => discarded.push(item),
                    other => break other,
                }
            };
            if next.is_some() {
                state.running += 1;
            }
            debug!(queue = %self.name, running = state.running, pending = state.waiting.len(), admitted = next.is_some(), "slot released");
            next
        };
        drop(discarded);

        if let Some(item) = next {
            self.run(item);
        }
    }

    /// Removes a waiting item whose lifetime ended before admission.
    fn withdraw(&self, id: u64) {
        let removed = {
            let mut state = self.state.lock();
            let removed = state
                .waiting
                .iter()
                .position(|item| item.id == id)
                .and_then(|pos| state.waiting.remove(pos));
            if removed.is_some() {
                debug!(queue = %self.name, running = state.running, pending = state.waiting.len(), "task withdrawn");
            }
            removed
        };
        drop(removed);
    }
}
