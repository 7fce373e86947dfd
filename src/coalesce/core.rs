use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::QueueConfig;
use crate::error::ConfigError;
use crate::events::Event;
use crate::lifetime::Lifetime;
use crate::observers::{Gated, Observer, ObserverRef};
use crate::queue::{AdmissionQueue, QueuedTask};
use crate::tasks::Task;

use super::registry::{Attach, Registry};

/// Key-based coalescing on top of an [`AdmissionQueue`].
///
/// While an execution for a key is in flight, further submissions under that key attach to it
/// instead of starting another one. Attached callers receive every event from their join point
/// on (no replay), including the terminal event. Distinct keys share the queue's global limit.
///
/// When the last attached caller cancels, the shared execution is cancelled too and the key is
/// freed.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use tokio_util::sync::CancellationToken;
/// use taskgate::{Emitter, EventStream, KeyedCoalescer, TaskError, TaskFn};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let runs = Arc::new(AtomicUsize::new(0));
/// let coalescer = KeyedCoalescer::<&str, u32, TaskError>::new(2).unwrap();
///
/// let fetch = {
///     let runs = Arc::clone(&runs);
///     TaskFn::new("fetch", move |out: Emitter<u32, TaskError>, _ctx: CancellationToken| {
///         let runs = Arc::clone(&runs);
///         async move {
///             runs.fetch_add(1, Ordering::SeqCst);
///             tokio::task::yield_now().await;
///             out.send(42);
///             Ok::<(), TaskError>(())
///         }
///     })
/// };
/// let handle = coalescer.submit(fetch, "avatar:7");
///
/// let (first, _l1) = EventStream::start(&handle);
/// let (second, _l2) = EventStream::start(&handle);
///
/// assert_eq!(first.result().await, Ok(vec![42]));
/// assert_eq!(second.result().await, Ok(vec![42]));
/// assert_eq!(runs.load(Ordering::SeqCst), 1);
/// # }
/// ```
pub struct KeyedCoalescer<K, V, E> {
    queue: AdmissionQueue<V, E>,
    registry: Arc<Registry<K, V, E>>,
}

impl<K, V, E> KeyedCoalescer<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: 'static,
    E: 'static,
{
    /// Creates a coalescer over its own queue with the given concurrency limit.
    pub fn new(limit: usize) -> Result<Self, ConfigError> {
        Ok(Self::with_queue(AdmissionQueue::new(limit)?))
    }

    /// Creates a coalescer over its own queue built from `cfg`.
    pub fn from_config(cfg: QueueConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_queue(AdmissionQueue::from_config(cfg)?))
    }

    /// Creates a coalescer sharing an existing queue (and its limit).
    pub fn with_queue(queue: AdmissionQueue<V, E>) -> Self {
        let registry = Arc::new(Registry::new(queue.name().to_owned().into()));
        Self { queue, registry }
    }

    /// Wraps `task` under `key`.
    ///
    /// Starting the returned handle either opens a new execution for `key` through the queue
    /// or attaches to the one already in flight.
    pub fn submit(&self, task: impl Task<V, E>, key: K) -> CoalescedTask<K, V, E> {
        CoalescedTask {
            queued: self.queue.submit(task),
            registry: Arc::clone(&self.registry),
            key,
        }
    }

    /// Wraps `task` without coalescing; it is only subject to the queue's limit.
    pub fn submit_unkeyed(&self, task: impl Task<V, E>) -> QueuedTask<V, E> {
        self.queue.submit(task)
    }

    /// Returns the underlying queue.
    pub fn queue(&self) -> &AdmissionQueue<V, E> {
        &self.queue
    }

    /// Returns the number of keys with an execution in flight.
    pub fn in_flight(&self) -> usize {
        self.registry.len()
    }

    /// Returns `true` if an execution for `key` is in flight.
    pub fn contains_key(&self, key: &K) -> bool {
        self.registry.contains(key)
    }

    /// Returns how many callers are attached to the execution for `key`.
    pub fn observers(&self, key: &K) -> usize {
        self.registry.observer_count(key)
    }
}

impl<K, V, E> Clone for KeyedCoalescer<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<K, V, E> fmt::Debug for KeyedCoalescer<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedCoalescer")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

/// Task-like handle returned by [`KeyedCoalescer::submit`].
pub struct CoalescedTask<K, V, E> {
    queued: QueuedTask<V, E>,
    registry: Arc<Registry<K, V, E>>,
    key: K,
}

impl<K, V, E> CoalescedTask<K, V, E> {
    /// Returns the coalescing key.
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K, V, E> Task<V, E> for CoalescedTask<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: 'static,
    E: 'static,
{
    fn start(&self, observer: ObserverRef<V, E>, lifetime: &Lifetime) {
        if lifetime.is_ended() {
            return;
        }

        let gated: ObserverRef<V, E> = Arc::new(Gated::new(observer, lifetime.clone()));
        let membership = match self.registry.attach(&self.key, gated) {
            Attach::Joined(membership) => membership,
            Attach::Leader {
                membership,
                execution,
            } => {
                let fan_out: ObserverRef<V, E> = Arc::new(FanOut {
                    registry: Arc::clone(&self.registry),
                    key: self.key.clone(),
                    generation: membership.generation,
                    delivery: Mutex::new(()),
                });
                self.queued.start(fan_out, &execution);
                membership
            }
        };

        let registry = Arc::downgrade(&self.registry);
        let key = self.key.clone();
        let hook = lifetime.on_end(move || {
            let Some(registry) = registry.upgrade() else {
                return;
            };
            if let Some(execution) = registry.detach(&key, membership) {
                execution.end();
            }
        });
        // The flight may already be over if the execution finished inside `start`.
        if !self.registry.arm(&self.key, membership, lifetime, hook) {
            lifetime.remove_hook(hook);
        }
    }
}

impl<K, V, E> Clone for CoalescedTask<K, V, E>
where
    K: Clone,
{
    fn clone(&self) -> Self {
        Self {
            queued: self.queued.clone(),
            registry: Arc::clone(&self.registry),
            key: self.key.clone(),
        }
    }
}

impl<K, V, E> fmt::Debug for CoalescedTask<K, V, E>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoalescedTask")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Sole observer of a flight's execution; broadcasts to everyone attached.
struct FanOut<K, V, E> {
    registry: Arc<Registry<K, V, E>>,
    key: K,
    generation: u64,
    // Held for a whole broadcast so every observer sees the same order.
    delivery: Mutex<()>,
}

impl<K, V, E> Observer<V, E> for FanOut<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: 'static,
    E: 'static,
{
    fn on_event(&self, event: &Event<V, E>) {
        let _delivery = self.delivery.lock();
        if !event.is_terminal() {
            for target in self.registry.observers_of(&self.key, self.generation) {
                target.on_event(event);
            }
            return;
        }

        let mut attached = self.registry.finish(&self.key, self.generation);
        for target in &mut attached {
            target.disarm();
        }
        for target in &attached {
            target.observer.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{Probe, Recorder, observe};

    fn coalescer(limit: usize) -> KeyedCoalescer<&'static str, u32, String> {
        KeyedCoalescer::new(limit).expect("valid limit")
    }

    #[test]
    fn zero_limit_fails_fast() {
        assert_eq!(
            KeyedCoalescer::<&str, u32, String>::new(0).err(),
            Some(ConfigError::ZeroLimit)
        );
    }

    #[test]
    fn same_key_runs_once_and_everyone_sees_the_same_events() {
        let c = coalescer(2);
        let probe = Probe::new();

        let callers: Vec<_> = (0..3)
            .map(|_| observe(&c.submit(probe.task("T"), "x")).0)
            .collect();

        assert_eq!(probe.started(), vec!["T"]);
        assert_eq!(c.queue().running(), 1);
        assert_eq!(c.observers(&"x"), 3);

        probe.emit("T", Event::Value(1));
        probe.emit("T", Event::Value(2));
        probe.complete("T");

        let expected = vec![Event::Value(1), Event::Value(2), Event::Completed];
        for rec in &callers {
            assert_eq!(rec.events(), expected);
        }
        assert_eq!(probe.starts_of("T"), 1);
        assert_eq!(c.in_flight(), 0);
        assert_eq!(c.queue().running(), 0);
    }

    #[test]
    fn late_joiner_gets_no_replay_but_gets_terminal() {
        let c = coalescer(1);
        let probe = Probe::new();

        let (early, _) = observe(&c.submit(probe.task("T"), "x"));
        probe.emit("T", Event::Value(1));

        let (late, _) = observe(&c.submit(probe.task("T"), "x"));
        probe.emit("T", Event::Value(2));
        probe.fail("T", "gone");

        let failed = Event::Failed("gone".to_string());
        assert_eq!(early.events(), vec![Event::Value(1), Event::Value(2), failed.clone()]);
        assert_eq!(late.events(), vec![Event::Value(2), failed]);
    }

    #[test]
    fn key_is_fresh_after_termination() {
        let c = coalescer(1);
        let probe = Probe::new();

        let (first, _) = observe(&c.submit(probe.task("T"), "x"));
        probe.complete("T");
        assert!(!c.contains_key(&"x"));

        let (second, _) = observe(&c.submit(probe.task("T"), "x"));
        assert_eq!(probe.starts_of("T"), 2);
        probe.emit("T", Event::Value(9));
        probe.complete("T");

        assert_eq!(first.events(), vec![Event::Completed]);
        assert_eq!(second.events(), vec![Event::Value(9), Event::Completed]);
    }

    #[test]
    fn distinct_keys_share_the_global_limit() {
        let c = coalescer(1);
        let probe = Probe::new();

        let (_x, _) = observe(&c.submit(probe.task("X"), "x"));
        let (y, _) = observe(&c.submit(probe.task("Y"), "y"));
        let (y2, _) = observe(&c.submit(probe.task("Y"), "y"));

        assert_eq!(probe.started(), vec!["X"]);
        assert_eq!(c.in_flight(), 2);
        assert_eq!(c.queue().pending(), 1);

        probe.complete("X");
        assert_eq!(probe.started(), vec!["X", "Y"]);
        probe.complete("Y");
        assert_eq!(y.events(), vec![Event::Completed]);
        assert_eq!(y2.events(), vec![Event::Completed]);
        assert_eq!(probe.starts_of("Y"), 1);
    }

    #[test]
    fn joiner_attached_while_waiting_receives_everything() {
        let c = coalescer(1);
        let probe = Probe::new();

        let (_blocker, _) = observe(&c.submit(probe.task("B"), "blocker"));
        let (a, _) = observe(&c.submit(probe.task("T"), "x"));
        let (b, _) = observe(&c.submit(probe.task("T"), "x"));
        assert!(probe.started().iter().all(|n| *n != "T"));

        probe.complete("B");
        probe.emit("T", Event::Value(5));
        probe.complete("T");

        assert_eq!(a.events(), vec![Event::Value(5), Event::Completed]);
        assert_eq!(b.events(), a.events());
    }

    #[test]
    fn cancelling_one_caller_leaves_the_others_alone() {
        let c = coalescer(1);
        let probe = Probe::new();

        let (lead, lead_life) = observe(&c.submit(probe.task("T"), "x"));
        let (other, _) = observe(&c.submit(probe.task("T"), "x"));

        probe.emit("T", Event::Value(1));
        lead_life.end();
        assert_eq!(c.observers(&"x"), 1);
        assert!(!probe.lifetime("T").is_ended());

        probe.emit("T", Event::Value(2));
        probe.complete("T");

        assert_eq!(lead.events(), vec![Event::Value(1)]);
        assert_eq!(other.events(), vec![Event::Value(1), Event::Value(2), Event::Completed]);
    }

    #[test]
    fn last_caller_leaving_cancels_the_execution() {
        let c = coalescer(1);
        let probe = Probe::new();

        let (_a, a_life) = observe(&c.submit(probe.task("T"), "x"));
        let (_b, b_life) = observe(&c.submit(probe.task("T"), "x"));
        let (_w, _) = observe(&c.submit(probe.task("W"), "w"));
        assert_eq!(probe.started(), vec!["T"]);

        a_life.end();
        b_life.end();

        assert!(probe.lifetime("T").is_ended());
        assert!(!c.contains_key(&"x"));
        assert_eq!(probe.started(), vec!["T", "W"]);
        assert_eq!(c.queue().running(), 1);

        let (_again, _) = observe(&c.submit(probe.task("T"), "x"));
        assert_eq!(c.queue().pending(), 1);
    }

    #[test]
    fn abandoned_waiting_flight_leaves_the_wait_list() {
        let c = coalescer(1);
        let probe = Probe::new();

        let (_blocker, _) = observe(&c.submit(probe.task("B"), "blocker"));
        let (_a, a_life) = observe(&c.submit(probe.task("T"), "x"));
        assert_eq!(c.queue().pending(), 1);

        a_life.end();
        assert_eq!(c.queue().pending(), 0);
        assert!(!c.contains_key(&"x"));

        probe.complete("B");
        assert_eq!(probe.started(), vec!["B"]);
        assert_eq!(c.queue().running(), 0);
    }

    #[test]
    fn key_is_gone_before_terminal_delivery() {
        let c = coalescer(1);
        let probe = Probe::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let handle = c.submit(probe.task("T"), "x");
        let observer = {
            let c = c.clone();
            let seen = Arc::clone(&seen);
            crate::observers::ObserverFn::arc(move |ev: &Event<u32, String>| {
                if ev.is_terminal() {
                    seen.lock().push(c.contains_key(&"x"));
                }
            })
        };
        handle.start(observer, &Lifetime::new());

        probe.complete("T");
        assert_eq!(*seen.lock(), vec![false]);
    }

    #[test]
    fn resubmitting_from_the_terminal_callback_starts_fresh() {
        let c = coalescer(1);
        let probe = Probe::new();
        let handle = c.submit(probe.task("T"), "x");
        let follow_up = Recorder::new();

        let observer = {
            let handle = handle.clone();
            let follow_up = follow_up.clone();
            crate::observers::ObserverFn::arc(move |ev: &Event<u32, String>| {
                if ev.is_terminal() {
                    handle.start(follow_up.observer(), &Lifetime::new());
                }
            })
        };
        handle.start(observer, &Lifetime::new());

        probe.complete("T");
        assert_eq!(probe.starts_of("T"), 2);
        assert_eq!(c.observers(&"x"), 1);

        probe.complete("T");
        assert_eq!(follow_up.events(), vec![Event::Completed]);
    }

    #[test]
    fn coalescers_sharing_a_queue_share_its_limit() {
        let queue = AdmissionQueue::<u32, String>::new(1).expect("valid limit");
        let left = KeyedCoalescer::<&str, u32, String>::with_queue(queue.clone());
        let right = KeyedCoalescer::<&str, u32, String>::with_queue(queue.clone());
        let probe = Probe::new();

        let (_l, _) = observe(&left.submit(probe.task("L"), "k"));
        let (_r, _) = observe(&right.submit(probe.task("R"), "k"));

        assert_eq!(probe.started(), vec!["L"]);
        assert_eq!(queue.pending(), 1);
        assert!(left.contains_key(&"k") && right.contains_key(&"k"));

        probe.complete("L");
        assert_eq!(probe.started(), vec!["L", "R"]);
    }

    #[test]
    fn coalesced_handle_can_sit_behind_another_queue() {
        let c = coalescer(4);
        let outer = AdmissionQueue::<u32, String>::new(1).expect("valid limit");
        let probe = Probe::new();
        let handle = outer.submit(c.submit(probe.task("T"), "x"));

        let (a, _) = observe(&handle);
        let (b, _) = observe(&handle);
        assert_eq!(probe.starts_of("T"), 1);
        assert_eq!(outer.pending(), 1);

        // `b` is admitted by the outer queue only after the key was released.
        probe.complete("T");
        assert_eq!(a.events(), vec![Event::Completed]);
        assert_eq!(probe.starts_of("T"), 2);

        probe.complete("T");
        assert_eq!(b.events(), vec![Event::Completed]);
    }

    #[test]
    fn shared_caller_lifetime_keeps_no_hooks_once_flights_end() {
        let c = coalescer(1);
        let probe = Probe::new();
        let shared = Lifetime::new();

        let handle = c.submit(probe.task("T"), "x");
        handle.start(Recorder::new().observer(), &shared);
        handle.start(Recorder::new().observer(), &shared);
        assert_eq!(shared.hook_count(), 2);

        probe.complete("T");
        assert_eq!(shared.hook_count(), 0);

        let sync = c.submit(crate::testkit::Immediate(3), "y");
        for _ in 0..100 {
            sync.start(Recorder::new().observer(), &shared);
        }
        assert_eq!(shared.hook_count(), 0);
        assert_eq!(c.in_flight(), 0);
        assert!(!shared.is_ended());
    }

    #[test]
    fn unkeyed_submissions_bypass_coalescing() {
        let c = coalescer(2);
        let probe = Probe::new();

        let _ = observe(&c.submit_unkeyed(probe.task("U")));
        let _ = observe(&c.submit_unkeyed(probe.task("U")));

        assert_eq!(probe.starts_of("U"), 2);
        assert_eq!(c.in_flight(), 0);
    }
}
