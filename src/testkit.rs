//! Hand-driven tasks and recording observers for unit tests.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::events::Event;
use crate::lifetime::Lifetime;
use crate::observers::{Observer, ObserverRef};
use crate::tasks::Task;

pub(crate) type TestEvent = Event<u32, String>;

/// Observer that stores everything it receives.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    events: Arc<Mutex<Vec<TestEvent>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observer(&self) -> ObserverRef<u32, String> {
        Arc::new(self.clone())
    }

    pub fn events(&self) -> Vec<TestEvent> {
        self.events.lock().clone()
    }
}

impl Observer<u32, String> for Recorder {
    fn on_event(&self, event: &TestEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Starts `task` with a fresh recorder and lifetime.
pub(crate) fn observe<T>(task: &T) -> (Recorder, Lifetime)
where
    T: Task<u32, String> + ?Sized,
{
    let rec = Recorder::new();
    let lifetime = Lifetime::new();
    task.start(rec.observer(), &lifetime);
    (rec, lifetime)
}

struct Run {
    name: &'static str,
    observer: ObserverRef<u32, String>,
    lifetime: Lifetime,
}

/// Records task starts and lets the test emit events on their behalf.
///
/// Emitting targets the most recent start of a given name.
#[derive(Default)]
pub(crate) struct Probe {
    runs: Mutex<Vec<Run>>,
    done: Mutex<HashSet<&'static str>>,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn task(self: &Arc<Self>, name: &'static str) -> ManualTask {
        ManualTask {
            probe: Arc::clone(self),
            name,
        }
    }

    /// Names of every start so far, in start order.
    pub fn started(&self) -> Vec<&'static str> {
        self.runs.lock().iter().map(|r| r.name).collect()
    }

    pub fn starts_of(&self, name: &str) -> usize {
        self.runs.lock().iter().filter(|r| r.name == name).count()
    }

    pub fn emit(&self, name: &str, event: TestEvent) {
        let (run_name, observer) = {
            let runs = self.runs.lock();
            let run = runs
                .iter()
                .rev()
                .find(|r| r.name == name)
                .unwrap_or_else(|| panic!("task {name} never started"));
            (run.name, Arc::clone(&run.observer))
        };
        if event.is_terminal() {
            self.done.lock().insert(run_name);
        }
        observer.on_event(&event);
    }

    pub fn complete(&self, name: &str) {
        self.emit(name, Event::Completed);
    }

    pub fn fail(&self, name: &str, error: &str) {
        self.emit(name, Event::Failed(error.to_string()));
    }

    /// Lifetime passed to the most recent start of `name`.
    pub fn lifetime(&self, name: &str) -> Lifetime {
        self.runs
            .lock()
            .iter()
            .rev()
            .find(|r| r.name == name)
            .map(|r| r.lifetime.clone())
            .unwrap_or_else(|| panic!("task {name} never started"))
    }

    pub fn is_done(&self, name: &str) -> bool {
        self.done.lock().contains(name)
    }
}

/// Task that does nothing on its own; the test drives it through its [`Probe`].
pub(crate) struct ManualTask {
    probe: Arc<Probe>,
    name: &'static str,
}

impl Task<u32, String> for ManualTask {
    fn start(&self, observer: ObserverRef<u32, String>, lifetime: &Lifetime) {
        self.probe.runs.lock().push(Run {
            name: self.name,
            observer,
            lifetime: lifetime.clone(),
        });
    }
}

/// Synchronous task emitting its value and completing inside `start`.
pub(crate) struct Immediate(pub u32);

impl Task<u32, String> for Immediate {
    fn start(&self, observer: ObserverRef<u32, String>, lifetime: &Lifetime) {
        if lifetime.is_ended() {
            return;
        }
        observer.on_event(&Event::Value(self.0));
        observer.on_event(&Event::Completed);
    }
}
