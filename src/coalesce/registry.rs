//! # Key registry - in-flight executions by key.
//!
//! Each entry is a *flight*: the single execution currently admitted (or waiting) for a key,
//! plus the observers attached to it.
//!
//! ## Rules
//! - A key is present iff an execution for it is in flight.
//! - Every flight gets a fresh generation; stale callbacks of a finished flight never touch a newer one.
//! - The entry is removed under the lock *before* the terminal event is delivered.
//! - The last observer leaving removes the entry and hands back the execution's lifetime to end.
//! - Each observer may carry the detach hook placed on its caller's lifetime; finishing a flight
//!   hands those hooks back so they can be removed.

use std::borrow::Cow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::lifetime::{HookId, Lifetime};
use crate::observers::ObserverRef;

/// Position of one caller within one flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Membership {
    pub generation: u64,
    pub member: u64,
}

/// Outcome of [`Registry::attach`].
pub(super) enum Attach {
    /// Joined an execution already in flight.
    Joined(Membership),
    /// Opened a new flight; the caller must start the execution under `execution`.
    Leader {
        membership: Membership,
        execution: Lifetime,
    },
}

pub(super) struct Attached<V, E> {
    member: u64,
    pub observer: ObserverRef<V, E>,
    hook: Option<(Lifetime, HookId)>,
}

impl<V, E> Attached<V, E> {
    /// Removes the caller's detach hook, if one was armed.
    pub fn disarm(&mut self) {
        if let Some((lifetime, hook)) = self.hook.take() {
            lifetime.remove_hook(hook);
        }
    }
}

struct Flight<V, E> {
    generation: u64,
    execution: Lifetime,
    observers: Vec<Attached<V, E>>,
    next_member: u64,
}

struct State<K, V, E> {
    flights: HashMap<K, Flight<V, E>>,
    next_generation: u64,
}

pub(super) struct Registry<K, V, E> {
    name: Cow<'static, str>,
    state: Mutex<State<K, V, E>>,
}

impl<K, V, E> Registry<K, V, E>
where
    K: Eq + Hash + Clone,
{
    pub fn new(name: Cow<'static, str>) -> Self {
        Self {
            name,
            state: Mutex::new(State {
                flights: HashMap::new(),
                next_generation: 0,
            }),
        }
    }

    /// Joins the flight for `key`, or opens one if none is in flight.
    pub fn attach(&self, key: &K, observer: ObserverRef<V, E>) -> Attach {
        let mut state = self.state.lock();

        if let Some(flight) = state.flights.get_mut(key) {
            let member = flight.next_member;
            flight.next_member += 1;
            flight.observers.push(Attached {
                member,
                observer,
                hook: None,
            });
            debug!(queue = %self.name, generation = flight.generation, observers = flight.observers.len(), "joined in-flight execution");
            return Attach::Joined(Membership {
                generation: flight.generation,
                member,
            });
        }

        let generation = state.next_generation;
        state.next_generation += 1;
        let execution = Lifetime::new();
        state.flights.insert(
            key.clone(),
            Flight {
                generation,
                execution: execution.clone(),
                observers: vec![Attached {
                    member: 0,
                    observer,
                    hook: None,
                }],
                next_member: 1,
            },
        );
        debug!(queue = %self.name, generation, in_flight = state.flights.len(), "flight opened");

        Attach::Leader {
            membership: Membership {
                generation,
                member: 0,
            },
            execution,
        }
    }

    /// Removes one observer; returns the execution lifetime if it was the last one.
    pub fn detach(&self, key: &K, membership: Membership) -> Option<Lifetime> {
        let mut state = self.state.lock();

        let flight = state
            .flights
            .get_mut(key)
            .filter(|f| f.generation == membership.generation)?;
        flight.observers.retain(|a| a.member != membership.member);
        if !flight.observers.is_empty() {
            return None;
        }

        let flight = state.flights.remove(key)?;
        debug!(queue = %self.name, generation = flight.generation, in_flight = state.flights.len(), "flight abandoned");
        Some(flight.execution)
    }

    /// Records the detach hook of an attached observer.
    ///
    /// Returns `false` if the observer is no longer attached; the caller then removes the hook
    /// itself.
    pub fn arm(&self, key: &K, membership: Membership, lifetime: &Lifetime, hook: HookId) -> bool {
        let mut state = self.state.lock();
        let attached = state
            .flights
            .get_mut(key)
            .filter(|f| f.generation == membership.generation)
            .and_then(|f| f.observers.iter_mut().find(|a| a.member == membership.member));
        match attached {
            Some(attached) => {
                attached.hook = Some((lifetime.clone(), hook));
                true
            }
            None => false,
        }
    }

    /// Returns the observers currently attached to the given flight.
    pub fn observers_of(&self, key: &K, generation: u64) -> Vec<ObserverRef<V, E>> {
        let state = self.state.lock();
        match state.flights.get(key) {
            Some(flight) if flight.generation == generation => flight
                .observers
                .iter()
                .map(|a| Arc::clone(&a.observer))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Removes the given flight and returns its observers for final delivery.
    pub fn finish(&self, key: &K, generation: u64) -> Vec<Attached<V, E>> {
        let mut state = self.state.lock();
        if state.flights.get(key).map(|f| f.generation) != Some(generation) {
            return Vec::new();
        }
        let Some(flight) = state.flights.remove(key) else {
            return Vec::new();
        };
        debug!(queue = %self.name, generation, in_flight = state.flights.len(), "flight finished");
        flight.observers
    }

    pub fn len(&self) -> usize {
        self.state.lock().flights.len()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.state.lock().flights.contains_key(key)
    }

    pub fn observer_count(&self, key: &K) -> usize {
        self.state
            .lock()
            .flights
            .get(key)
            .map_or(0, |f| f.observers.len())
    }
}
