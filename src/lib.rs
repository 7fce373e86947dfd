//! # taskgate
//!
//! **Taskgate** schedules event-emitting tasks under a global concurrency limit and
//! deduplicates concurrent work by key.
//!
//! A task is started with an observer and a [`Lifetime`]; it reports zero or more values and
//! exactly one terminal event. Taskgate never looks inside tasks: it only decides *when* they
//! start and *who* hears about them.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     caller A            caller B            caller C
//!   submit(t, "x")      submit(t, "x")      submit(u, "y")
//!        │                   │                   │
//!        ▼                   ▼                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  KeyedCoalescer                                                   │
//! │  - Registry (key ─► in-flight execution + attached observers)     │
//! │  - FanOut   (one execution ─► every attached observer)            │
//! └──────┬────────────────────────────────────────────┬───────────────┘
//!        │ "x": first start only                      │ "y"
//!        ▼                                            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  AdmissionQueue (limit N)                                         │
//! │  - running <= N                                                   │
//! │  - FIFO wait list, withdrawn when a waiter's lifetime ends        │
//! │  - slot freed once: terminal event or lifetime end                │
//! └──────┬────────────────────────────────────────────┬───────────────┘
//!        ▼                                            ▼
//!   Task::start(slot observer, lifetime)      Task::start(...)
//! ```
//!
//! ### Lifecycle
//! ```text
//! CoalescedTask::start(observer, lifetime)
//!   ├─► key in flight? ─► attach observer, done
//!   └─► open flight ─► QueuedTask::start(fan-out, flight lifetime)
//!                         ├─ slot free ─► task starts
//!                         └─ otherwise ─► wait (FIFO)
//!
//! Value(v)            ─► fan-out ─► all attached observers
//! Completed | Failed  ─► slot freed ─► key removed ─► fan-out ─► next waiter admitted
//! caller lifetime end ─► observer detached ─► last one? ─► flight lifetime ends
//! ```
//!
//! ## Features
//! | Area              | Description                                                      | Key types / traits                          |
//! |-------------------|------------------------------------------------------------------|---------------------------------------------|
//! | **Admission**     | Bounded FIFO concurrency for any task.                           | [`AdmissionQueue`], [`QueuedTask`]          |
//! | **Coalescing**    | One execution per key, fanned out to every attached caller.      | [`KeyedCoalescer`], [`CoalescedTask`]       |
//! | **Tasks**         | Task contract and a closure adapter running on tokio.            | [`Task`], [`TaskRef`], [`TaskFn`]           |
//! | **Observers**     | Event sinks, closures and async streams.                         | [`Observer`], [`ObserverFn`], [`EventStream`] |
//! | **Cancellation**  | Shared cancellation scope with end hooks.                        | [`Lifetime`]                                |
//! | **Errors**        | Typed configuration and task errors.                             | [`ConfigError`], [`TaskError`]              |
//! | **Configuration** | Limit and log label of a queue.                                  | [`QueueConfig`]                             |
//!
//! ## Optional features
//! - `logging`: exports [`LogObserver`], an observer that records events through `tracing`.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use taskgate::{AdmissionQueue, Emitter, EventStream, TaskError, TaskFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let queue = AdmissionQueue::<String, TaskError>::new(2)?;
//!
//!     let greet = queue.submit(TaskFn::new(
//!         "greet",
//!         |out: Emitter<String, TaskError>, ctx: CancellationToken| async move {
//!             if ctx.is_cancelled() {
//!                 return Err(TaskError::Canceled);
//!             }
//!             out.send("hello".to_string());
//!             Ok(())
//!         },
//!     ));
//!
//!     let (events, _lifetime) = EventStream::start(&greet);
//!     assert_eq!(events.result().await?, vec!["hello".to_string()]);
//!     Ok(())
//! }
//! ```
mod coalesce;
mod config;
mod error;
mod events;
mod lifetime;
mod observers;
mod queue;
mod tasks;

#[cfg(test)]
mod testkit;

// ---- Public re-exports ----

pub use coalesce::{CoalescedTask, KeyedCoalescer};
pub use config::QueueConfig;
pub use error::{ConfigError, StreamError, TaskError};
pub use events::{Event, EventStream, channel};
pub use lifetime::{HookId, Lifetime};
pub use observers::{Observer, ObserverFn, ObserverRef};
pub use queue::{AdmissionQueue, QueueSnapshot, QueuedTask};
pub use tasks::{Emitter, Task, TaskFn, TaskRef};

// Optional: expose a tracing-backed observer.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogObserver;
