//! # Bounded-concurrency admission
//!
//! [`AdmissionQueue`] lets at most `limit` executions run at once.
//! Submissions beyond the limit wait in a FIFO list and are admitted one per freed slot.
//!
//! ## Lifecycle
//! ```text
//! QueuedTask::start(observer, lifetime)
//!     ├─ running < limit ─► running += 1 ─► task.start(slot observer)
//!     └─ otherwise       ─► wait list (withdrawn if lifetime ends first)
//!
//! terminal event | lifetime end  (first one wins, once)
//!     └─► running -= 1 ─► pop oldest live waiter ─► running += 1 ─► task.start(..)
//! ```
//!
//! ## Invariants
//! - `0 <= running <= limit` at all times.
//! - Waiters are admitted strictly in submission order.
//! - A slot is freed exactly once per admitted execution.
//! - All bookkeeping happens under one lock; tasks and observers run outside it.
//! - A start triggered from inside another start on the same thread runs once that one returns,
//!   so long chains of synchronous tasks drain in a loop.
//! - Hooks placed on a caller's lifetime are removed again once admission or the slot is done
//!   with them.

mod core;
mod drain;
mod handle;
mod pending;
mod slot;

pub use self::core::{AdmissionQueue, QueueSnapshot};
pub use handle::QueuedTask;
