//! # Key-based coalescing
//!
//! [`KeyedCoalescer`] deduplicates concurrent work by key on top of an
//! [`AdmissionQueue`](crate::AdmissionQueue).
//!
//! ```text
//! CoalescedTask::start(observer, lifetime)
//!     ├─ key in flight ─► attach observer (sees events from now on, no replay)
//!     └─ key idle      ─► open flight ─► QueuedTask::start(fan-out, flight lifetime)
//!
//! event from the execution ─► fan-out ─► every attached observer, same order
//! terminal event           ─► key removed ─► terminal fanned out ─► next start opens a new flight
//!
//! caller lifetime ends ─► observer detached
//!     └─ it was the last one ─► flight lifetime ends (execution cancelled, slot freed, key removed)
//! ```
//!
//! Coalescing is per coalescer instance; two coalescers sharing one queue share its limit but not
//! their keys.

mod core;
mod registry;

pub use self::core::{CoalescedTask, KeyedCoalescer};
