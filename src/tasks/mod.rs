//! # Task abstractions.
//!
//! This module provides the core task-related types:
//! - [`Task`] - trait for startable, cancelable units of work
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)
//! - [`TaskFn`] - function-backed task running on tokio
//! - [`Emitter`] - value sender handed to `TaskFn` bodies

mod task;
mod task_fn;

pub use task::{Task, TaskRef};
pub use task_fn::{Emitter, TaskFn};
