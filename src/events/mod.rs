//! Task events: data model and channel-backed streams.
//!
//! ## Contents
//! - [`Event`] the value/terminal event emitted by an execution
//! - [`EventStream`], [`channel`] an observer backed by a tokio channel, consumable as a `Stream`
//!
//! ## Quick reference
//! - **Producers**: task implementations (through the observer given to `Task::start`).
//! - **Consumers**: any [`Observer`](crate::Observer); `EventStream` for async callers.

mod event;
mod stream;

pub use event::Event;
pub use stream::{EventStream, channel};
