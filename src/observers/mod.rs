//! # Event observers.
//!
//! This module provides the [`Observer`] trait, the closure adapter [`ObserverFn`], and
//! (with the `logging` feature) the tracing observer `LogObserver`.
//!
//! ## Observer types
//! - **Caller observers** - receive one submission's events (closures, channels)
//! - **Internal observers** - slot release and key fan-out wrap the caller's observer

mod gate;
#[cfg(feature = "logging")]
mod log;
mod observer;

pub(crate) use gate::Gated;
#[cfg(feature = "logging")]
pub use log::LogObserver;
pub use observer::{Observer, ObserverFn, ObserverRef};
