//! # Events produced by a task execution.
//!
//! An execution emits zero or more [`Event::Value`]s followed by exactly one terminal event:
//! - [`Event::Completed`] - finished successfully;
//! - [`Event::Failed`] - finished with the task's own error.
//!
//! Nothing is delivered after the terminal event.
//!
//! ## Example
//! ```rust
//! use taskgate::Event;
//!
//! let ev: Event<u32, String> = Event::Value(7);
//! assert!(!ev.is_terminal());
//! assert_eq!(ev.value(), Some(&7));
//!
//! let done: Event<u32, String> = Event::from_result(Err("boom".to_string()));
//! assert!(done.is_terminal());
//! assert_eq!(done.as_label(), "failed");
//! ```

/// One item of an execution's event sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event<V, E> {
    /// Intermediate value; may recur.
    Value(V),

    /// Successful end of the execution (terminal).
    Completed,

    /// Failed end of the execution (terminal), carrying the task's error verbatim.
    Failed(E),
}

impl<V, E> Event<V, E> {
    /// Converts a task body's result into its terminal event.
    #[inline]
    pub fn from_result(res: Result<(), E>) -> Self {
        match res {
            Ok(()) => Event::Completed,
            Err(e) => Event::Failed(e),
        }
    }

    /// Returns `true` for [`Event::Completed`] and [`Event::Failed`].
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Completed | Event::Failed(_))
    }

    /// Returns the carried value, if any.
    #[inline]
    pub fn value(&self) -> Option<&V> {
        match self {
            Event::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the carried failure, if any.
    #[inline]
    pub fn error(&self) -> Option<&E> {
        match self {
            Event::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Event::Value(_) => "value",
            Event::Completed => "completed",
            Event::Failed(_) => "failed",
        }
    }
}
