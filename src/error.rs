//! Error types used by taskgate.
//!
//! - [`ConfigError`] - invalid construction parameters; raised eagerly by constructors.
//! - [`TaskError`] - ready-made failure type for task bodies (any `E` works as well).
//! - [`StreamError`] - outcome of [`EventStream::result`](crate::EventStream::result) when no value list can be produced.
//!
//! Task failures are never produced by the scheduler itself: an [`Event::Failed`](crate::Event::Failed)
//! always carries the task's own error, forwarded untouched.

use thiserror::Error;

/// # Invalid queue configuration.
///
/// Returned by [`AdmissionQueue::new`](crate::AdmissionQueue::new) and friends; never at submission time.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Concurrency limit must allow at least one running task.
    #[error("concurrency limit must be at least 1")]
    ZeroLimit,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskgate::ConfigError;
    ///
    /// assert_eq!(ConfigError::ZeroLimit.as_label(), "config_zero_limit");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::ZeroLimit => "config_zero_limit",
        }
    }
}

/// # Errors produced by task bodies.
///
/// A convenience failure type for [`TaskFn`](crate::TaskFn) closures.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Task execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Task gave up because its lifetime ended.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Builds a [`TaskError::Fail`] from anything printable.
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskgate::TaskError;
    ///
    /// assert_eq!(TaskError::fail("boom").as_label(), "task_failed");
    /// assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Canceled => "context cancelled".to_string(),
        }
    }
}

/// # Why an event stream produced no value list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError<E> {
    /// The execution terminated with [`Event::Failed`](crate::Event::Failed).
    #[error("task failed")]
    Failed(E),

    /// The stream closed before any terminal event (its lifetime ended).
    #[error("stream closed before a terminal event")]
    Closed,
}

impl<E> StreamError<E> {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StreamError::Failed(_) => "stream_failed",
            StreamError::Closed => "stream_closed",
        }
    }

    /// Returns the task's failure, if that is why the stream ended.
    pub fn into_failure(self) -> Option<E> {
        match self {
            StreamError::Failed(e) => Some(e),
            StreamError::Closed => None,
        }
    }
}
