//! # Queue configuration.
//!
//! Provides [`QueueConfig`], the settings shared by [`AdmissionQueue`](crate::AdmissionQueue)
//! and [`KeyedCoalescer`](crate::KeyedCoalescer).
//!
//! ## Field semantics
//! - `limit`: maximum number of tasks running at once (`>= 1`; `0` is rejected)
//! - `name`: label attached to every log record of the queue
//!
//! Validation happens once, at construction; submitting never fails.

use std::borrow::Cow;

use crate::error::ConfigError;

/// Configuration for an admission queue.
///
/// ## Example
/// ```rust
/// use taskgate::{AdmissionQueue, QueueConfig};
///
/// let cfg = QueueConfig::new(4).with_name("thumbnails");
/// let queue = AdmissionQueue::<u32, String>::from_config(cfg).unwrap();
/// assert_eq!(queue.limit(), 4);
/// assert_eq!(queue.name(), "thumbnails");
/// ```
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Maximum number of concurrently running tasks.
    ///
    /// `1` serializes every task.
    pub limit: usize,

    /// Label used in log records.
    pub name: Cow<'static, str>,
}

impl QueueConfig {
    /// Creates a configuration with the given limit and the default name.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Replaces the log label.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Checks the configuration.
    ///
    /// Returns [`ConfigError::ZeroLimit`] when `limit == 0`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    /// Default configuration:
    ///
    /// - `limit = 1` (strict serialization)
    /// - `name = "queue"`
    fn default() -> Self {
        Self {
            limit: 1,
            name: Cow::Borrowed("queue"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_serializes() {
        let cfg = QueueConfig::default();
        assert_eq!(cfg.limit, 1);
        assert_eq!(cfg.name, "queue");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_limit_rejected() {
        assert_eq!(QueueConfig::new(0).validate(), Err(ConfigError::ZeroLimit));
    }

    #[test]
    fn with_name_keeps_limit() {
        let cfg = QueueConfig::new(3).with_name("uploads");
        assert_eq!(cfg.limit, 3);
        assert_eq!(cfg.name, "uploads");
    }
}
