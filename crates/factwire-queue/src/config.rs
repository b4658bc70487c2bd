//! Configuration for the queue worker

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the queue worker
///
/// # Examples
///
/// ```
/// use factwire_queue::QueueConfig;
///
/// let config = QueueConfig::default();
/// assert_eq!(config.batch_size, 4);
///
/// let config = QueueConfig::aggressive();
/// assert_eq!(config.requeue_failed_below, Some(3));
///
/// let config = QueueConfig::lenient();
/// assert_eq!(config.requeue_failed_below, None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// How often the worker polls for queued entries (in milliseconds)
    /// Default: 5000
    pub poll_interval_ms: u64,

    /// Maximum entries taken per cycle
    /// Default: 4
    pub batch_size: usize,

    /// Requeue failed entries whose attempt count is below this limit
    /// at the start of each cycle. `None` leaves failures alone.
    pub requeue_failed_below: Option<u32>,

    /// Priority given to documents enqueued without one
    pub default_priority: i32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            batch_size: 4,
            requeue_failed_below: None,
            default_priority: 0,
        }
    }
}

impl QueueConfig {
    /// Frequent polling, larger batches, automatic requeue of failures
    pub fn aggressive() -> Self {
        Self {
            poll_interval_ms: 1_000,
            batch_size: 16,
            requeue_failed_below: Some(3),
            default_priority: 0,
        }
    }

    /// Infrequent polling, one document at a time
    pub fn lenient() -> Self {
        Self {
            poll_interval_ms: 30_000,
            batch_size: 1,
            requeue_failed_below: None,
            default_priority: 0,
        }
    }

    /// Get poll interval as Duration (at least one millisecond)
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }
        if self.requeue_failed_below == Some(0) {
            return Err("requeue_failed_below must be greater than 0 when set".to_string());
        }
        Ok(())
    }
}
