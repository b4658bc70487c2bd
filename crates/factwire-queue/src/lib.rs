//! Factwire Queue
//!
//! Extraction queue state machine and the background worker that drains it.
//!
//! # Overview
//!
//! Every accepted document gets exactly one [`ExtractionAttempt`], which is
//! never deleted and doubles as the audit trail of its extraction:
//!
//! | From | To | Effect |
//! |------|----|--------|
//! | `queued` | `running` | `attempts += 1`, `started_at` set, `finished_at` cleared |
//! | `running` | `done` | `finished_at` set, `last_error` cleared |
//! | `running` | `failed` | `finished_at` and `last_error` set |
//! | `failed` | `queued` | attempts kept |
//!
//! Every other transition is rejected with [`QueueError::InvalidTransition`].
//! The queue has no retry policy of its own; re-enqueueing failed entries
//! is an explicit decision (see [`QueueConfig::requeue_failed_below`]).
//!
//! # Usage
//!
//! ```
//! use factwire_domain::DocumentId;
//! use factwire_queue::{InMemoryQueue, QueueStatus, QueueStore};
//!
//! # fn main() -> Result<(), factwire_queue::QueueError> {
//! let mut queue = InMemoryQueue::new();
//! let id = DocumentId::new();
//!
//! queue.enqueue(id, 0)?;
//! queue.start(id)?;
//! let attempt = queue.fail(id, "all providers exhausted")?;
//! assert_eq!(attempt.status, QueueStatus::Failed);
//!
//! let attempt = queue.requeue(id)?;
//! assert_eq!(attempt.status, QueueStatus::Queued);
//! assert_eq!(attempt.attempts, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Background Worker
//!
//! ```no_run
//! use factwire_queue::{InMemoryQueue, QueueConfig, QueueWorker};
//! # use factwire_queue::{DocumentProcessor, ProcessOutcome};
//! # use factwire_domain::DocumentId;
//! # struct Noop;
//! # #[async_trait::async_trait]
//! # impl DocumentProcessor for Noop {
//! #     async fn process(&self, _id: DocumentId) -> ProcessOutcome { ProcessOutcome::Done }
//! # }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut queue = InMemoryQueue::new();
//!     let mut worker = QueueWorker::new(QueueConfig::default());
//!
//!     // Run indefinitely (until Ctrl+C)
//!     worker.run(&mut queue, &Noop).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

mod attempt;
mod config;
mod error;
mod metrics;
mod store;
mod worker;

pub use attempt::{ExtractionAttempt, QueueStatus};
pub use config::QueueConfig;
pub use error::QueueError;
pub use metrics::QueueMetrics;
pub use store::{InMemoryQueue, QueueStore};
pub use worker::{CycleReport, DocumentProcessor, ProcessOutcome, QueueWorker};
