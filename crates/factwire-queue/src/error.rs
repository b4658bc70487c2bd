//! Error types for queue operations

use crate::QueueStatus;
use factwire_domain::DocumentId;
use thiserror::Error;

/// Errors that can occur during queue operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueueError {
    /// The requested state change is not allowed
    #[error("Invalid queue transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status
        from: QueueStatus,
        /// Requested status
        to: QueueStatus,
    },

    /// No queue entry for the document
    #[error("No queue entry for document {0}")]
    NotFound(DocumentId),

    /// The document already has a queue entry
    #[error("Document {0} is already enqueued")]
    AlreadyEnqueued(DocumentId),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
