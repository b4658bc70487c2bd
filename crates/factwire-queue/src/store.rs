//! Queue persistence

use crate::{ExtractionAttempt, QueueError, QueueStatus};
use factwire_domain::{unix_now, DocumentId};
use std::collections::HashMap;
use tracing::debug;

/// Trait for storing queue entries
///
/// Implemented in memory here; a database-backed store lives with the
/// embedding application.
pub trait QueueStore {
    /// Create a queued entry for a document
    fn enqueue(&mut self, document_id: DocumentId, priority: i32)
        -> Result<ExtractionAttempt, QueueError>;

    /// Get the entry of a document
    fn get(&self, document_id: DocumentId) -> Result<Option<ExtractionAttempt>, QueueError>;

    /// `queued -> running`
    fn start(&mut self, document_id: DocumentId) -> Result<ExtractionAttempt, QueueError>;

    /// `running -> done`
    fn complete(&mut self, document_id: DocumentId) -> Result<ExtractionAttempt, QueueError>;

    /// `running -> failed`
    fn fail(&mut self, document_id: DocumentId, error: &str)
        -> Result<ExtractionAttempt, QueueError>;

    /// `failed -> queued`
    fn requeue(&mut self, document_id: DocumentId) -> Result<ExtractionAttempt, QueueError>;

    /// Up to `limit` queued entries, highest priority first, then oldest first
    fn next_queued(&self, limit: usize) -> Result<Vec<ExtractionAttempt>, QueueError>;

    /// All entries, optionally filtered by status
    fn list(&self, status: Option<QueueStatus>) -> Result<Vec<ExtractionAttempt>, QueueError>;
}

/// In-memory queue store
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    entries: HashMap<DocumentId, (u64, ExtractionAttempt)>,
    sequence: u64,
}

impl InMemoryQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in any status
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn update<F>(&mut self, document_id: DocumentId, apply: F) -> Result<ExtractionAttempt, QueueError>
    where
        F: FnOnce(&mut ExtractionAttempt) -> Result<(), QueueError>,
    {
        let (_, entry) = self
            .entries
            .get_mut(&document_id)
            .ok_or(QueueError::NotFound(document_id))?;
        apply(entry)?;
        debug!(document_id = %document_id, status = %entry.status, "Queue entry updated");
        Ok(entry.clone())
    }

    fn sorted(&self, status: Option<QueueStatus>) -> Vec<ExtractionAttempt> {
        let mut entries: Vec<&(u64, ExtractionAttempt)> = self
            .entries
            .values()
            .filter(|(_, entry)| status.map_or(true, |s| entry.status == s))
            .collect();
        entries.sort_by(|(seq_a, a), (seq_b, b)| {
            b.priority
                .cmp(&a.priority)
                .then(a.enqueued_at.cmp(&b.enqueued_at))
                .then(seq_a.cmp(seq_b))
        });
        entries.into_iter().map(|(_, entry)| entry.clone()).collect()
    }
}

impl QueueStore for InMemoryQueue {
    fn enqueue(
        &mut self,
        document_id: DocumentId,
        priority: i32,
    ) -> Result<ExtractionAttempt, QueueError> {
        if self.entries.contains_key(&document_id) {
            return Err(QueueError::AlreadyEnqueued(document_id));
        }
        let entry = ExtractionAttempt::new(document_id, priority, unix_now());
        self.sequence += 1;
        self.entries.insert(document_id, (self.sequence, entry.clone()));
        debug!(document_id = %document_id, priority, "Document enqueued");
        Ok(entry)
    }

    fn get(&self, document_id: DocumentId) -> Result<Option<ExtractionAttempt>, QueueError> {
        Ok(self.entries.get(&document_id).map(|(_, entry)| entry.clone()))
    }

    fn start(&mut self, document_id: DocumentId) -> Result<ExtractionAttempt, QueueError> {
        self.update(document_id, |entry| entry.start(unix_now()))
    }

    fn complete(&mut self, document_id: DocumentId) -> Result<ExtractionAttempt, QueueError> {
        self.update(document_id, |entry| entry.complete(unix_now()))
    }

    fn fail(
        &mut self,
        document_id: DocumentId,
        error: &str,
    ) -> Result<ExtractionAttempt, QueueError> {
        self.update(document_id, |entry| entry.fail(unix_now(), error))
    }

    fn requeue(&mut self, document_id: DocumentId) -> Result<ExtractionAttempt, QueueError> {
        self.update(document_id, |entry| entry.requeue())
    }

    fn next_queued(&self, limit: usize) -> Result<Vec<ExtractionAttempt>, QueueError> {
        let mut queued = self.sorted(Some(QueueStatus::Queued));
        queued.truncate(limit);
        Ok(queued)
    }

    fn list(&self, status: Option<QueueStatus>) -> Result<Vec<ExtractionAttempt>, QueueError> {
        Ok(self.sorted(status))
    }
}
