//! In-memory collaborators for the pipeline
//!
//! Used by the CLI's run-once mode and by tests. A database-backed
//! repository and the scoring sink live with the embedding application.

use crate::error::ExtractorError;
use factwire_domain::traits::{DocumentRepository, ItemSink, RunMetadata};
use factwire_domain::{Document, DocumentId, ExtractedItem, ProcessingStatus};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, String> {
    mutex.lock().map_err(|_| "lock poisoned".to_string())
}

/// Document repository backed by a map
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    documents: Mutex<HashMap<DocumentId, Document>>,
}

impl InMemoryRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored documents, oldest id first
    pub fn documents(&self) -> Result<Vec<Document>, ExtractorError> {
        let documents = lock(&self.documents).map_err(ExtractorError::Repository)?;
        let mut all: Vec<Document> = documents.values().cloned().collect();
        all.sort_by_key(|d| d.id);
        Ok(all)
    }
}

impl DocumentRepository for InMemoryRepository {
    type Error = ExtractorError;

    fn save(&self, document: &Document) -> Result<(), Self::Error> {
        lock(&self.documents)
            .map_err(ExtractorError::Repository)?
            .insert(document.id, document.clone());
        Ok(())
    }

    fn get(&self, id: DocumentId) -> Result<Option<Document>, Self::Error> {
        Ok(lock(&self.documents)
            .map_err(ExtractorError::Repository)?
            .get(&id)
            .cloned())
    }

    fn set_status(&self, id: DocumentId, status: ProcessingStatus) -> Result<(), Self::Error> {
        let mut documents = lock(&self.documents).map_err(ExtractorError::Repository)?;
        let document = documents
            .get_mut(&id)
            .ok_or_else(|| ExtractorError::Repository(format!("Document {} not found", id)))?;
        document.processing_status = status;
        Ok(())
    }
}

/// One batch handed to an [`InMemorySink`]
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedItems {
    /// Source document
    pub document_id: DocumentId,
    /// Final items
    pub items: Vec<ExtractedItem>,
    /// Run summary
    pub metadata: RunMetadata,
}

/// Item sink that keeps everything it receives
#[derive(Debug, Default)]
pub struct InMemorySink {
    accepted: Mutex<Vec<AcceptedItems>>,
}

impl InMemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything accepted so far, in arrival order
    pub fn accepted(&self) -> Result<Vec<AcceptedItems>, ExtractorError> {
        Ok(lock(&self.accepted).map_err(ExtractorError::Sink)?.clone())
    }
}

impl ItemSink for InMemorySink {
    type Error = ExtractorError;

    fn accept(
        &self,
        document_id: DocumentId,
        items: Vec<ExtractedItem>,
        metadata: RunMetadata,
    ) -> Result<(), Self::Error> {
        lock(&self.accepted)
            .map_err(ExtractorError::Sink)?
            .push(AcceptedItems {
                document_id,
                items,
                metadata,
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_roundtrip_and_status() {
        let repository = InMemoryRepository::new();
        let document = Document::new("src", "https://example.com/a", "Title", "Body");

        repository.save(&document).unwrap();
        repository
            .set_status(document.id, ProcessingStatus::Queued)
            .unwrap();

        let stored = repository.get(document.id).unwrap().unwrap();
        assert_eq!(stored.processing_status, ProcessingStatus::Queued);
        assert_eq!(repository.documents().unwrap().len(), 1);
    }

    #[test]
    fn test_set_status_of_unknown_document() {
        let repository = InMemoryRepository::new();
        let result = repository.set_status(DocumentId::new(), ProcessingStatus::Done);
        assert!(matches!(result, Err(ExtractorError::Repository(_))));
        assert!(repository.get(DocumentId::new()).unwrap().is_none());
    }

    #[test]
    fn test_sink_keeps_arrival_order() {
        let sink = InMemorySink::new();
        let first = DocumentId::new();
        let second = DocumentId::new();

        sink.accept(second, Vec::new(), RunMetadata::default()).unwrap();
        sink.accept(
            first,
            vec![ExtractedItem::new("Bank X raised rates", 0.9)],
            RunMetadata::default(),
        )
        .unwrap();

        let accepted = sink.accepted().unwrap();
        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted[0].document_id, second);
        assert_eq!(accepted[1].items.len(), 1);
    }
}
