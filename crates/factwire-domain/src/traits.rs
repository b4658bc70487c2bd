//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the extraction core and the
//! systems around it. Implementations live in other crates or in the
//! embedding application.

use crate::{Document, DocumentId, ExtractedItem, ProcessingStatus, TokenUsage};
use serde::{Deserialize, Serialize};

/// Trait for persisting crawled documents
///
/// Implementations are shared between concurrently processed documents,
/// so every method takes `&self`.
pub trait DocumentRepository: Send + Sync {
    /// Error type for repository operations
    type Error: std::fmt::Display;

    /// Insert or replace a document
    fn save(&self, document: &Document) -> Result<(), Self::Error>;

    /// Get a document by ID
    fn get(&self, id: DocumentId) -> Result<Option<Document>, Self::Error>;

    /// Update the processing status of a document
    fn set_status(&self, id: DocumentId, status: ProcessingStatus) -> Result<(), Self::Error>;
}

/// Summary of one extraction run handed to downstream consumers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Number of chunks the document was split into
    pub total_chunks: usize,

    /// Number of chunks that failed
    pub failed_chunks: usize,

    /// Tokens consumed across all chunks
    pub usage: TokenUsage,

    /// Whether the chunk plan was degraded
    pub degraded: bool,
}

/// Trait for handing extracted items to downstream scoring
pub trait ItemSink: Send + Sync {
    /// Error type for sink operations
    type Error: std::fmt::Display;

    /// Accept the final item set of one document
    fn accept(
        &self,
        document_id: DocumentId,
        items: Vec<ExtractedItem>,
        metadata: RunMetadata,
    ) -> Result<(), Self::Error>;
}
