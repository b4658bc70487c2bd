//! Ingest, queue and extraction wired together

use crate::config::QualityThresholds;
use crate::error::ExtractorError;
use crate::extractor::{ExtractMetadata, ExtractStatus, Extractor};
use crate::merger::{filter_quality, filter_relevance, MergeConfig, MergeMetadata, Merger};
use async_trait::async_trait;
use factwire_dedup::{DedupReport, DedupSnapshot, Deduplicator};
use factwire_domain::traits::{DocumentRepository, ItemSink};
use factwire_domain::{Document, DocumentId, ExtractedItem, ProcessingStatus};
use factwire_queue::{DocumentProcessor, ProcessOutcome, QueueStore};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Result of ingesting a crawl batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Dedup counts
    pub dedup: DedupReport,
    /// Documents saved and enqueued, in input order
    pub enqueued: Vec<DocumentId>,
    /// Documents the queue refused, with the reason; these are not saved
    #[serde(default)]
    pub rejected: Vec<(DocumentId, String)>,
}

/// Result of processing one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    /// Processed document
    pub document_id: DocumentId,
    /// Final document status
    pub status: ProcessingStatus,
    /// Items handed to the sink
    pub items: Vec<ExtractedItem>,
    /// Extraction metadata
    pub extract: ExtractMetadata,
    /// Merge counts, when anything was merged
    pub merge: Option<MergeMetadata>,
    /// Failure reason
    pub error: Option<String>,
}

/// Pipeline from crawled documents to items in the sink
///
/// Owns the document repository and the item sink; the queue store is
/// passed in by the caller.
pub struct Pipeline<R, S>
where
    R: DocumentRepository,
    S: ItemSink,
{
    repository: R,
    sink: S,
    extractor: Extractor,
    merger: Merger,
    quality: QualityThresholds,
    deduplicator: Deduplicator,
}

impl<R, S> Pipeline<R, S>
where
    R: DocumentRepository,
    S: ItemSink,
{
    /// Create a pipeline using the extractor's configuration
    pub fn new(repository: R, sink: S, extractor: Extractor) -> Result<Self, ExtractorError> {
        let config = extractor.config();
        let merger = Merger::new(MergeConfig {
            similarity: config.similarity.clone(),
        });
        let quality = config.quality.clone();
        let deduplicator = Deduplicator::new(config.dedup.clone())?;

        Ok(Self {
            repository,
            sink,
            extractor,
            merger,
            quality,
            deduplicator,
        })
    }

    /// Get the document repository
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Get the item sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Deduplicate a crawl batch, then enqueue and save the survivors
    ///
    /// A document is saved only once the queue accepted it. Queue refusals
    /// are collected in the report and the rest of the batch carries on; a
    /// repository failure aborts the batch.
    pub fn ingest<Q: QueueStore>(
        &self,
        documents: Vec<Document>,
        snapshot: &DedupSnapshot,
        queue: &mut Q,
        priority: i32,
    ) -> Result<IngestReport, ExtractorError> {
        let outcome = self.deduplicator.deduplicate(documents, snapshot);
        let mut enqueued = Vec::with_capacity(outcome.documents.len());
        let mut rejected = Vec::new();

        for mut document in outcome.documents {
            if let Err(e) = queue.enqueue(document.id, priority) {
                warn!(document_id = %document.id, error = %e, "Queue refused document");
                rejected.push((document.id, e.to_string()));
                continue;
            }
            document.processing_status = ProcessingStatus::Queued;
            self.repository
                .save(&document)
                .map_err(|e| ExtractorError::Repository(e.to_string()))?;
            enqueued.push(document.id);
        }

        info!(
            input = outcome.report.input,
            enqueued = enqueued.len(),
            rejected = rejected.len(),
            "Ingested crawl batch"
        );

        Ok(IngestReport {
            dedup: outcome.report,
            enqueued,
            rejected,
        })
    }

    /// Extract, merge, filter and hand one document's items to the sink
    pub async fn process(&self, document: &Document) -> Result<DocumentOutcome, ExtractorError> {
        let id = document.id;
        self.set_status(id, ProcessingStatus::Running)?;

        let result = self.extractor.extract(document).await;

        if result.status == ExtractStatus::Failed {
            warn!(document_id = %id, error = ?result.error, "Extraction failed");
            self.set_status(id, ProcessingStatus::Failed)?;
            return Ok(DocumentOutcome {
                document_id: id,
                status: ProcessingStatus::Failed,
                items: Vec::new(),
                extract: result.metadata,
                merge: None,
                error: result.error,
            });
        }

        let merged = self.merger.merge(&result.chunks);
        let mut items = merged.items;
        if self.quality.filter_relevance {
            items = filter_relevance(items);
        }
        let items = filter_quality(
            items,
            self.quality.min_confidence,
            self.quality.min_fact_length,
        );

        if let Err(e) = self
            .sink
            .accept(id, items.clone(), result.metadata.run_metadata())
        {
            error!(document_id = %id, error = %e, "Sink rejected items");
            self.set_status(id, ProcessingStatus::Failed)?;
            return Err(ExtractorError::Sink(e.to_string()));
        }

        let status = result.status.processing_status();
        self.set_status(id, status)?;

        info!(
            document_id = %id,
            status = %status,
            items = items.len(),
            "Document processed"
        );

        Ok(DocumentOutcome {
            document_id: id,
            status,
            items,
            extract: result.metadata,
            merge: Some(merged.metadata),
            error: None,
        })
    }

    fn set_status(&self, id: DocumentId, status: ProcessingStatus) -> Result<(), ExtractorError> {
        self.repository
            .set_status(id, status)
            .map_err(|e| ExtractorError::Repository(e.to_string()))
    }
}

#[async_trait]
impl<R, S> DocumentProcessor for Pipeline<R, S>
where
    R: DocumentRepository,
    S: ItemSink,
{
    async fn process(&self, document_id: DocumentId) -> ProcessOutcome {
        let document = match self.repository.get(document_id) {
            Ok(Some(document)) => document,
            Ok(None) => return ProcessOutcome::Failed(format!("Document {} not found", document_id)),
            Err(e) => return ProcessOutcome::Failed(format!("Repository error: {}", e)),
        };

        match Pipeline::process(self, &document).await {
            Ok(outcome) if outcome.status == ProcessingStatus::Failed => ProcessOutcome::Failed(
                outcome
                    .error
                    .unwrap_or_else(|| "extraction failed".to_string()),
            ),
            Ok(_) => ProcessOutcome::Done,
            Err(e) => ProcessOutcome::Failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractorConfig;
    use crate::memory::{InMemoryRepository, InMemorySink};
    use factwire_llm::{ChatProvider, ConcurrencyController, MockProvider, ProviderGateway};
    use factwire_queue::{InMemoryQueue, QueueStatus};
    use std::sync::Arc;

    const ARTICLE: &str = "The central bank raised its benchmark lending rate by 25 basis points on Tuesday. \
        Officials said the move was meant to curb inflation, which has stayed above target for a year.";

    fn pipeline(reply: &str) -> Pipeline<InMemoryRepository, InMemorySink> {
        let provider = MockProvider::new("mock", reply);
        let gateway = ProviderGateway::new(vec![Arc::new(provider) as Arc<dyn ChatProvider>]);
        let config = ExtractorConfig {
            retries_per_provider: 0,
            min_content_len: 20,
            ..ExtractorConfig::default()
        };
        let extractor = Extractor::new(Arc::new(gateway), ConcurrencyController::new(1), config);
        Pipeline::new(InMemoryRepository::new(), InMemorySink::new(), extractor).unwrap()
    }

    #[test]
    fn test_ingest_dedups_saves_and_enqueues() {
        let pipeline = pipeline("[]");
        let mut queue = InMemoryQueue::new();

        let first = Document::new("src", "https://example.com/a", "A", ARTICLE);
        let same_url = Document::new("src", "https://example.com/a", "A again", "Other text entirely");
        let mut snapshot = DedupSnapshot::default();
        snapshot
            .existing_urls
            .insert("https://example.com/known".to_string());
        let known = Document::new("src", "https://example.com/known", "K", ARTICLE);

        let report = pipeline
            .ingest(vec![first.clone(), same_url, known], &snapshot, &mut queue, 5)
            .unwrap();

        assert_eq!(report.enqueued, vec![first.id]);
        assert_eq!(report.dedup.input, 3);
        assert_eq!(report.dedup.duplicate_url, 2);

        let stored = pipeline.repository().get(first.id).unwrap().unwrap();
        assert_eq!(stored.processing_status, ProcessingStatus::Queued);
        assert!(stored.fingerprint.is_some());

        let attempt = queue.get(first.id).unwrap().unwrap();
        assert_eq!(attempt.status, QueueStatus::Queued);
        assert_eq!(attempt.priority, 5);
        assert!(report.rejected.is_empty());
    }

    #[test]
    fn test_ingest_reports_queue_refusals_and_continues() {
        let pipeline = pipeline("[]");
        let mut queue = InMemoryQueue::new();

        let held = Document::new("src", "https://example.com/a", "A", ARTICLE);
        let fresh = Document::new(
            "src",
            "https://example.com/b",
            "B",
            "Regulators published draft capital buffer rules for systemically important banks.",
        );
        queue.enqueue(held.id, 1).unwrap();

        let report = pipeline
            .ingest(
                vec![held.clone(), fresh.clone()],
                &DedupSnapshot::default(),
                &mut queue,
                5,
            )
            .unwrap();

        assert_eq!(report.enqueued, vec![fresh.id]);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].0, held.id);
        assert!(report.rejected[0].1.contains("already enqueued"));

        assert!(pipeline.repository().get(held.id).unwrap().is_none());
        assert!(pipeline.repository().get(fresh.id).unwrap().is_some());
        assert_eq!(queue.get(held.id).unwrap().unwrap().priority, 1);
    }

    #[tokio::test]
    async fn test_process_filters_and_sinks_items() {
        let reply = r#"{"items": [
            {"fact": "The central bank raised its benchmark lending rate by 25 basis points", "confidence": 0.9, "layer": "financial_policy"},
            {"fact": "Inflation has stayed above target for a year", "confidence": 0.4},
            {"fact": "A new chatbot model was released", "confidence": 0.9, "layer": "financial_economy", "finance_relevance": 0.1}
        ]}"#;
        let pipeline = pipeline(reply);
        let document = Document::new("src", "https://example.com/a", "Rates", ARTICLE);
        pipeline.repository().save(&document).unwrap();

        let outcome = pipeline.process(&document).await.unwrap();
        assert_eq!(outcome.status, ProcessingStatus::Done);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.merge.unwrap().merged_count, 3);

        let accepted = pipeline.sink().accepted().unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].items, outcome.items);
        assert_eq!(accepted[0].metadata.total_chunks, 1);

        let stored = pipeline.repository().get(document.id).unwrap().unwrap();
        assert_eq!(stored.processing_status, ProcessingStatus::Done);
    }

    #[tokio::test]
    async fn test_failed_extraction_marks_document_failed() {
        let pipeline = pipeline("not json at all");
        let document = Document::new("src", "https://example.com/a", "Rates", ARTICLE);
        pipeline.repository().save(&document).unwrap();

        let outcome = pipeline.process(&document).await.unwrap();
        assert_eq!(outcome.status, ProcessingStatus::Failed);
        assert!(outcome.error.is_some());
        assert!(pipeline.sink().accepted().unwrap().is_empty());

        let stored = pipeline.repository().get(document.id).unwrap().unwrap();
        assert_eq!(stored.processing_status, ProcessingStatus::Failed);
    }

    #[tokio::test]
    async fn test_processor_reports_missing_document() {
        let pipeline = pipeline("[]");
        let outcome = DocumentProcessor::process(&pipeline, DocumentId::new()).await;
        assert!(matches!(outcome, ProcessOutcome::Failed(msg) if msg.contains("not found")));
    }

    #[tokio::test]
    async fn test_unsaved_document_is_a_repository_error() {
        let pipeline = pipeline("[]");
        let document = Document::new("src", "https://example.com/a", "Rates", ARTICLE);
        let result = pipeline.process(&document).await;
        assert!(matches!(result, Err(ExtractorError::Repository(_))));
    }
}
