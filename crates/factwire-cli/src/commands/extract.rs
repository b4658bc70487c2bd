//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use factwire_dedup::{DedupReport, DedupSnapshot};
use factwire_domain::traits::DocumentRepository;
use factwire_domain::{Document, DocumentId, ExtractedItem, ProcessingStatus};
use factwire_extractor::{Extractor, InMemoryRepository, InMemorySink, Pipeline};
use factwire_llm::{
    ChatProvider, ConcurrencyController, MockProvider, Pricing, ProviderGateway, ProviderSettings,
};
use factwire_queue::{InMemoryQueue, QueueStore, QueueWorker};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// What happened to one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Document ID
    pub document_id: DocumentId,
    /// Article title
    pub title: String,
    /// Final processing status
    pub status: ProcessingStatus,
    /// Extraction attempts made
    pub attempts: u32,
    /// Last failure reason
    pub last_error: Option<String>,
    /// Items handed downstream
    pub items: Vec<ExtractedItem>,
}

/// Result of one extract run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractReport {
    /// Dedup counts
    pub dedup: DedupReport,
    /// Surviving documents in ingest order
    pub documents: Vec<DocumentSummary>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentInput {
    Many(Vec<Document>),
    One(Box<Document>),
}

/// Execute the extract command.
pub async fn execute_extract(args: ExtractArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let report = run_extract(&args, config).await?;

    if let Some(path) = &args.output {
        let items: Vec<&ExtractedItem> = report
            .documents
            .iter()
            .flat_map(|d| d.items.iter())
            .collect();
        fs::write(path, serde_json::to_string_pretty(&items)?)?;
        eprintln!(
            "{}",
            formatter.success(&format!("Wrote {} item(s) to {}", items.len(), path.display()))
        );
    }

    println!("{}", formatter.format_extract_report(&report)?);
    Ok(())
}

/// Deduplicate, queue and extract the documents named in `args`
pub async fn run_extract(args: &ExtractArgs, config: &Config) -> Result<ExtractReport> {
    let documents = read_documents(&args.files)?;
    let snapshot = match &args.snapshot {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => DedupSnapshot::default(),
    };

    let gateway = Arc::new(ProviderGateway::new(build_providers(args.mock_reply.as_deref())?));
    let controller = ConcurrencyController::new(config.extractor.concurrency_capacity());
    let extractor = Extractor::new(gateway, controller, config.extractor.clone())
        .with_pricing(Pricing::default());
    let pipeline = Pipeline::new(InMemoryRepository::new(), InMemorySink::new(), extractor)?;

    let mut queue = InMemoryQueue::new();
    let priority = args.priority.unwrap_or(config.queue.default_priority);
    let ingest = pipeline.ingest(documents, &snapshot, &mut queue, priority)?;

    let mut worker = QueueWorker::new(config.queue.clone());
    loop {
        let cycle = worker.run_cycle(&mut queue, &pipeline).await?;
        if cycle.started == 0 {
            break;
        }
    }
    info!("Extraction finished:\n{}", worker.metrics().summary());

    let accepted = pipeline.sink().accepted()?;
    let mut summaries = Vec::with_capacity(ingest.enqueued.len());
    for id in &ingest.enqueued {
        let document = pipeline
            .repository()
            .get(*id)?
            .ok_or_else(|| CliError::InvalidInput(format!("Document {} disappeared", id)))?;
        let attempt = queue.get(*id)?;
        let items = accepted
            .iter()
            .find(|a| a.document_id == *id)
            .map(|a| a.items.clone())
            .unwrap_or_default();

        summaries.push(DocumentSummary {
            document_id: *id,
            title: document.title,
            status: document.processing_status,
            attempts: attempt.as_ref().map_or(0, |a| a.attempts),
            last_error: attempt.and_then(|a| a.last_error),
            items,
        });
    }

    Ok(ExtractReport {
        dedup: ingest.dedup,
        documents: summaries,
    })
}

fn build_providers(mock_reply: Option<&Path>) -> Result<Vec<Arc<dyn ChatProvider>>> {
    if let Some(path) = mock_reply {
        let reply = fs::read_to_string(path)?;
        return Ok(vec![Arc::new(MockProvider::new("mock", reply)) as Arc<dyn ChatProvider>]);
    }

    let settings = ProviderSettings::from_env()?;
    if settings.is_empty() {
        return Err(CliError::Config(
            "No LLM providers configured. Set PROVIDER_DEEPSEEK_API_KEY or PROVIDER_QWEN_API_KEY"
                .to_string(),
        ));
    }
    Ok(ProviderSettings::build_all(&settings)?)
}

/// Read documents from JSON files holding one document or an array
pub fn read_documents(files: &[PathBuf]) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for path in files {
        let contents = fs::read_to_string(path)?;
        let input: DocumentInput = serde_json::from_str(&contents).map_err(|e| {
            CliError::InvalidInput(format!("{}: not a document or document array: {}", path.display(), e))
        })?;
        match input {
            DocumentInput::Many(many) => documents.extend(many),
            DocumentInput::One(one) => documents.push(*one),
        }
    }

    if documents.is_empty() {
        return Err(CliError::InvalidInput("No documents provided".to_string()));
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_input_shapes() {
        let one: DocumentInput = serde_json::from_str(
            r#"{"sourceId": "feed", "url": "https://example.com/a", "title": "A", "contentText": "Body"}"#,
        )
        .unwrap();
        assert!(matches!(one, DocumentInput::One(_)));

        let many: DocumentInput = serde_json::from_str(
            r#"[{"source_id": "feed", "url": "https://example.com/a"}, {"source_id": "feed", "url": "https://example.com/b"}]"#,
        )
        .unwrap();
        match many {
            DocumentInput::Many(docs) => assert_eq!(docs.len(), 2),
            DocumentInput::One(_) => panic!("Expected an array"),
        }
    }

    #[test]
    fn test_missing_source_is_rejected() {
        let result: std::result::Result<DocumentInput, _> =
            serde_json::from_str(r#"{"url": "https://example.com/a"}"#);
        assert!(result.is_err());
    }
}
