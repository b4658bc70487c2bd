//! Core Extractor implementation

use crate::chunking::{detect_language, estimate_tokens, ChunkPlanner, DegradeStrategy};
use crate::config::ExtractorConfig;
use crate::parser::parse_llm_response;
use crate::prompt::PromptBuilder;
use factwire_domain::traits::RunMetadata;
use factwire_domain::{
    Document, ExtractedItem, Language, ProcessingStatus, ProviderResult, TokenUsage,
};
use factwire_llm::{ConcurrencyController, Pricing, ProviderGateway};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Reason reported for documents too short to extract
pub const CONTENT_TOO_SHORT: &str = "content_too_short";

/// Overall outcome of extracting one document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractStatus {
    /// Every chunk succeeded
    Success,
    /// Some chunks failed
    Partial,
    /// Every chunk failed, or the document was rejected
    Failed,
}

impl ExtractStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractStatus::Success => "success",
            ExtractStatus::Partial => "partial",
            ExtractStatus::Failed => "failed",
        }
    }

    /// Document status this outcome leads to
    pub fn processing_status(&self) -> ProcessingStatus {
        match self {
            ExtractStatus::Success => ProcessingStatus::Done,
            ExtractStatus::Partial => ProcessingStatus::Partial,
            ExtractStatus::Failed => ProcessingStatus::Failed,
        }
    }

    fn from_counts(total: usize, failed: usize) -> Self {
        if total == 0 || failed == total {
            ExtractStatus::Failed
        } else if failed > 0 {
            ExtractStatus::Partial
        } else {
            ExtractStatus::Success
        }
    }
}

impl fmt::Display for ExtractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata about one extraction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractMetadata {
    /// Chunks sent to providers
    pub total_chunks: usize,

    /// Chunks that failed
    pub failed_chunks: usize,

    /// Tokens consumed across all chunks
    pub usage: TokenUsage,

    /// Whether the chunk plan was degraded
    pub degraded: bool,

    /// Degrade strategy applied, if any
    pub strategy: Option<DegradeStrategy>,

    /// Source chunks left out by the degrade strategy
    pub dropped_chunks: usize,

    /// Language used for token estimation
    pub language: Language,

    /// Estimated tokens of the whole document
    pub estimated_tokens: usize,

    /// Characters of trimmed content
    pub document_length: usize,

    /// Provider that served each successful chunk, in chunk order
    pub providers: Vec<String>,

    /// Wall-clock time of the run (milliseconds)
    pub processing_time_ms: u64,

    /// Cost in USD, when pricing is configured
    pub cost: Option<f64>,
}

impl ExtractMetadata {
    fn new(language: Language, estimated_tokens: usize, document_length: usize) -> Self {
        Self {
            total_chunks: 0,
            failed_chunks: 0,
            usage: TokenUsage::default(),
            degraded: false,
            strategy: None,
            dropped_chunks: 0,
            language,
            estimated_tokens,
            document_length,
            providers: Vec::new(),
            processing_time_ms: 0,
            cost: None,
        }
    }

    /// The part of the metadata handed to downstream scoring
    pub fn run_metadata(&self) -> RunMetadata {
        RunMetadata {
            total_chunks: self.total_chunks,
            failed_chunks: self.failed_chunks,
            usage: self.usage,
            degraded: self.degraded,
        }
    }
}

/// Result of extracting one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractResult {
    /// Overall outcome
    pub status: ExtractStatus,

    /// Per-chunk results in plan order
    pub chunks: Vec<ProviderResult>,

    /// Items of all successful chunks, unmerged
    pub items: Vec<ExtractedItem>,

    /// Run metadata
    pub metadata: ExtractMetadata,

    /// Failure reason when `status` is `failed`
    pub error: Option<String>,
}

impl ExtractResult {
    fn rejected(metadata: ExtractMetadata, reason: impl Into<String>) -> Self {
        Self {
            status: ExtractStatus::Failed,
            chunks: Vec::new(),
            items: Vec::new(),
            metadata,
            error: Some(reason.into()),
        }
    }
}

/// The Extractor turns a document into per-chunk provider results
///
/// Chunks of one document run sequentially; every provider call goes
/// through the shared [`ConcurrencyController`]. Extraction has no
/// persistence side effects.
pub struct Extractor {
    gateway: Arc<ProviderGateway>,
    controller: ConcurrencyController,
    config: ExtractorConfig,
    planner: ChunkPlanner,
    pricing: Option<Pricing>,
}

impl Extractor {
    /// Create a new Extractor
    pub fn new(
        gateway: Arc<ProviderGateway>,
        controller: ConcurrencyController,
        config: ExtractorConfig,
    ) -> Self {
        let planner = ChunkPlanner::new(config.plan_options());
        Self {
            gateway,
            controller,
            config,
            planner,
            pricing: None,
        }
    }

    /// Report the cost of each run using `pricing`
    pub fn with_pricing(mut self, pricing: Pricing) -> Self {
        self.pricing = Some(pricing);
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract items from a document
    pub async fn extract(&self, document: &Document) -> ExtractResult {
        let start_time = Instant::now();
        let content = document.content_text.trim();
        let document_length = content.chars().count();
        let language = document
            .lang_hint
            .unwrap_or_else(|| detect_language(content));
        let estimated_tokens = estimate_tokens(content, language);

        let mut metadata = ExtractMetadata::new(language, estimated_tokens, document_length);

        if document_length < self.config.min_content_len {
            warn!(
                document_id = %document.id,
                length = document_length,
                min = self.config.min_content_len,
                "Content too short, skipping extraction"
            );
            metadata.processing_time_ms = elapsed_ms(start_time);
            return ExtractResult::rejected(metadata, CONTENT_TOO_SHORT);
        }

        info!(
            document_id = %document.id,
            language = %language,
            estimated_tokens,
            "Starting extraction"
        );

        let plan = self.planner.plan(content, language);
        if let Some(degraded) = plan.degraded() {
            metadata.degraded = true;
            metadata.strategy = Some(degraded.strategy);
            metadata.dropped_chunks = degraded.dropped_chunks;
        }

        let chunks = plan.into_chunks();
        let total = chunks.len();
        metadata.total_chunks = total;

        let mut results = Vec::with_capacity(total);
        let mut cost = 0.0;
        let mut last_error = None;

        for (index, chunk) in chunks.iter().enumerate() {
            debug!(
                document_id = %document.id,
                chunk = index,
                tokens = chunk.estimated_tokens,
                "Extracting chunk"
            );

            let messages = PromptBuilder::new(chunk.text.as_str())
                .with_chunk_position(index, total)
                .messages();

            let call = self
                .controller
                .call(
                    &self.gateway,
                    &messages,
                    self.config.temperature,
                    self.config.llm_timeout(),
                    self.config.retries_per_provider,
                )
                .await;

            let result = match call {
                Ok((response, provider)) => {
                    metadata.usage += response.usage;
                    let chunk_cost = self.pricing.as_ref().map(|pricing| {
                        pricing.calculate_cost(&provider, &response.model, &response.usage)
                    });
                    cost += chunk_cost.unwrap_or(0.0);

                    match parse_llm_response(&response.content) {
                        Ok(items) => {
                            debug!(chunk = index, items = items.len(), provider = %provider, "Chunk extracted");
                            metadata.providers.push(provider.clone());
                            ProviderResult::success(index, items, response.usage, provider)
                                .with_model(response.model)
                                .with_cost(chunk_cost)
                        }
                        Err(e) => {
                            warn!(chunk = index, provider = %provider, error = %e, "Unparseable chunk response");
                            let mut failed = ProviderResult::failed(index, e.to_string())
                                .with_model(response.model)
                                .with_cost(chunk_cost);
                            failed.usage = response.usage;
                            failed.provider = Some(provider);
                            last_error = Some(e.to_string());
                            failed
                        }
                    }
                }
                Err(e) => {
                    warn!(document_id = %document.id, chunk = index, error = %e, "Chunk failed");
                    last_error = Some(e.to_string());
                    ProviderResult::failed(index, e.to_string())
                }
            };

            results.push(result);
        }

        metadata.failed_chunks = results.iter().filter(|r| !r.is_success()).count();
        metadata.cost = self.pricing.as_ref().map(|_| cost);
        metadata.processing_time_ms = elapsed_ms(start_time);

        let status = ExtractStatus::from_counts(total, metadata.failed_chunks);
        let error = match status {
            ExtractStatus::Failed => {
                Some(last_error.unwrap_or_else(|| "no chunks to extract".to_string()))
            }
            _ => None,
        };

        let items: Vec<ExtractedItem> = results
            .iter()
            .flat_map(|result| result.items.iter().cloned())
            .collect();

        info!(
            document_id = %document.id,
            status = %status,
            chunks = total,
            failed = metadata.failed_chunks,
            items = items.len(),
            "Extraction finished in {}ms",
            metadata.processing_time_ms
        );

        ExtractResult {
            status,
            chunks: results,
            items,
            metadata,
            error,
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use factwire_llm::{ChatProvider, LlmError, MockProvider, ModelPrice};

    const ARTICLE: &str = "The central bank raised its benchmark lending rate by 25 basis points on Tuesday. \
        Officials said the move was meant to curb inflation, which has stayed above target for a year. \
        Bank shares rose after the announcement.";

    const REPLY: &str = r#"{"items": [{"fact": "The central bank raised its benchmark lending rate by 25 basis points", "confidence": 0.9, "region": "foreign", "layer": "financial_policy"}]}"#;

    fn extractor_with(provider: &MockProvider, config: ExtractorConfig) -> Extractor {
        let gateway = ProviderGateway::new(vec![Arc::new(provider.clone()) as Arc<dyn ChatProvider>]);
        Extractor::new(Arc::new(gateway), ConcurrencyController::new(1), config)
    }

    fn fast_config() -> ExtractorConfig {
        ExtractorConfig {
            retries_per_provider: 0,
            ..ExtractorConfig::default()
        }
    }

    #[test]
    fn test_status_from_counts() {
        assert_eq!(ExtractStatus::from_counts(3, 0), ExtractStatus::Success);
        assert_eq!(ExtractStatus::from_counts(3, 1), ExtractStatus::Partial);
        assert_eq!(ExtractStatus::from_counts(3, 3), ExtractStatus::Failed);
        assert_eq!(ExtractStatus::from_counts(0, 0), ExtractStatus::Failed);
        assert_eq!(
            ExtractStatus::Partial.processing_status(),
            ProcessingStatus::Partial
        );
    }

    #[tokio::test]
    async fn test_short_content_is_rejected_without_provider_call() {
        let provider = MockProvider::new("mock", REPLY);
        let extractor = extractor_with(&provider, fast_config());
        let document = Document::new("src", "https://example.com/a", "Short", "   Too short.   ");

        let result = extractor.extract(&document).await;
        assert_eq!(result.status, ExtractStatus::Failed);
        assert_eq!(result.error.as_deref(), Some(CONTENT_TOO_SHORT));
        assert_eq!(result.metadata.document_length, 10);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_single_chunk_success() {
        let provider = MockProvider::new("mock", REPLY);
        let extractor = extractor_with(&provider, fast_config());
        let document = Document::new("src", "https://example.com/a", "Rates", ARTICLE);

        let result = extractor.extract(&document).await;
        assert_eq!(result.status, ExtractStatus::Success);
        assert_eq!(result.chunks.len(), 1);
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.metadata.total_chunks, 1);
        assert_eq!(result.metadata.language, Language::En);
        assert_eq!(result.metadata.providers, vec!["mock".to_string()]);
        assert_eq!(result.metadata.usage.total_tokens, 120);
        assert_eq!(result.metadata.cost, None);
        assert_eq!(result.chunks[0].model.as_deref(), Some("mock-model"));
        assert_eq!(result.chunks[0].cost, None);
        assert!(!result.metadata.degraded);
        assert!(result.error.is_none());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_language_hint_wins_over_detection() {
        let provider = MockProvider::new("mock", REPLY);
        let extractor = extractor_with(&provider, fast_config());
        let mut document = Document::new("src", "https://example.com/a", "Rates", ARTICLE);
        document.lang_hint = Some(Language::Mixed);

        let result = extractor.extract(&document).await;
        assert_eq!(result.metadata.language, Language::Mixed);
    }

    #[tokio::test]
    async fn test_unparseable_response_fails_chunk() {
        let provider = MockProvider::new("mock", "I could not find any facts.");
        let extractor = extractor_with(&provider, fast_config());
        let document = Document::new("src", "https://example.com/a", "Rates", ARTICLE);

        let result = extractor.extract(&document).await;
        assert_eq!(result.status, ExtractStatus::Failed);
        assert_eq!(result.metadata.failed_chunks, 1);
        assert!(result.error.unwrap().contains("Invalid response format"));
        assert_eq!(result.chunks[0].provider.as_deref(), Some("mock"));
    }

    #[tokio::test]
    async fn test_exhausted_providers_report_last_gateway_error() {
        let provider = MockProvider::failing(
            "mock",
            LlmError::Api {
                status: 400,
                message: "bad request".to_string(),
            },
        );
        let extractor = extractor_with(&provider, fast_config());
        let document = Document::new("src", "https://example.com/a", "Rates", ARTICLE);

        let result = extractor.extract(&document).await;
        assert_eq!(result.status, ExtractStatus::Failed);
        let error = result.error.unwrap();
        assert!(error.contains("All providers exhausted"));
        assert!(error.contains("bad request"));
        assert!(result.items.is_empty());
    }

    #[tokio::test]
    async fn test_cost_with_pricing() {
        let provider = MockProvider::new("mock", REPLY);
        let mut pricing = Pricing::empty();
        pricing.set(
            "mock",
            "mock-model",
            ModelPrice {
                input: 1.0,
                output: 2.0,
            },
        );
        let extractor = extractor_with(&provider, fast_config()).with_pricing(pricing);
        let document = Document::new("src", "https://example.com/a", "Rates", ARTICLE);

        let result = extractor.extract(&document).await;
        let cost = result.metadata.cost.unwrap();
        assert!((cost - 0.00014).abs() < 1e-9);

        let chunk = &result.chunks[0];
        assert_eq!(chunk.model.as_deref(), Some("mock-model"));
        assert!((chunk.cost.unwrap() - 0.00014).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_chunk_reports_model_that_answered() {
        let provider = MockProvider::new("mock", REPLY).with_model("mock-large");
        let extractor = extractor_with(&provider, fast_config());
        let document = Document::new("src", "https://example.com/a", "Rates", ARTICLE);

        let result = extractor.extract(&document).await;
        assert_eq!(result.chunks[0].provider.as_deref(), Some("mock"));
        assert_eq!(result.chunks[0].model.as_deref(), Some("mock-large"));
    }
}
