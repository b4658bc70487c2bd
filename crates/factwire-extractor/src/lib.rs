//! Factwire Extractor
//!
//! Turns crawled news documents into merged, filtered fact/opinion items.
//!
//! # Overview
//!
//! The Extractor is the core of the pipeline. A document is split into
//! chunks that fit the model's token budget, each chunk is sent through the
//! provider gateway, the per-chunk answers are parsed into
//! [`ExtractedItem`](factwire_domain::ExtractedItem)s, and the merger
//! collapses near-duplicate facts before the quality filter runs.
//!
//! # Architecture
//!
//! ```text
//! Documents → Dedup → Queue → Extractor → Merger → Quality filter → ItemSink
//!                                 ↓
//!                  ChunkPlanner → ConcurrencyController → ProviderGateway
//! ```
//!
//! # Key Features
//!
//! - **Token-aware chunking**: paragraph/sentence packing with overlap and
//!   degrade strategies for very long articles
//! - **Partial results**: a failed chunk never fails its siblings
//! - **Merging**: near-duplicate facts collapse to the most confident one
//! - **Pipeline**: ingest, queue and extraction wired together and drivable
//!   by a [`QueueWorker`](factwire_queue::QueueWorker)
//!
//! # Example Usage
//!
//! ```no_run
//! use factwire_domain::Document;
//! use factwire_extractor::{Extractor, ExtractorConfig};
//! use factwire_llm::{ChatProvider, ConcurrencyController, MockProvider, ProviderGateway};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = MockProvider::new("mock", r#"{"items": []}"#);
//! let gateway = ProviderGateway::new(vec![Arc::new(provider) as Arc<dyn ChatProvider>]);
//! let config = ExtractorConfig::from_env()?;
//! let controller = ConcurrencyController::new(config.concurrency_capacity());
//!
//! let extractor = Extractor::new(Arc::new(gateway), controller, config);
//!
//! let document = Document::new(
//!     "feed-1",
//!     "https://example.com/news/1",
//!     "Central bank raises rates",
//!     "The central bank raised its benchmark lending rate by 25 basis points on Tuesday.",
//! );
//! let result = extractor.extract(&document).await;
//!
//! println!("Status: {}", result.status);
//! println!("Chunks: {}, failed: {}", result.metadata.total_chunks, result.metadata.failed_chunks);
//! println!("Items: {}", result.items.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod chunking;
mod config;
mod error;
mod extractor;
mod memory;
mod merger;
mod parser;
mod pipeline;
mod prompt;


pub use chunking::{
    detect_language, estimate_tokens, Chunk, ChunkPlan, ChunkPlanner, DegradeStrategy,
    DegradedPlan, PlanOptions,
};
pub use config::{ExtractorConfig, QualityThresholds};
pub use error::ExtractorError;
pub use extractor::{ExtractMetadata, ExtractResult, ExtractStatus, Extractor, CONTENT_TOO_SHORT};
pub use memory::{AcceptedItems, InMemoryRepository, InMemorySink};
pub use merger::{filter_quality, filter_relevance, MergeConfig, MergeMetadata, MergeOutput, Merger};
pub use parser::{normalize_response, parse_llm_response};
pub use pipeline::{DocumentOutcome, IngestReport, Pipeline};
pub use prompt::PromptBuilder;
