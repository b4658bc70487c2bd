//! Error types for the Extractor

use factwire_dedup::DedupError;
use factwire_llm::GatewayError;
use factwire_queue::QueueError;
use thiserror::Error;

/// Errors that can occur during extraction
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Provider gateway error
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Document repository error
    #[error("Repository error: {0}")]
    Repository(String),

    /// Item sink error
    #[error("Sink error: {0}")]
    Sink(String),

    /// Queue error
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Deduplication error
    #[error("Dedup error: {0}")]
    Dedup(#[from] DedupError),

    /// Provider response is not in the expected shape
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::JsonParse(e.to_string())
    }
}
