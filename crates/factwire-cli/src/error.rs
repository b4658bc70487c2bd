//! Error types for the CLI application.

use factwire_extractor::ExtractorError;
use factwire_llm::LlmError;
use factwire_queue::QueueError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Extraction error
    #[error("Extraction error: {0}")]
    Extractor(#[from] ExtractorError),

    /// Provider setup error
    #[error("Provider error: {0}")]
    Llm(#[from] LlmError),

    /// Queue error
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
