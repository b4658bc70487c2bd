//! Per-chunk extraction results

use crate::ExtractedItem;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Token accounting reported by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u64,

    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u64,

    /// Total tokens billed
    #[serde(default)]
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create a usage record, deriving the total
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Outcome of a single chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    /// The provider answered and the answer parsed
    Success,
    /// All providers failed or the answer did not parse
    Failed,
}

/// Result of extracting one chunk of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResult {
    /// Position of the chunk in the plan
    pub chunk_index: usize,

    /// Whether the chunk succeeded
    pub status: ChunkStatus,

    /// Items extracted from the chunk (empty on failure)
    pub items: Vec<ExtractedItem>,

    /// Tokens consumed
    pub usage: TokenUsage,

    /// Provider that served the chunk
    pub provider: Option<String>,

    /// Model named in the provider's response
    #[serde(default)]
    pub model: Option<String>,

    /// Cost of the chunk in USD, when pricing is configured
    #[serde(default)]
    pub cost: Option<f64>,

    /// Failure reason
    pub error: Option<String>,
}

impl ProviderResult {
    /// A successful chunk result
    pub fn success(
        chunk_index: usize,
        items: Vec<ExtractedItem>,
        usage: TokenUsage,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            chunk_index,
            status: ChunkStatus::Success,
            items,
            usage,
            provider: Some(provider.into()),
            model: None,
            cost: None,
            error: None,
        }
    }

    /// A failed chunk result
    pub fn failed(chunk_index: usize, error: impl Into<String>) -> Self {
        Self {
            chunk_index,
            status: ChunkStatus::Failed,
            items: Vec::new(),
            usage: TokenUsage::default(),
            provider: None,
            model: None,
            cost: None,
            error: Some(error.into()),
        }
    }

    /// Record the model that answered
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Record the chunk's cost
    pub fn with_cost(mut self, cost: Option<f64>) -> Self {
        self.cost = cost;
        self
    }

    /// Whether the chunk succeeded
    pub fn is_success(&self) -> bool {
        self.status == ChunkStatus::Success
    }
}
