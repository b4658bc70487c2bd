//! Factwire LLM Provider Layer
//!
//! Chat-completion providers and the gateway that routes extraction calls
//! across them.
//!
//! # Architecture
//!
//! Every backend implements the async [`ChatProvider`] trait. A
//! [`ProviderGateway`] holds an ordered, immutable provider list and fails
//! over between them; a [`ConcurrencyController`] caps how many gateway
//! calls are in flight across the whole process.
//!
//! # Providers
//!
//! - `MockProvider`: Scripted provider for testing
//! - `OpenAiCompatProvider`: Any `/chat/completions` endpoint (DeepSeek, Qwen)
//!
//! # Examples
//!
//! ```
//! use factwire_llm::{ChatMessage, ChatProvider, ChatRequest, MockProvider};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let provider = MockProvider::new("mock", r#"{"items": []}"#);
//! let request = ChatRequest::new(vec![ChatMessage::user("hi")], 0.3, Duration::from_secs(5));
//! let response = provider.chat(&request).await.unwrap();
//! assert_eq!(response.content, r#"{"items": []}"#);
//! # }
//! ```

#![warn(missing_docs)]

pub mod backoff;
pub mod concurrency;
pub mod gateway;
pub mod openai;
pub mod pricing;
pub mod settings;

use async_trait::async_trait;
use factwire_domain::TokenUsage;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

pub use backoff::BackoffPolicy;
pub use concurrency::ConcurrencyController;
pub use gateway::{GatewayError, ProviderGateway};
pub use openai::OpenAiCompatProvider;
pub use pricing::{ModelPrice, PriceSource, Pricing};
pub use settings::ProviderSettings;

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// The call did not finish within its deadline
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Non-success HTTP status from the provider
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Provider configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Whether retrying the same provider may succeed
    ///
    /// Timeouts, network failures, rate limiting and 5xx responses are
    /// transient; everything else moves on to the next provider.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Timeout(_) | LlmError::Communication(_) | LlmError::RateLimitExceeded => {
                true
            }
            LlmError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions for the model
    System,
    /// Caller input
    User,
    /// Model output
    Assistant,
}

/// One message of a chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who is speaking
    pub role: ChatRole,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// A system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// A user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A chat-completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Conversation so far
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f64,
    /// Deadline for the whole call
    pub timeout: Duration,
}

impl ChatRequest {
    /// Create a request
    pub fn new(messages: Vec<ChatMessage>, temperature: f64, timeout: Duration) -> Self {
        Self {
            messages,
            temperature,
            timeout,
        }
    }
}

/// A normalised chat-completion response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Text of the first choice
    pub content: String,
    /// Model that answered
    pub model: String,
    /// Token accounting
    pub usage: TokenUsage,
    /// Why generation stopped
    pub finish_reason: Option<String>,
}

/// Trait implemented by every chat-completion backend
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name used in logs, results and pricing
    fn name(&self) -> &str;

    /// Model the provider calls
    fn model(&self) -> &str;

    /// Run one chat completion
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError>;
}

/// Mock provider for deterministic testing
///
/// Replies come from a script (consumed in order) and then from a fixed
/// fallback reply. Clones share the script and all counters.
///
/// # Examples
///
/// ```
/// use factwire_llm::{LlmError, MockProvider};
///
/// let provider = MockProvider::new("mock", "fallback");
/// provider.push_error(LlmError::RateLimitExceeded);
/// provider.push_response("first");
/// assert_eq!(provider.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    name: String,
    model: String,
    fallback: Result<String, LlmError>,
    script: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    usage: TokenUsage,
    latency: Option<Duration>,
    call_count: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a provider that answers every call with `response`
    pub fn new(name: impl Into<String>, response: impl Into<String>) -> Self {
        Self::with_fallback(name, Ok(response.into()))
    }

    /// Create a provider that fails every call with `error`
    pub fn failing(name: impl Into<String>, error: LlmError) -> Self {
        Self::with_fallback(name, Err(error))
    }

    fn with_fallback(name: impl Into<String>, fallback: Result<String, LlmError>) -> Self {
        Self {
            name: name.into(),
            model: "mock-model".to_string(),
            fallback,
            script: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            usage: TokenUsage::new(100, 20),
            latency: None,
            call_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delay every reply by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Set the model name reported in responses
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the token usage reported for each successful call
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Queue a successful reply
    pub fn push_response(&self, response: impl Into<String>) {
        self.script.lock().unwrap().push_back(Ok(response.into()));
    }

    /// Queue a failure
    pub fn push_error(&self, error: LlmError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    /// Get the number of times chat was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        self.call_count.store(0, Ordering::SeqCst);
    }

    /// Highest number of concurrent calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Counts a call as in flight until dropped, including when the call's
/// future is cancelled mid-sleep
struct InFlightGuard<'a> {
    in_flight: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
    fn enter(in_flight: &'a AtomicUsize, max_in_flight: &AtomicUsize) -> Self {
        let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        max_in_flight.fetch_max(current, Ordering::SeqCst);
        Self { in_flight }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let _guard = InFlightGuard::enter(&self.in_flight, &self.max_in_flight);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        reply.map(|content| ChatResponse {
            content,
            model: self.model.clone(),
            usage: self.usage,
            finish_reason: Some("stop".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::user("prompt")], 0.3, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_mock_provider_default() {
        let provider = MockProvider::new("mock", "Test response");
        let response = provider.chat(&request()).await.unwrap();
        assert_eq!(response.content, "Test response");
        assert_eq!(response.usage.total_tokens, 120);
    }

    #[tokio::test]
    async fn test_mock_provider_script_then_fallback() {
        let provider = MockProvider::new("mock", "fallback");
        provider.push_error(LlmError::RateLimitExceeded);
        provider.push_response("scripted");

        assert_eq!(
            provider.chat(&request()).await.unwrap_err(),
            LlmError::RateLimitExceeded
        );
        assert_eq!(provider.chat(&request()).await.unwrap().content, "scripted");
        assert_eq!(provider.chat(&request()).await.unwrap().content, "fallback");
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_provider_failing() {
        let provider = MockProvider::failing("down", LlmError::Communication("refused".into()));
        assert!(provider.chat(&request()).await.is_err());
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_provider_clone_shares_counters() {
        let provider1 = MockProvider::new("mock", "test");
        let provider2 = provider1.clone();

        provider1.chat(&request()).await.unwrap();

        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);

        provider2.reset_call_count();
        assert_eq!(provider1.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_provider_cancelled_call_leaves_flight() {
        let provider = MockProvider::new("slow", "late").with_latency(Duration::from_millis(200));

        let cancelled =
            tokio::time::timeout(Duration::from_millis(10), provider.chat(&request())).await;
        assert!(cancelled.is_err());

        let fast = provider.clone().with_latency(Duration::ZERO);
        assert_eq!(fast.chat(&request()).await.unwrap().content, "late");
        assert_eq!(provider.max_in_flight(), 1);
    }

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(LlmError::Communication("reset".into()).is_transient());
        assert!(LlmError::RateLimitExceeded.is_transient());
        assert!(LlmError::Api { status: 503, message: String::new() }.is_transient());

        assert!(!LlmError::Api { status: 400, message: String::new() }.is_transient());
        assert!(!LlmError::InvalidResponse("bad".into()).is_transient());
        assert!(!LlmError::ModelNotAvailable("m".into()).is_transient());
        assert!(!LlmError::Config("no key".into()).is_transient());
    }
}
