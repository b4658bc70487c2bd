//! OpenAI-compatible Provider Implementation
//!
//! Talks to any endpoint exposing `POST {base_url}/chat/completions` with
//! bearer authentication. DeepSeek and Qwen (DashScope compatible mode) are
//! provided as presets.
//!
//! The provider makes exactly one HTTP call per [`ChatProvider::chat`];
//! retries and failover belong to the [`crate::ProviderGateway`].
//!
//! # Examples
//!
//! ```no_run
//! use factwire_llm::OpenAiCompatProvider;
//!
//! let provider = OpenAiCompatProvider::deepseek("sk-...").unwrap();
//! ```

use crate::{ChatMessage, ChatProvider, ChatRequest, ChatResponse, LlmError};
use async_trait::async_trait;
use factwire_domain::TokenUsage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default DeepSeek endpoint
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Default DeepSeek model
pub const DEEPSEEK_MODEL: &str = "deepseek-chat";

/// Default Qwen endpoint (DashScope OpenAI-compatible mode)
pub const QWEN_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Default Qwen model
pub const QWEN_MODEL: &str = "qwen-max";

/// Provider for OpenAI-compatible chat-completion APIs
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

/// Request body for the chat completions API
#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    stream: bool,
}

/// Response from the chat completions API
#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

impl OpenAiCompatProvider {
    /// Create a new provider
    ///
    /// # Parameters
    ///
    /// - `name`: Provider name used in logs and pricing (e.g., "deepseek")
    /// - `base_url`: API root, without the `/chat/completions` suffix
    /// - `model`: Model to request
    /// - `api_key`: Bearer token
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        let name = name.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Config(format!("{}: API key is empty", name)));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            name,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            client,
        })
    }

    /// DeepSeek preset
    pub fn deepseek(api_key: impl Into<String>) -> Result<Self, LlmError> {
        Self::new("deepseek", DEEPSEEK_BASE_URL, DEEPSEEK_MODEL, api_key)
    }

    /// Qwen preset
    pub fn qwen(api_key: impl Into<String>) -> Result<Self, LlmError> {
        Self::new("qwen", QWEN_BASE_URL, QWEN_MODEL, api_key)
    }

    /// API root
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_status(&self, status: reqwest::StatusCode, body: String) -> LlmError {
        match status {
            reqwest::StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimitExceeded,
            reqwest::StatusCode::NOT_FOUND => LlmError::ModelNotAvailable(self.model.clone()),
            _ => LlmError::Api {
                status: status.as_u16(),
                message: body,
            },
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            stream: false,
        };

        debug!(provider = %self.name, model = %self.model, "Sending chat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(request.timeout)
                } else {
                    LlmError::Communication(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(self.map_status(status, text));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("Response has no choices".to_string()))?;

        let usage = completion
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            model: completion.model.unwrap_or_else(|| self.model.clone()),
            usage,
            finish_reason: choice.finish_reason,
        })
    }
}
