//! Provider settings from the environment
//!
//! Each known provider reads `PROVIDER_<NAME>_API_KEY`, `_BASE_URL` and
//! `_MODEL`. Providers without an API key are skipped. `LLM_PROVIDER_ORDER`
//! (comma separated) reorders or limits the list; by default DeepSeek is
//! tried before Qwen.

use crate::openai::{DEEPSEEK_BASE_URL, DEEPSEEK_MODEL, QWEN_BASE_URL, QWEN_MODEL};
use crate::{ChatProvider, LlmError, OpenAiCompatProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Known providers with their default endpoint and model, in default priority order
const KNOWN_PROVIDERS: &[(&str, &str, &str)] = &[
    ("deepseek", DEEPSEEK_BASE_URL, DEEPSEEK_MODEL),
    ("qwen", QWEN_BASE_URL, QWEN_MODEL),
];

/// Connection settings for one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Provider name
    pub name: String,
    /// API root
    pub base_url: String,
    /// Model to request
    pub model: String,
    /// Bearer token
    #[serde(default, skip_serializing)]
    pub api_key: String,
}

impl ProviderSettings {
    /// Read settings for every configured provider from the process environment
    pub fn from_env() -> Result<Vec<Self>, LlmError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings using `lookup` to resolve variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Vec<Self>, LlmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let order: Vec<String> = match lookup("LLM_PROVIDER_ORDER") {
            Some(raw) if !raw.trim().is_empty() => raw
                .split(',')
                .map(|name| name.trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
            _ => KNOWN_PROVIDERS
                .iter()
                .map(|(name, _, _)| name.to_string())
                .collect(),
        };

        let mut settings = Vec::new();
        for name in order {
            let (_, default_url, default_model) = KNOWN_PROVIDERS
                .iter()
                .find(|(known, _, _)| *known == name)
                .ok_or_else(|| {
                    LlmError::Config(format!("Unknown provider in LLM_PROVIDER_ORDER: {}", name))
                })?;

            let prefix = format!("PROVIDER_{}", name.to_uppercase());
            let api_key = match lookup(&format!("{}_API_KEY", prefix)) {
                Some(key) if !key.trim().is_empty() => key,
                _ => {
                    warn!(provider = %name, "No API key configured, provider skipped");
                    continue;
                }
            };

            settings.push(Self {
                base_url: lookup(&format!("{}_BASE_URL", prefix))
                    .unwrap_or_else(|| default_url.to_string()),
                model: lookup(&format!("{}_MODEL", prefix))
                    .unwrap_or_else(|| default_model.to_string()),
                name,
                api_key,
            });
        }

        info!(
            providers = ?settings.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            "Provider settings loaded"
        );
        Ok(settings)
    }

    /// Build a provider from these settings
    pub fn build(&self) -> Result<Arc<dyn ChatProvider>, LlmError> {
        let provider =
            OpenAiCompatProvider::new(&self.name, &self.base_url, &self.model, &self.api_key)?;
        Ok(Arc::new(provider))
    }

    /// Build providers for a list of settings, preserving order
    pub fn build_all(settings: &[Self]) -> Result<Vec<Arc<dyn ChatProvider>>, LlmError> {
        settings.iter().map(Self::build).collect()
    }
}
