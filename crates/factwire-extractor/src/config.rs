//! Configuration for the Extractor
//!
//! Defaults match the production deployment. Every field can be overridden
//! from TOML or from the environment (see [`ExtractorConfig::from_env`]).

use crate::chunking::{DegradeStrategy, PlanOptions};
use crate::error::ExtractorError;
use factwire_dedup::{DedupConfig, SimilarityConfig};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Minimum quality an item needs to reach downstream scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Items below this confidence are dropped
    pub min_confidence: f64,

    /// Facts shorter than this (chars) are dropped
    pub min_fact_length: usize,

    /// Drop items below their layer's finance-relevance floor
    pub filter_relevance: bool,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
            min_fact_length: 10,
            filter_relevance: true,
        }
    }
}

/// Configuration for the Extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Timeout of a single provider attempt (seconds)
    pub llm_timeout_secs: u64,

    /// Retries per provider after the first attempt
    pub retries_per_provider: u32,

    /// Sampling temperature
    pub temperature: f64,

    /// Share of the model context available to one chunk (0.0-1.0]
    pub chunk_budget: f64,

    /// Model context size in tokens
    pub model_context_limit: usize,

    /// Characters carried from one chunk into the next
    pub overlap_chars: usize,

    /// Chunks per document before the plan is degraded
    pub max_chunks: usize,

    /// What to do with documents that need more than `max_chunks`
    pub degrade_strategy: DegradeStrategy,

    /// Documents with less trimmed content than this (chars) are not extracted
    pub min_content_len: usize,

    /// Concurrent provider calls across the process
    pub max_inflight: Option<usize>,

    /// Allow two documents in flight when `max_inflight` is unset
    pub allow_parallel_articles: bool,

    /// Item quality filter
    pub quality: QualityThresholds,

    /// Document dedup
    pub dedup: DedupConfig,

    /// Fact similarity used when merging chunk results
    pub similarity: SimilarityConfig,
}

impl Default for ExtractorConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            llm_timeout_secs: 90,
            retries_per_provider: 2,
            temperature: 0.3,
            chunk_budget: 0.7,
            model_context_limit: 64_000,
            overlap_chars: 200,
            max_chunks: 8,
            degrade_strategy: DegradeStrategy::SummaryThenExtract,
            min_content_len: 120,
            max_inflight: None,
            allow_parallel_articles: false,
            quality: QualityThresholds::default(),
            dedup: DedupConfig::default(),
            similarity: SimilarityConfig::default(),
        }
    }
}

impl ExtractorConfig {
    /// Aggressive preset: short timeouts, few retries, small chunks
    pub fn aggressive() -> Self {
        Self {
            llm_timeout_secs: 45,
            retries_per_provider: 1,
            chunk_budget: 0.5,
            max_chunks: 4,
            degrade_strategy: DegradeStrategy::HeadNPlusOverall,
            ..Self::default()
        }
    }

    /// Lenient preset: long timeouts, more retries, more chunks
    pub fn lenient() -> Self {
        Self {
            llm_timeout_secs: 180,
            retries_per_provider: 3,
            max_chunks: 16,
            quality: QualityThresholds {
                min_confidence: 0.5,
                ..QualityThresholds::default()
            },
            ..Self::default()
        }
    }

    /// Get the provider timeout as a Duration
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    /// Tokens available to one chunk
    pub fn token_budget(&self) -> usize {
        (self.model_context_limit as f64 * self.chunk_budget) as usize
    }

    /// Options for the chunk planner
    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            token_budget: self.token_budget(),
            overlap_chars: self.overlap_chars,
            max_chunks: self.max_chunks,
            strategy: self.degrade_strategy,
        }
    }

    /// Capacity of the process-wide concurrency controller
    pub fn concurrency_capacity(&self) -> usize {
        match self.max_inflight {
            Some(n) => n.max(1),
            None if self.allow_parallel_articles => 2,
            None => 1,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.llm_timeout_secs == 0 {
            return Err("llm_timeout_secs must be greater than 0".to_string());
        }
        if !(self.chunk_budget > 0.0 && self.chunk_budget <= 1.0) {
            return Err(format!(
                "chunk_budget must be in (0.0, 1.0], got {}",
                self.chunk_budget
            ));
        }
        if self.token_budget() == 0 {
            return Err("model_context_limit * chunk_budget must be at least 1 token".to_string());
        }
        if self.max_chunks == 0 {
            return Err("max_chunks must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be in [0.0, 2.0], got {}",
                self.temperature
            ));
        }
        if !(0.0..=1.0).contains(&self.quality.min_confidence) {
            return Err(format!(
                "min_confidence must be in [0.0, 1.0], got {}",
                self.quality.min_confidence
            ));
        }
        if self.max_inflight == Some(0) {
            return Err("max_inflight must be greater than 0 when set".to_string());
        }
        self.dedup.validate()?;
        self.similarity.validate()?;
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }

    /// Overlay the process environment on the defaults
    pub fn from_env() -> Result<Self, ExtractorError> {
        Self::default().with_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay variables resolved by `lookup` on this configuration
    ///
    /// Unset variables keep the current value; malformed values are
    /// configuration errors.
    pub fn with_lookup<F>(mut self, lookup: F) -> Result<Self, ExtractorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = parse_var(&var, "LLM_TIMEOUT_SEC")? {
            self.llm_timeout_secs = v;
        }
        if let Some(v) = parse_var(&var, "LLM_RETRIES")? {
            self.retries_per_provider = v;
        }
        if let Some(v) = parse_var(&var, "LLM_TEMPERATURE")? {
            self.temperature = v;
        }
        if let Some(v) = parse_var(&var, "LLM_CHUNK_BUDGET")? {
            self.chunk_budget = v;
        }
        if let Some(v) = parse_var(&var, "LLM_MODEL_CONTEXT_LIMIT")? {
            self.model_context_limit = v;
        }
        if let Some(v) = parse_var(&var, "LLM_CHUNK_OVERLAP_CHARS")? {
            self.overlap_chars = v;
        }
        if let Some(v) = parse_var(&var, "LLM_MAX_CHUNKS_PER_ARTICLE")? {
            self.max_chunks = v;
        }
        if let Some(v) = parse_var(&var, "LLM_LONGFORM_STRATEGY")? {
            self.degrade_strategy = v;
        }
        if let Some(v) = parse_var(&var, "MIN_CONTENT_LEN")? {
            self.min_content_len = v;
        }
        if let Some(v) = parse_var(&var, "LLM_MAX_INFLIGHT")? {
            self.max_inflight = Some(v);
        }
        if let Some(raw) = var("LLM_ALLOW_PARALLEL_ARTICLE_PROCESSING") {
            self.allow_parallel_articles = parse_bool(&raw).ok_or_else(|| {
                ExtractorError::Config(format!(
                    "LLM_ALLOW_PARALLEL_ARTICLE_PROCESSING: invalid boolean '{}'",
                    raw
                ))
            })?;
        }
        if let Some(v) = parse_var(&var, "DEDUP_HAMMING_THRESHOLD")? {
            self.dedup.hamming_threshold = v;
        }
        if let Some(v) = parse_var(&var, "CONFIDENCE_THRESHOLD")? {
            self.quality.min_confidence = v;
        }
        if let Some(v) = parse_var(&var, "MIN_FACT_LENGTH")? {
            self.quality.min_fact_length = v;
        }

        self.validate().map_err(ExtractorError::Config)?;
        Ok(self)
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>, ExtractorError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ExtractorError::Config(format!("{}: invalid value '{}': {}", key, raw, e))),
        None => Ok(None),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ExtractorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.token_budget(), 44_800);
        assert_eq!(config.llm_timeout(), Duration::from_secs(90));
        assert_eq!(config.concurrency_capacity(), 1);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(ExtractorConfig::aggressive().validate().is_ok());
        assert!(ExtractorConfig::lenient().validate().is_ok());
        assert!(
            ExtractorConfig::aggressive().llm_timeout_secs
                < ExtractorConfig::lenient().llm_timeout_secs
        );
    }

    #[test]
    fn test_invalid_values() {
        let mut config = ExtractorConfig::default();
        config.chunk_budget = 0.0;
        assert!(config.validate().is_err());

        let mut config = ExtractorConfig::default();
        config.max_chunks = 0;
        assert!(config.validate().is_err());

        let mut config = ExtractorConfig::default();
        config.dedup.hamming_threshold = 65;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_concurrency_capacity() {
        let mut config = ExtractorConfig::default();
        config.allow_parallel_articles = true;
        assert_eq!(config.concurrency_capacity(), 2);

        config.max_inflight = Some(4);
        assert_eq!(config.concurrency_capacity(), 4);
    }

    #[test]
    fn test_env_overrides() {
        let config = ExtractorConfig::default()
            .with_lookup(lookup(&[
                ("LLM_TIMEOUT_SEC", "30"),
                ("LLM_RETRIES", "0"),
                ("LLM_LONGFORM_STRATEGY", "headN_plus_overall"),
                ("LLM_ALLOW_PARALLEL_ARTICLE_PROCESSING", "true"),
                ("CONFIDENCE_THRESHOLD", "0.7"),
                ("DEDUP_HAMMING_THRESHOLD", "5"),
                ("MIN_CONTENT_LEN", ""),
            ]))
            .unwrap();

        assert_eq!(config.llm_timeout_secs, 30);
        assert_eq!(config.retries_per_provider, 0);
        assert_eq!(config.degrade_strategy, DegradeStrategy::HeadNPlusOverall);
        assert!(config.allow_parallel_articles);
        assert_eq!(config.quality.min_confidence, 0.7);
        assert_eq!(config.dedup.hamming_threshold, 5);
        assert_eq!(config.min_content_len, 120);
    }

    #[test]
    fn test_malformed_env_is_an_error() {
        let result = ExtractorConfig::default().with_lookup(lookup(&[("LLM_RETRIES", "many")]));
        assert!(matches!(result, Err(ExtractorError::Config(msg)) if msg.contains("LLM_RETRIES")));

        let result = ExtractorConfig::default()
            .with_lookup(lookup(&[("LLM_ALLOW_PARALLEL_ARTICLE_PROCESSING", "maybe")]));
        assert!(result.is_err());

        let result = ExtractorConfig::default().with_lookup(lookup(&[("LLM_CHUNK_BUDGET", "1.5")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig::aggressive();
        let toml_str = config.to_toml().unwrap();
        let parsed = ExtractorConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml() {
        let config = ExtractorConfig::from_toml(
            r#"
            max_chunks = 3
            degrade_strategy = "headN_plus_overall"

            [quality]
            min_fact_length = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.max_chunks, 3);
        assert_eq!(config.degrade_strategy, DegradeStrategy::HeadNPlusOverall);
        assert_eq!(config.quality.min_fact_length, 20);
        assert_eq!(config.quality.min_confidence, 0.6);
        assert_eq!(config.llm_timeout_secs, 90);
    }
}
