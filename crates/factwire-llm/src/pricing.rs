//! Token pricing and cost calculation
//!
//! Prices are per million tokens, keyed `provider:model` with a
//! `provider:default` fallback.

use factwire_domain::TokenUsage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Price used when neither the model nor the provider is configured
const FALLBACK_PRICE: ModelPrice = ModelPrice {
    input: 1.0,
    output: 2.0,
};

/// Per-million-token prices for one model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    /// Price per million prompt tokens
    pub input: f64,
    /// Price per million completion tokens
    pub output: f64,
}

/// Where a looked-up price came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    /// Exact `provider:model` entry
    Exact,
    /// `provider:default` entry
    ProviderDefault,
    /// Built-in fallback
    Fallback,
}

/// Price table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pricing {
    prices: HashMap<String, ModelPrice>,
}

impl Default for Pricing {
    fn default() -> Self {
        let mut pricing = Self::empty();
        pricing.set("deepseek", "deepseek-chat", ModelPrice { input: 1.0, output: 2.0 });
        pricing.set("deepseek", "default", ModelPrice { input: 1.0, output: 2.0 });
        pricing.set("qwen", "qwen-max", ModelPrice { input: 0.8, output: 2.0 });
        pricing.set("qwen", "default", ModelPrice { input: 0.8, output: 2.0 });
        pricing
    }
}

impl Pricing {
    /// A table with no entries
    pub fn empty() -> Self {
        Self {
            prices: HashMap::new(),
        }
    }

    /// Set the price of `provider:model` (use model `default` for the provider fallback)
    pub fn set(&mut self, provider: &str, model: &str, price: ModelPrice) {
        self.prices
            .insert(format!("{}:{}", provider.to_lowercase(), model), price);
    }

    /// Look up the price for a provider and model
    pub fn lookup(&self, provider: &str, model: &str) -> (ModelPrice, PriceSource) {
        let provider = provider.to_lowercase();

        if let Some(price) = self.prices.get(&format!("{}:{}", provider, model)) {
            return (*price, PriceSource::Exact);
        }
        if let Some(price) = self.prices.get(&format!("{}:default", provider)) {
            debug!(provider = %provider, model = %model, "Using provider default price");
            return (*price, PriceSource::ProviderDefault);
        }

        warn!(provider = %provider, "No price configured, using fallback price");
        (FALLBACK_PRICE, PriceSource::Fallback)
    }

    /// Cost of a call, rounded to 6 decimals
    pub fn calculate_cost(&self, provider: &str, model: &str, usage: &TokenUsage) -> f64 {
        let (price, _) = self.lookup(provider, model);
        let input = usage.prompt_tokens as f64 / 1_000_000.0 * price.input;
        let output = usage.completion_tokens as f64 / 1_000_000.0 * price.output;
        round6(input + output)
    }

    /// Estimated cost of `estimated_tokens`, split by `input_ratio` into prompt and completion
    pub fn estimate_cost(
        &self,
        provider: &str,
        model: &str,
        estimated_tokens: u64,
        input_ratio: f64,
    ) -> f64 {
        let prompt = (estimated_tokens as f64 * input_ratio) as u64;
        let completion = (estimated_tokens as f64 * (1.0 - input_ratio)) as u64;
        self.calculate_cost(provider, model, &TokenUsage::new(prompt, completion))
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
