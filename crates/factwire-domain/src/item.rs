//! Item module - structured facts extracted from a document

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Geographic region an item concerns
///
/// Labels are accepted in English snake_case or in the Chinese form the
/// extraction prompt asks for. Anything unrecognised becomes `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Region {
    /// Domestic (国内)
    Domestic,

    /// Foreign (国外)
    Foreign,

    /// Not determined (未知)
    #[default]
    Unknown,
}

impl Region {
    /// Get the canonical label
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Domestic => "domestic",
            Region::Foreign => "foreign",
            Region::Unknown => "unknown",
        }
    }

    /// Get the Chinese label used in prompts and reports
    pub fn zh_label(&self) -> &'static str {
        match self {
            Region::Domestic => "国内",
            Region::Foreign => "国外",
            Region::Unknown => "未知",
        }
    }

    /// Parse a label strictly, returning `None` when it is not recognised
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "domestic" | "国内" => Some(Region::Domestic),
            "foreign" | "国外" => Some(Region::Foreign),
            "unknown" | "未知" | "" => Some(Region::Unknown),
            _ => None,
        }
    }

    /// Parse a label leniently: unrecognised labels map to `Unknown`
    pub fn from_label(s: &str) -> Self {
        Self::parse(s).unwrap_or(Region::Unknown)
    }

    /// Whether the region is known
    pub fn is_known(&self) -> bool {
        !matches!(self, Region::Unknown)
    }
}

/// Topical layer an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Layer {
    /// Monetary policy and financial regulation (金融政策监管)
    FinancialPolicy,

    /// Markets, deals and institution results (金融经济)
    FinancialEconomy,

    /// Large-model technology (金融大模型技术)
    FinancialAiModels,

    /// Technology applied in finance (金融科技应用)
    FintechApplications,

    /// Not determined (未知)
    #[default]
    Unknown,
}

impl Layer {
    /// Get the canonical label
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::FinancialPolicy => "financial_policy",
            Layer::FinancialEconomy => "financial_economy",
            Layer::FinancialAiModels => "financial_ai_models",
            Layer::FintechApplications => "fintech_applications",
            Layer::Unknown => "unknown",
        }
    }

    /// Get the Chinese label used in prompts and reports
    pub fn zh_label(&self) -> &'static str {
        match self {
            Layer::FinancialPolicy => "金融政策监管",
            Layer::FinancialEconomy => "金融经济",
            Layer::FinancialAiModels => "金融大模型技术",
            Layer::FintechApplications => "金融科技应用",
            Layer::Unknown => "未知",
        }
    }

    /// Parse a label strictly, returning `None` when it is not recognised
    ///
    /// Legacy labels from the earlier taxonomy (`政治`, `经济`, `金融科技`)
    /// map onto their current layers.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "financial_policy" | "金融政策监管" | "政治" | "politics" => {
                Some(Layer::FinancialPolicy)
            }
            "financial_economy" | "金融经济" | "经济" | "economy" => Some(Layer::FinancialEconomy),
            "financial_ai_models" | "金融大模型技术" | "fintech_ai" => {
                Some(Layer::FinancialAiModels)
            }
            "fintech_applications" | "金融科技应用" | "金融科技" | "fintech" => {
                Some(Layer::FintechApplications)
            }
            "unknown" | "未知" | "" => Some(Layer::Unknown),
            _ => None,
        }
    }

    /// Parse a label leniently: unrecognised labels map to `Unknown`
    pub fn from_label(s: &str) -> Self {
        Self::parse(s).unwrap_or(Layer::Unknown)
    }

    /// Whether the layer is known
    pub fn is_known(&self) -> bool {
        !matches!(self, Layer::Unknown)
    }

    /// Minimum finance relevance an item of this layer needs to be kept
    ///
    /// Model-technology news matters even when its finance link is weak,
    /// so that layer uses a lower bar.
    pub fn min_finance_relevance(&self) -> f64 {
        match self {
            Layer::FinancialAiModels => 0.2,
            _ => 0.4,
        }
    }
}

macro_rules! label_serde {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s).ok_or_else(|| format!("Invalid label: {}", s))
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let label = Option::<String>::deserialize(deserializer)?;
                Ok(label.as_deref().map(Self::from_label).unwrap_or_default())
            }
        }
    };
}

label_serde!(Region);
label_serde!(Layer);

fn default_relevance() -> f64 {
    1.0
}

/// A single fact (with optional opinion) extracted from a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedItem {
    /// Objective statement of what happened
    pub fact: String,

    /// Opinion or forecast attached to the fact
    #[serde(default)]
    pub opinion: Option<String>,

    /// Region the fact concerns
    #[serde(default)]
    pub region: Region,

    /// Topical layer
    #[serde(default)]
    pub layer: Layer,

    /// Source passage supporting the fact
    #[serde(default)]
    pub evidence_span: Option<String>,

    /// Model confidence (0.0-1.0)
    #[serde(default)]
    pub confidence: f64,

    /// Relevance to the finance industry (0.0-1.0)
    #[serde(default = "default_relevance")]
    pub finance_relevance: f64,
}

impl ExtractedItem {
    /// Create an item with unknown region and layer
    pub fn new(fact: impl Into<String>, confidence: f64) -> Self {
        Self {
            fact: fact.into(),
            opinion: None,
            region: Region::Unknown,
            layer: Layer::Unknown,
            evidence_span: None,
            confidence: confidence.clamp(0.0, 1.0),
            finance_relevance: 1.0,
        }
    }

    /// Set the region
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Set the layer
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    /// Set the opinion
    pub fn with_opinion(mut self, opinion: impl Into<String>) -> Self {
        self.opinion = Some(opinion.into());
        self
    }

    /// Set the finance relevance
    pub fn with_finance_relevance(mut self, relevance: f64) -> Self {
        self.finance_relevance = relevance.clamp(0.0, 1.0);
        self
    }
}
