//! Dedup configuration

use serde::{Deserialize, Serialize};

/// Configuration for document deduplication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Fingerprints within this Hamming distance are duplicates (0-64)
    pub hamming_threshold: u32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            hamming_threshold: 3,
        }
    }
}

impl DedupConfig {
    /// Only suppress exact content matches
    pub fn strict() -> Self {
        Self {
            hamming_threshold: 0,
        }
    }

    /// Suppress looser rewrites of the same story
    pub fn lenient() -> Self {
        Self {
            hamming_threshold: 6,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.hamming_threshold > 64 {
            return Err(format!(
                "hamming_threshold must be at most 64, got {}",
                self.hamming_threshold
            ));
        }
        Ok(())
    }
}

/// Configuration for fact similarity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Fingerprint distance at or below which two facts are similar
    pub hamming_threshold: u32,

    /// Edit similarity above which short facts are similar (0.0-1.0)
    pub edit_similarity: f64,

    /// Edit-distance fallback only applies to facts shorter than this (chars)
    pub edit_max_len: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            hamming_threshold: 3,
            edit_similarity: 0.85,
            edit_max_len: 50,
        }
    }
}

impl SimilarityConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.hamming_threshold > 64 {
            return Err(format!(
                "hamming_threshold must be at most 64, got {}",
                self.hamming_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.edit_similarity) {
            return Err(format!(
                "edit_similarity must be between 0.0 and 1.0, got {}",
                self.edit_similarity
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DedupConfig::default();
        assert_eq!(config.hamming_threshold, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        assert_eq!(DedupConfig::strict().hamming_threshold, 0);
        assert_eq!(DedupConfig::lenient().hamming_threshold, 6);
    }

    #[test]
    fn test_invalid_threshold() {
        let config = DedupConfig {
            hamming_threshold: 65,
        };
        assert!(config.validate().is_err());

        let similarity = SimilarityConfig {
            edit_similarity: 1.5,
            ..Default::default()
        };
        assert!(similarity.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SimilarityConfig = toml::from_str("hamming_threshold = 5").unwrap();
        assert_eq!(config.hamming_threshold, 5);
        assert_eq!(config.edit_max_len, 50);
    }
}
