//! Configuration management for the CLI.
//!
//! Settings come from a TOML file (`--config`, or `~/.factwire/config.toml`
//! when present) and are then overlaid with the process environment.

use crate::error::{CliError, Result};
use factwire_extractor::ExtractorConfig;
use factwire_queue::QueueConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Extraction settings
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Queue worker settings
    #[serde(default)]
    pub queue: QueueConfig,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".factwire").join("config.toml"))
    }

    /// Load configuration and overlay the process environment.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::path() {
                Ok(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };

        config.with_env(|key| std::env::var(key).ok())
    }

    /// Read a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Overlay variables resolved by `lookup` and validate the result.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.extractor = self.extractor.with_lookup(lookup)?;
        self.queue.validate().map_err(CliError::Config)?;
        Ok(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}
