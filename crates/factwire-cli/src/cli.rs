//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use factwire_domain::Language;
use std::path::PathBuf;

/// Factwire CLI - Turn crawled news documents into structured facts.
#[derive(Debug, Parser)]
#[command(name = "factwire")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true, env = "FACTWIRE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (IDs and statuses only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Deduplicate, queue and extract document JSON files once
    Extract(ExtractArgs),

    /// Show how a text would be chunked
    Plan(PlanArgs),

    /// Compute and compare content fingerprints
    Fingerprint(FingerprintArgs),
}

/// Arguments for the extract command.
#[derive(Debug, Clone, Parser)]
pub struct ExtractArgs {
    /// Document JSON files (one document or an array per file)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// JSON file with already stored URLs and fingerprints
    #[arg(short, long)]
    pub snapshot: Option<PathBuf>,

    /// Answer every provider call with the contents of this file instead of calling an LLM
    #[arg(long)]
    pub mock_reply: Option<PathBuf>,

    /// Write the extracted items as JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Queue priority of the documents
    #[arg(short, long)]
    pub priority: Option<i32>,
}

/// Arguments for the plan command.
#[derive(Debug, Clone, Parser)]
pub struct PlanArgs {
    /// Plain text file, or a document JSON file with --document
    pub file: PathBuf,

    /// Read the file as a document JSON and plan its content
    #[arg(short, long)]
    pub document: bool,

    /// Language used for token estimation (detected when omitted)
    #[arg(short, long, value_enum)]
    pub lang: Option<LangArg>,
}

/// Arguments for the fingerprint command.
#[derive(Debug, Clone, Parser)]
pub struct FingerprintArgs {
    /// First text file
    pub first: PathBuf,

    /// Second text file to compare against
    pub second: Option<PathBuf>,

    /// Maximum Hamming distance for a near-duplicate
    #[arg(short, long)]
    pub threshold: Option<u32>,
}

/// Language argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LangArg {
    /// Chinese
    Zh,
    /// English
    En,
    /// Mixed Chinese and English
    Mixed,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<LangArg> for Language {
    fn from(lang: LangArg) -> Self {
        match lang {
            LangArg::Zh => Language::Zh,
            LangArg::En => Language::En,
            LangArg::Mixed => Language::Mixed,
        }
    }
}
