//! Fingerprint command implementation.

use crate::cli::FingerprintArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use factwire_dedup::{fingerprint, hamming_distance, is_duplicate};
use serde::{Deserialize, Serialize};
use std::fs;

/// Fingerprints of one or two texts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintReport {
    /// Fingerprint of the first text
    pub first: i64,
    /// Fingerprint of the second text
    pub second: Option<i64>,
    /// Hamming distance between the two
    pub distance: Option<u32>,
    /// Threshold used for the comparison
    pub threshold: u32,
    /// Whether the texts are near-duplicates
    pub duplicate: Option<bool>,
}

/// Execute the fingerprint command.
pub fn execute_fingerprint(
    args: FingerprintArgs,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let report = run_fingerprint(&args, config)?;
    println!("{}", formatter.format_fingerprints(&report)?);
    Ok(())
}

/// Fingerprint the files named in `args`
pub fn run_fingerprint(args: &FingerprintArgs, config: &Config) -> Result<FingerprintReport> {
    let threshold = args
        .threshold
        .unwrap_or(config.extractor.dedup.hamming_threshold);
    let first = fingerprint(&fs::read_to_string(&args.first)?);

    let second = match &args.second {
        Some(path) => Some(fingerprint(&fs::read_to_string(path)?)),
        None => None,
    };

    Ok(FingerprintReport {
        first,
        second,
        distance: second.map(|b| hamming_distance(first, b)),
        threshold,
        duplicate: second.map(|b| is_duplicate(first, b, threshold)),
    })
}
