//! Document deduplication
//!
//! Two levels: URL identity against everything already stored, then content
//! fingerprints against stored fingerprints and against earlier documents of
//! the same batch. The first occurrence always wins.

use crate::fingerprint::{fingerprint, is_duplicate};
use crate::{DedupConfig, DedupError};
use factwire_domain::Document;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::{debug, info};

/// What is already known to the persistence layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupSnapshot {
    /// URLs of stored documents
    #[serde(default)]
    pub existing_urls: HashSet<String>,

    /// Fingerprints of stored documents
    #[serde(default)]
    pub existing_fingerprints: Vec<i64>,
}

/// Counts from one deduplication run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupReport {
    /// Documents handed in
    pub input: usize,

    /// Dropped for a missing URL
    pub missing_url: usize,

    /// Dropped because the URL was already seen
    pub duplicate_url: usize,

    /// Dropped for empty content
    pub empty_content: usize,

    /// Dropped as content near-duplicates
    pub near_duplicate: usize,

    /// Documents kept
    pub kept: usize,
}

/// Surviving documents plus the counts of what was dropped
#[derive(Debug, Clone)]
pub struct DedupOutcome {
    /// Documents that survived, in input order, with fingerprint and dedup key set
    pub documents: Vec<Document>,

    /// Counts
    pub report: DedupReport,
}

/// Document deduplicator
pub struct Deduplicator {
    config: DedupConfig,
}

impl Deduplicator {
    /// Create a deduplicator, validating the configuration
    pub fn new(config: DedupConfig) -> Result<Self, DedupError> {
        config.validate().map_err(DedupError::Config)?;
        Ok(Self { config })
    }

    /// Create a deduplicator with the default threshold
    pub fn default_config() -> Self {
        Self {
            config: DedupConfig::default(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Drop documents whose identity URL is empty or already seen
    pub fn dedup_by_url(
        &self,
        documents: Vec<Document>,
        existing_urls: &HashSet<String>,
    ) -> Vec<Document> {
        self.url_pass(documents, existing_urls, &mut DedupReport::default())
    }

    /// Drop documents with empty content or a near-duplicate fingerprint
    ///
    /// Computes and stores the fingerprint of every surviving document.
    pub fn dedup_by_fingerprint(
        &self,
        documents: Vec<Document>,
        existing_fingerprints: &[i64],
    ) -> Vec<Document> {
        self.fingerprint_pass(documents, existing_fingerprints, &mut DedupReport::default())
    }

    /// Run URL then fingerprint deduplication and stamp dedup keys
    pub fn deduplicate(&self, documents: Vec<Document>, snapshot: &DedupSnapshot) -> DedupOutcome {
        let mut report = DedupReport {
            input: documents.len(),
            ..Default::default()
        };

        if documents.is_empty() {
            return DedupOutcome {
                documents,
                report,
            };
        }

        let documents = self.url_pass(documents, &snapshot.existing_urls, &mut report);
        let mut documents =
            self.fingerprint_pass(documents, &snapshot.existing_fingerprints, &mut report);

        for document in &mut documents {
            document.dedup_key = Some(dedup_key(document));
        }
        report.kept = documents.len();

        info!(
            input = report.input,
            kept = report.kept,
            duplicate_url = report.duplicate_url,
            near_duplicate = report.near_duplicate,
            "Deduplication complete"
        );

        DedupOutcome { documents, report }
    }

    fn url_pass(
        &self,
        documents: Vec<Document>,
        existing_urls: &HashSet<String>,
        report: &mut DedupReport,
    ) -> Vec<Document> {
        let input = documents.len();
        let mut seen: HashSet<String> = existing_urls.clone();
        let mut unique = Vec::with_capacity(documents.len());

        for document in documents {
            let url = document.identity_url();
            if url.is_empty() {
                debug!(document_id = %document.id, "Skipping document without URL");
                report.missing_url += 1;
                continue;
            }
            if !seen.insert(url.to_string()) {
                debug!(url = %url, "Skipping duplicate URL");
                report.duplicate_url += 1;
                continue;
            }
            unique.push(document);
        }

        debug!(input, kept = unique.len(), "URL dedup");
        unique
    }

    fn fingerprint_pass(
        &self,
        documents: Vec<Document>,
        existing_fingerprints: &[i64],
        report: &mut DedupReport,
    ) -> Vec<Document> {
        let input = documents.len();
        let mut seen: Vec<i64> = existing_fingerprints.to_vec();
        let mut unique = Vec::with_capacity(documents.len());

        for mut document in documents {
            if document.content_text.is_empty() {
                report.empty_content += 1;
                continue;
            }

            let hash = fingerprint(&document.content_text);
            document.fingerprint = Some(hash);

            let threshold = self.config.hamming_threshold;
            if seen.iter().any(|existing| is_duplicate(hash, *existing, threshold)) {
                debug!(title = %document.title, "Skipping near-duplicate content");
                report.near_duplicate += 1;
                continue;
            }

            seen.push(hash);
            unique.push(document);
        }

        debug!(input, kept = unique.len(), "Fingerprint dedup");
        unique
    }
}

/// Stable identity key over URL, title and publication time
///
/// Hex SHA-256 of `"{canonical_or_url}|{title}|{published_at}"`.
pub fn dedup_key(document: &Document) -> String {
    let key = format!(
        "{}|{}|{}",
        document.identity_url(),
        document.title,
        document.published_at.as_deref().unwrap_or("")
    );
    hex::encode(Sha256::digest(key.as_bytes()))
}
