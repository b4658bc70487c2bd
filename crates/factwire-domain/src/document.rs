//! Document module - the unit of work handed over by the crawler

use crate::Language;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a document based on UUIDv7
///
/// UUIDv7 gives chronological sortability, so queue listings and audit
/// trails order naturally by ingestion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(uuid::Uuid);

impl DocumentId {
    /// Generate a new UUIDv7-based DocumentId
    ///
    /// # Examples
    ///
    /// ```
    /// use factwire_domain::DocumentId;
    ///
    /// let id = DocumentId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Create a DocumentId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(uuid::Uuid::from_u128(value))
    }

    /// Parse a DocumentId from its string form
    ///
    /// # Examples
    ///
    /// ```
    /// use factwire_domain::DocumentId;
    ///
    /// let id = DocumentId::new();
    /// let parsed = DocumentId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid document id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0.as_u128()
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Processing status of a document as seen by the rest of the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    /// Freshly crawled, not yet considered for extraction
    #[default]
    Raw,
    /// Accepted by dedup and waiting in the extraction queue
    Queued,
    /// Extraction in progress
    Running,
    /// Every chunk extracted successfully
    Done,
    /// Extraction failed (input rejected or every chunk failed)
    Failed,
    /// Some chunks failed, the rest produced items
    Partial,
}

impl ProcessingStatus {
    /// Get the status name as stored by the persistence layer
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Raw => "raw",
            ProcessingStatus::Queued => "queued",
            ProcessingStatus::Running => "running",
            ProcessingStatus::Done => "done",
            ProcessingStatus::Failed => "failed",
            ProcessingStatus::Partial => "partial",
        }
    }

    /// Parse a status from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "raw" => Some(ProcessingStatus::Raw),
            "queued" => Some(ProcessingStatus::Queued),
            "running" => Some(ProcessingStatus::Running),
            "done" => Some(ProcessingStatus::Done),
            "failed" => Some(ProcessingStatus::Failed),
            "partial" => Some(ProcessingStatus::Partial),
            _ => None,
        }
    }

    /// Whether processing has finished (successfully or not)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessingStatus::Done | ProcessingStatus::Failed | ProcessingStatus::Partial
        )
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A crawled news document
///
/// Created by the crawler collaborator. Field names are accepted in both
/// snake_case and the crawler's camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier
    #[serde(default)]
    pub id: DocumentId,

    /// Identifier of the source (feed or site) that produced the document
    #[serde(alias = "sourceId")]
    pub source_id: String,

    /// Human-readable source name
    #[serde(default, alias = "sourceName")]
    pub source_name: String,

    /// URL the document was fetched from
    pub url: String,

    /// Canonical URL if the page declared one
    #[serde(default, alias = "canonicalUrl")]
    pub canonical_url: Option<String>,

    /// Article title
    #[serde(default)]
    pub title: String,

    /// Extracted body text
    #[serde(default, alias = "contentText")]
    pub content_text: String,

    /// Publication time as reported by the source
    #[serde(default, alias = "publishedAt")]
    pub published_at: Option<String>,

    /// Language hint supplied by the crawler, if any
    #[serde(default, alias = "langHint", alias = "lang")]
    pub lang_hint: Option<Language>,

    /// Where the document is in its processing lifetime
    #[serde(default, alias = "processingStatus")]
    pub processing_status: ProcessingStatus,

    /// Content fingerprint, once computed
    #[serde(default)]
    pub fingerprint: Option<i64>,

    /// Identity key over URL, title and publication time, once computed
    #[serde(default, alias = "dedupKey")]
    pub dedup_key: Option<String>,
}

impl Document {
    /// Create a new raw document
    pub fn new(
        source_id: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
        content_text: impl Into<String>,
    ) -> Self {
        Self {
            id: DocumentId::new(),
            source_id: source_id.into(),
            source_name: String::new(),
            url: url.into(),
            canonical_url: None,
            title: title.into(),
            content_text: content_text.into(),
            published_at: None,
            lang_hint: None,
            processing_status: ProcessingStatus::Raw,
            fingerprint: None,
            dedup_key: None,
        }
    }

    /// Set the publication time
    pub fn with_published_at(mut self, published_at: impl Into<String>) -> Self {
        self.published_at = Some(published_at.into());
        self
    }

    /// Set the canonical URL
    pub fn with_canonical_url(mut self, canonical_url: impl Into<String>) -> Self {
        self.canonical_url = Some(canonical_url.into());
        self
    }

    /// Content length in characters
    pub fn content_len(&self) -> usize {
        self.content_text.chars().count()
    }

    /// The URL used for identity: canonical if present and non-empty, else the fetch URL
    pub fn identity_url(&self) -> &str {
        match self.canonical_url.as_deref() {
            Some(canonical) if !canonical.is_empty() => canonical,
            _ => &self.url,
        }
    }
}
