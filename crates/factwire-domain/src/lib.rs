//! Factwire Domain Layer
//!
//! Core data model for the news-to-facts extraction pipeline. Every other
//! crate in the workspace depends on these types; this crate depends on
//! nothing but `uuid` and `serde`.
//!
//! ## Key Concepts
//!
//! - **Document**: a crawled article handed over by the crawler collaborator
//! - **ExtractedItem**: one fact (with optional opinion) pulled out by an LLM
//! - **ProviderResult**: the raw outcome of extracting one chunk
//! - **Region / Layer**: closed categorical tags on every item
//!
//! ## Architecture
//!
//! - Pure data and value logic only
//! - Trait definitions for the collaborators the core talks to
//!   (document persistence, downstream scoring)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod item;
pub mod language;
pub mod result;
pub mod traits;

// Re-exports for convenience
pub use document::{Document, DocumentId, ProcessingStatus};
pub use item::{ExtractedItem, Layer, Region};
pub use language::Language;
pub use result::{ChunkStatus, ProviderResult, TokenUsage};

/// Current wall-clock time as seconds since the Unix epoch.
///
/// Returns 0 if the system clock is set before 1970.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
