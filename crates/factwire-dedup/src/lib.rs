//! Factwire Dedup
//!
//! Near-duplicate suppression for documents and extracted facts.
//!
//! The crate provides:
//! - Token parity fingerprints, stored as signed 64-bit integers
//! - Hamming-distance duplicate checks
//! - Document deduplication (URL identity first, then content fingerprint)
//! - Fact normalisation and similarity for merging per-chunk results
//!
//! # Examples
//!
//! ```
//! use factwire_dedup::{fingerprint, is_duplicate};
//!
//! let a = fingerprint("The central bank raised its benchmark rate by 25 basis points");
//! let b = fingerprint("The central bank raised its benchmark rate by 25 basis points.");
//! assert!(is_duplicate(a, b, 3));
//! ```

#![warn(missing_docs)]

mod config;
mod dedup;
mod error;
mod fingerprint;
mod similarity;

pub use config::{DedupConfig, SimilarityConfig};
pub use dedup::{dedup_key, DedupOutcome, DedupReport, DedupSnapshot, Deduplicator};
pub use error::DedupError;
pub use fingerprint::{fingerprint, hamming_distance, is_duplicate, EMPTY_FINGERPRINT};
pub use similarity::{edit_distance, is_similar_fact, normalize_fact};
