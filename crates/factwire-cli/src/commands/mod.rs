//! Command implementations.

pub mod extract;
pub mod fingerprint;
pub mod plan;

pub use self::extract::{execute_extract, run_extract, DocumentSummary, ExtractReport};
pub use self::fingerprint::{execute_fingerprint, run_fingerprint, FingerprintReport};
pub use self::plan::{execute_plan, run_plan, PlanReport};
