//! Extraction attempts and their state machine

use crate::QueueError;
use factwire_domain::DocumentId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    /// Waiting to be picked up
    Queued,
    /// Being extracted
    Running,
    /// Extraction finished (fully or partially)
    Done,
    /// Extraction failed
    Failed,
}

impl QueueStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Queued => "queued",
            QueueStatus::Running => "running",
            QueueStatus::Done => "done",
            QueueStatus::Failed => "failed",
        }
    }

    /// Parse a status from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "queued" => Some(QueueStatus::Queued),
            "running" => Some(QueueStatus::Running),
            "done" => Some(QueueStatus::Done),
            "failed" => Some(QueueStatus::Failed),
            _ => None,
        }
    }

    /// Whether the state machine allows moving from `self` to `to`
    pub fn can_transition_to(&self, to: QueueStatus) -> bool {
        matches!(
            (self, to),
            (QueueStatus::Queued, QueueStatus::Running)
                | (QueueStatus::Running, QueueStatus::Done)
                | (QueueStatus::Running, QueueStatus::Failed)
                | (QueueStatus::Failed, QueueStatus::Queued)
        )
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid queue status: {}", s))
    }
}

/// The queue entry of one document
///
/// Timestamps are Unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionAttempt {
    /// Document being extracted
    pub document_id: DocumentId,

    /// Current status
    pub status: QueueStatus,

    /// Number of times extraction was started
    pub attempts: u32,

    /// Error of the most recent failure
    pub last_error: Option<String>,

    /// When the latest run started
    pub started_at: Option<u64>,

    /// When the latest run finished
    pub finished_at: Option<u64>,

    /// When the entry was created
    pub enqueued_at: u64,

    /// Higher values are picked up first
    #[serde(default)]
    pub priority: i32,

    /// Preferred provider, if any
    #[serde(default)]
    pub provider_hint: Option<String>,
}

impl ExtractionAttempt {
    /// Create a fresh queued entry
    pub fn new(document_id: DocumentId, priority: i32, now: u64) -> Self {
        Self {
            document_id,
            status: QueueStatus::Queued,
            attempts: 0,
            last_error: None,
            started_at: None,
            finished_at: None,
            enqueued_at: now,
            priority,
            provider_hint: None,
        }
    }

    fn transition(&mut self, to: QueueStatus) -> Result<(), QueueError> {
        if !self.status.can_transition_to(to) {
            return Err(QueueError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// `queued -> running`
    pub fn start(&mut self, now: u64) -> Result<(), QueueError> {
        self.transition(QueueStatus::Running)?;
        self.attempts += 1;
        self.started_at = Some(now);
        self.finished_at = None;
        Ok(())
    }

    /// `running -> done`
    pub fn complete(&mut self, now: u64) -> Result<(), QueueError> {
        self.transition(QueueStatus::Done)?;
        self.finished_at = Some(now);
        self.last_error = None;
        Ok(())
    }

    /// `running -> failed`
    pub fn fail(&mut self, now: u64, error: impl Into<String>) -> Result<(), QueueError> {
        self.transition(QueueStatus::Failed)?;
        self.finished_at = Some(now);
        self.last_error = Some(error.into());
        Ok(())
    }

    /// `failed -> queued`, keeping the attempt count and the last error
    pub fn requeue(&mut self) -> Result<(), QueueError> {
        self.transition(QueueStatus::Queued)
    }
}
