//! Metrics collection for the queue worker

use crate::QueueStatus;
use std::collections::HashMap;

/// Metrics collected while draining the queue
///
/// Tracks transitions per target status and cycle counts.
#[derive(Debug, Clone, Default)]
pub struct QueueMetrics {
    /// Transitions applied, keyed by the status entered
    pub transitions: HashMap<QueueStatus, usize>,

    /// Total worker cycles completed
    pub cycle_count: usize,

    /// Total runtime in milliseconds
    pub total_runtime_ms: u64,
}

impl QueueMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `count` transitions into `status`
    pub fn record_transition(&mut self, status: QueueStatus, count: usize) {
        if count > 0 {
            *self.transitions.entry(status).or_insert(0) += count;
        }
    }

    /// Record a cycle completion
    pub fn record_cycle(&mut self) {
        self.cycle_count += 1;
    }

    /// Transitions into `status` so far
    pub fn count(&self, status: QueueStatus) -> usize {
        self.transitions.get(&status).copied().unwrap_or(0)
    }

    /// Total transitions across all statuses
    pub fn total_transitions(&self) -> usize {
        self.transitions.values().sum()
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        self.transitions.clear();
        self.cycle_count = 0;
        self.total_runtime_ms = 0;
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Queue Metrics Summary".to_string(),
            "=====================".to_string(),
            format!("Cycles: {}", self.cycle_count),
            format!("Total runtime: {}ms", self.total_runtime_ms),
        ];

        if !self.transitions.is_empty() {
            lines.push(String::new());
            lines.push("Transitions into:".to_string());
            for status in [
                QueueStatus::Queued,
                QueueStatus::Running,
                QueueStatus::Done,
                QueueStatus::Failed,
            ] {
                if let Some(count) = self.transitions.get(&status) {
                    lines.push(format!("  {}: {}", status, count));
                }
            }
            lines.push(format!("  Total: {}", self.total_transitions()));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = QueueMetrics::new();
        assert_eq!(metrics.total_transitions(), 0);
        assert_eq!(metrics.cycle_count, 0);
    }

    #[test]
    fn test_record_transition() {
        let mut metrics = QueueMetrics::new();
        metrics.record_transition(QueueStatus::Running, 3);
        metrics.record_transition(QueueStatus::Done, 2);
        metrics.record_transition(QueueStatus::Running, 1);
        metrics.record_transition(QueueStatus::Failed, 0);

        assert_eq!(metrics.count(QueueStatus::Running), 4);
        assert_eq!(metrics.count(QueueStatus::Done), 2);
        assert_eq!(metrics.count(QueueStatus::Failed), 0);
        assert!(!metrics.transitions.contains_key(&QueueStatus::Failed));
        assert_eq!(metrics.total_transitions(), 6);
    }

    #[test]
    fn test_reset() {
        let mut metrics = QueueMetrics::new();
        metrics.record_transition(QueueStatus::Done, 10);
        metrics.record_cycle();

        metrics.reset();

        assert_eq!(metrics.total_transitions(), 0);
        assert_eq!(metrics.cycle_count, 0);
    }

    #[test]
    fn test_summary() {
        let mut metrics = QueueMetrics::new();
        metrics.record_transition(QueueStatus::Running, 2);
        metrics.record_transition(QueueStatus::Failed, 1);
        metrics.record_cycle();
        metrics.total_runtime_ms = 120;

        let summary = metrics.summary();
        assert!(summary.contains("Cycles: 1"));
        assert!(summary.contains("Total runtime: 120ms"));
        assert!(summary.contains("running: 2"));
        assert!(summary.contains("failed: 1"));
        assert!(summary.contains("Total: 3"));
    }
}
