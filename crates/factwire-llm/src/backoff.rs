//! Exponential backoff between retries of the same provider

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff policy
///
/// The delay before retry `n` (1-based) is `base * 2^(n-1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Delay before the first retry
    pub base: Duration,
    /// Upper bound on any single delay
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(2),
            max: Duration::from_secs(10),
        }
    }
}

impl BackoffPolicy {
    /// Create a policy
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// A policy that never waits
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
        assert_eq!(policy.delay(3), Duration::from_secs(8));
        assert_eq!(policy.delay(4), Duration::from_secs(10));
        assert_eq!(policy.delay(40), Duration::from_secs(10));
    }

    #[test]
    fn test_none_never_waits() {
        let policy = BackoffPolicy::none();
        assert_eq!(policy.delay(1), Duration::ZERO);
        assert_eq!(policy.delay(5), Duration::ZERO);
    }
}
