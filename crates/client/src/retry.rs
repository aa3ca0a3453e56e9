//! Bounded per-chunk retry with exponential backoff.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How many times a chunk is attempted before the pipeline fails.
///
/// The default of one attempt never retries: the first failure ends the
/// pipeline and the caller re-runs `submit()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per chunk, including the first. Must be at least 1.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Backoff cap, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Multiplier applied for each further retry.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

fn default_max_attempts() -> u32 {
    1
}

fn default_initial_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    15_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self::default()
    }

    /// A policy allowing `max_attempts` attempts with the default backoff.
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Returns `true` if another attempt may follow attempt number `attempt` (1-based).
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let ms = self.initial_delay_ms as f64 * self.backoff_factor.powi(exp);
        let capped = ms.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_never_retries() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 1);
        assert!(!policy.allows_retry(1));
    }

    #[test]
    fn bounded_attempts() {
        let policy = RetryPolicy::attempts(3);
        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(2));
        assert!(!policy.allows_retry(3));
    }

    #[test]
    fn delay_backoff_is_capped() {
        let policy = RetryPolicy::attempts(10);
        let expected_ms = [250, 500, 1000, 2000, 4000, 8000, 15_000, 15_000];
        for (i, &ms) in expected_ms.iter().enumerate() {
            assert_eq!(
                policy.delay_after((i + 1) as u32),
                Duration::from_millis(ms),
                "attempt {}",
                i + 1
            );
        }
    }

    #[test]
    fn zero_delay_policy() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay_ms: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_after(1), Duration::ZERO);
        assert_eq!(policy.delay_after(5), Duration::ZERO);
    }
}
