//! Reconnection backoff policy.
//!
//! The delay for attempt `n` (0-indexed failures since the last successful
//! open) is `base × 2^n`, clamped to `max`. Each delay is derived from the
//! attempt number alone.
//!
//! ```rust
//! use std::time::Duration;
//! use ripple_core::BackoffPolicy;
//!
//! let backoff = BackoffPolicy::default();
//! assert_eq!(backoff.delay(0), Duration::from_secs(1));
//! assert_eq!(backoff.delay(3), Duration::from_secs(8));
//! assert_eq!(backoff.delay(9), Duration::from_secs(30));
//! ```

use std::time::Duration;

/// Default first retry delay.
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Default delay cap.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Exponential backoff with a cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base: Duration,
    /// Maximum delay between retries.
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_BACKOFF,
            max: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl BackoffPolicy {
    /// Create a policy from millisecond values.
    #[must_use]
    pub fn from_millis(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base: Duration::from_millis(base_ms),
            max: Duration::from_millis(max_ms),
        }
    }

    /// Delay before retry number `attempt` (0-indexed).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reference_schedule() {
        let policy = BackoffPolicy::default();
        let secs: Vec<u64> = (0..8).map(|n| policy.delay(n).as_secs()).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 16, 30, 30, 30]);
    }

    #[test]
    fn test_huge_attempt_is_capped() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(31), DEFAULT_MAX_BACKOFF);
        assert_eq!(policy.delay(32), DEFAULT_MAX_BACKOFF);
        assert_eq!(policy.delay(u32::MAX), DEFAULT_MAX_BACKOFF);
    }

    #[test]
    fn test_base_exceeds_max() {
        let policy = BackoffPolicy::from_millis(10_000, 5_000);
        assert_eq!(policy.delay(0), Duration::from_millis(5_000));
    }

    proptest! {
        #[test]
        fn prop_delays_grow_and_stay_capped(
            base_ms in 1u64..5_000,
            max_ms in 1u64..120_000,
            attempt in 0u32..64,
        ) {
            let policy = BackoffPolicy::from_millis(base_ms, max_ms);
            let current = policy.delay(attempt);
            let next = policy.delay(attempt + 1);
            prop_assert!(current <= next);
            prop_assert!(next <= policy.max);
        }
    }
}
