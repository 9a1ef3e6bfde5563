// SPDX-License-Identifier: Apache-2.0
//! Exponential-backoff reconnection policy (spec.md §4.8).

use std::time::Duration;

/// Configures reconnect backoff: base delay doubles each attempt, capped at
/// `max_delay`, with an optional jitter to avoid thundering-herd reconnects.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling on the computed delay, regardless of attempt count.
    pub max_delay: Duration,
    /// Gives up after this many failed attempts. `None` retries forever.
    pub max_attempts: Option<u32>,
    /// If `true`, the computed delay is randomized in `[0, delay]` rather
    /// than used as-is.
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
            max_attempts: None,
            jitter: true,
        }
    }
}

impl ReconnectPolicy {
    /// Computes the delay to wait before attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let scaled = self.base_delay.saturating_mul(1u32.checked_shl(exponent).unwrap_or(u32::MAX));
        let capped = scaled.min(self.max_delay);
        if self.jitter {
            let millis = capped.as_millis().min(u128::from(u64::MAX)) as u64;
            let jittered = if millis == 0 { 0 } else { rand::random::<u64>() % (millis + 1) };
            Duration::from_millis(jittered)
        } else {
            capped
        }
    }

    /// `true` if `attempt` has exhausted the configured retry budget.
    #[must_use]
    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt > max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_then_caps_at_max_delay() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            max_attempts: None,
            jitter: false,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for(10), Duration::from_millis(500));
    }

    #[test]
    fn jittered_delay_never_exceeds_unjittered_cap() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            max_attempts: None,
            jitter: true,
        };
        for attempt in 1..8 {
            assert!(policy.delay_for(attempt) <= Duration::from_millis(500));
        }
    }

    #[test]
    fn max_attempts_is_respected() {
        let policy = ReconnectPolicy {
            max_attempts: Some(3),
            ..ReconnectPolicy::default()
        };
        assert!(!policy.exhausted(3));
        assert!(policy.exhausted(4));
    }

    #[test]
    fn unlimited_attempts_never_exhausts() {
        let policy = ReconnectPolicy::default();
        assert!(!policy.exhausted(1_000_000));
    }
}
