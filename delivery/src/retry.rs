//! Transient/terminal classification and exponential backoff.

use crate::error::{Error, ErrorKind};
use std::time::Duration;

/// Description substrings that mark a provider or miscellaneous error as
/// transient even though its kind alone says nothing. Matched
/// case-insensitively against the error description. The exact set is a
/// rough approximation of provider behavior (rate-limit and timeout
/// phrasings); tune it here, per provider, rather than at call sites.
const TRANSIENT_PATTERNS: &[&str] = &[
    "timeout",
    "timed out",
    "429",
    "too many requests",
    "rate limit",
    "temporarily unavailable",
];

/// Retry tuning knobs. All four are independently configurable; values below
/// the sane floors are clamped when the policy is built.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1200),
            max_delay: Duration::from_millis(5000),
            backoff_factor: 1.75,
        }
    }
}

impl RetryConfig {
    /// Clamp to the floors: at least one attempt, initial delay >= 200ms,
    /// max delay >= initial delay, factor >= 1.
    fn clamped(self) -> Self {
        let max_attempts = self.max_attempts.max(1);
        let initial_delay = self.initial_delay.max(Duration::from_millis(200));
        let max_delay = self.max_delay.max(initial_delay);
        let backoff_factor = if self.backoff_factor < 1.0 {
            1.0
        } else {
            self.backoff_factor
        };
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            backoff_factor,
        }
    }
}

/// Pure retry decision logic: transient-vs-terminal classification plus
/// backoff arithmetic. Holds no state about any delivery in flight.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config: config.clamped(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Whether another attempt could plausibly succeed. Network failure
    /// categories are always transient; provider and miscellaneous errors
    /// are transient only when their description matches the pattern table.
    pub fn is_retryable(&self, error: &Error) -> bool {
        match &error.error_kind {
            ErrorKind::Network(_) => true,
            ErrorKind::Provider(description) | ErrorKind::Other(description) => {
                let lowered = description.to_lowercase();
                TRANSIENT_PATTERNS
                    .iter()
                    .any(|pattern| lowered.contains(pattern))
            }
        }
    }

    /// Backoff before the attempt after `attempt` failed:
    /// `min(max_delay, initial_delay * backoff_factor^(attempt - 1))`.
    /// Computed in whole milliseconds; sub-millisecond precision is noise at
    /// these scales.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let raw_ms =
            self.config.initial_delay.as_millis() as f64 * self.config.backoff_factor.powi(exponent);
        let capped_ms = raw_ms.min(self.config.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms.round() as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkErrorKind;

    #[test]
    fn delays_grow_exponentially_and_clamp_at_max() {
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 4,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(4000),
            backoff_factor: 2.0,
        });

        assert_eq!(policy.delay(1), Duration::from_millis(1000));
        assert_eq!(policy.delay(2), Duration::from_millis(2000));
        assert_eq!(policy.delay(3), Duration::from_millis(4000));
        assert_eq!(policy.delay(4), Duration::from_millis(4000));
    }

    #[test]
    fn default_config_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_millis(1200));
        assert_eq!(policy.delay(2), Duration::from_millis(2100));
    }

    #[test]
    fn config_floors_are_enforced() {
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 0,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(1),
            backoff_factor: 0.25,
        });

        assert_eq!(policy.max_attempts(), 1);
        // Backoff never shrinks: floor delay, max >= initial, factor >= 1.
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(5), Duration::from_millis(200));
    }

    #[test]
    fn network_kinds_are_always_transient() {
        let policy = RetryPolicy::default();
        for kind in [
            NetworkErrorKind::ConnectionReset,
            NetworkErrorKind::ConnectionRefused,
            NetworkErrorKind::DnsFailure,
            NetworkErrorKind::Timeout,
            NetworkErrorKind::Unreachable,
        ] {
            assert!(policy.is_retryable(&Error::network(kind)), "{kind:?}");
        }
    }

    #[test]
    fn provider_errors_are_transient_only_on_pattern_match() {
        let policy = RetryPolicy::default();

        assert!(policy.is_retryable(&Error::provider("429 Too Many Requests")));
        assert!(policy.is_retryable(&Error::provider("upstream request timed out")));
        assert!(policy.is_retryable(&Error::other("rate limit exceeded, retry later")));

        assert!(!policy.is_retryable(&Error::provider("invalid recipient address")));
        assert!(!policy.is_retryable(&Error::other("payload rejected by provider")));
    }
}
