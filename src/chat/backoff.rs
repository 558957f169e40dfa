//! Transport-level retry with exponential backoff and jitter.
//!
//! [`BackoffConfig`] controls how transient HTTP errors (429, 5xx) are
//! retried with increasing delays. A local Ollama server rarely needs any:
//! use [`BackoffConfig::none()`], the default. For a shared or remote
//! endpoint, start from [`BackoffConfig::standard()`] and tune.

use std::time::Duration;

/// Configuration for transport-level retry with exponential backoff.
///
/// # Example
///
/// ```
/// use llm_harvest::chat::BackoffConfig;
///
/// let none = BackoffConfig::none();
/// assert_eq!(none.max_retries, 0);
///
/// let standard = BackoffConfig::standard();
/// assert_eq!(standard.max_retries, 3);
/// ```
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Maximum number of transport retries. Default: 0 (no retry).
    pub max_retries: u32,

    /// Delay before the first retry. Default: 1 second.
    pub initial_delay: Duration,

    /// Multiplier applied after each retry. Default: 2.0.
    /// Delay grows: initial, initial * multiplier, initial * multiplier^2, ...
    pub multiplier: f64,

    /// Cap on the delay between retries. Default: 60 seconds.
    pub max_delay: Duration,

    /// Jitter strategy. Default: Full.
    pub jitter: JitterStrategy,

    /// HTTP status codes that trigger retry. Default: `[429, 500, 502, 503, 504]`.
    pub retryable_statuses: Vec<u16>,

    /// Whether to respect `Retry-After` headers from the provider.
    /// Default: `true`.
    pub respect_retry_after: bool,
}

/// Jitter applied to the computed delay, to spread out retries that would
/// otherwise land in lockstep on a shared endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterStrategy {
    /// No jitter. Delay is exactly the computed value.
    None,

    /// Full jitter: random value in `[0, computed_delay]`.
    Full,

    /// Equal jitter: `computed_delay/2 + random in [0, computed_delay/2]`.
    Equal,
}

impl BackoffConfig {
    /// No transport retry, the default. Right for a local model server or
    /// when the caller handles errors itself.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::standard()
        }
    }

    /// Sensible defaults for a shared endpoint: 3 retries, 1s initial,
    /// 2x multiplier, 60s max, full jitter, respects Retry-After.
    pub fn standard() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            jitter: JitterStrategy::Full,
            retryable_statuses: vec![429, 500, 502, 503, 504],
            respect_retry_after: true,
        }
    }

    /// Compute the delay for attempt N (0-indexed).
    ///
    /// The base delay is `initial_delay * multiplier^attempt`, capped at
    /// `max_delay`, with jitter applied last.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let jittered = match self.jitter {
            JitterStrategy::None => capped,
            JitterStrategy::Full => fastrand::f64() * capped,
            JitterStrategy::Equal => capped / 2.0 + fastrand::f64() * (capped / 2.0),
        };

        Duration::from_secs_f64(jittered)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter(max_delay_secs: u64) -> BackoffConfig {
        BackoffConfig {
            jitter: JitterStrategy::None,
            max_delay: Duration::from_secs(max_delay_secs),
            ..BackoffConfig::standard()
        }
    }

    #[test]
    fn test_delay_grows_exponentially() {
        let config = no_jitter(60);
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(8));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = no_jitter(5);
        // Attempt 3 would be 8s uncapped.
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(5));
        // Attempt 10 would be 1024s uncapped.
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(5));
    }

    #[test]
    fn test_full_jitter_stays_in_range() {
        let config = BackoffConfig::standard();
        for _ in 0..100 {
            assert!(config.delay_for_attempt(0) <= Duration::from_secs(1));
            assert!(config.delay_for_attempt(1) <= Duration::from_secs(2));
        }
    }

    #[test]
    fn test_equal_jitter_keeps_lower_half() {
        let config = BackoffConfig {
            jitter: JitterStrategy::Equal,
            ..BackoffConfig::standard()
        };
        for _ in 0..100 {
            let d = config.delay_for_attempt(1);
            assert!(d >= Duration::from_secs(1), "delay {:?} < 1s", d);
            assert!(d <= Duration::from_secs(2), "delay {:?} > 2s", d);
        }
    }

    #[test]
    fn test_presets() {
        assert_eq!(BackoffConfig::none().max_retries, 0);
        assert_eq!(BackoffConfig::default().max_retries, 0);

        let standard = BackoffConfig::standard();
        assert_eq!(standard.max_retries, 3);
        assert_eq!(standard.initial_delay, Duration::from_secs(1));
        assert!(standard.retryable_statuses.contains(&429));
        assert!(standard.retryable_statuses.contains(&503));
        assert!(standard.respect_retry_after);
    }
}
