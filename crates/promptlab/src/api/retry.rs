//! Backoff-and-retry policy for chat calls.
//!
//! Rate limits, 5xx responses, and dropped connections get an exponential
//! backoff and another attempt; client errors such as 400 or 401 fail
//! straight through. Classification works on the error string because that
//! is the error type everything in this crate speaks.

use std::time::Duration;
use tracing::warn;

use crate::{ChatCompletion, ChatRequest, OpenAiClient};

/// HTTP statuses worth another attempt.
const TRANSIENT_STATUSES: [&str; 5] = ["429", "500", "502", "503", "504"];

/// Lowercased substrings that mark a network-level failure.
const NETWORK_MARKERS: [&str; 7] = [
    "request failed:",
    "connection reset",
    "connection refused",
    "timed out",
    "timeout",
    "broken pipe",
    "network",
];

/// Markers of a request the server will reject every time.
const PERMANENT_MARKERS: [&str; 8] = [
    "HTTP 400",
    "HTTP 401",
    "HTTP 403",
    "HTTP 404",
    "HTTP 422",
    "invalid",
    "bad request",
    "unauthorized",
];

/// Multipliers applied to the backoff delay, cycled per attempt so
/// repeated retries don't land in lockstep.
const JITTER_SCALE: [f64; 4] = [0.75, 0.90, 0.60, 0.85];

/// Backoff schedule for retried chat calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt; 0 means fail on the first error.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Ceiling the exponential delay saturates at.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
    /// Scale each delay down by a per-attempt factor.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Default schedule with the given retry count.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_retries: retries,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        if self.jitter {
            // Cycling a fixed table keeps the schedule deterministic and
            // saves a rand dependency.
            let scale = JITTER_SCALE[attempt as usize % JITTER_SCALE.len()];
            Duration::from_secs_f64(capped * scale)
        } else {
            Duration::from_secs_f64(capped)
        }
    }
}

/// Whether the error looks like a transient failure that may clear on retry.
pub fn is_transient_error(error: &str) -> bool {
    if TRANSIENT_STATUSES
        .iter()
        .any(|s| error.contains(&format!("HTTP {s}")))
    {
        return true;
    }

    let lower = error.to_lowercase();
    NETWORK_MARKERS.iter().any(|m| lower.contains(m))
}

/// Whether the error marks a request the server will always reject.
pub fn is_permanent_error(error: &str) -> bool {
    PERMANENT_MARKERS.iter().any(|m| error.contains(m))
}

/// An error body can match both classifiers at once (a 400 whose message
/// mentions a timeout, say). Permanent wins: retrying a rejected request
/// only burns the budget.
fn should_retry(error: &str) -> bool {
    is_transient_error(error) && !is_permanent_error(error)
}

impl OpenAiClient {
    /// [`chat`](OpenAiClient::chat) wrapped in the retry policy: transient
    /// failures back off and retry up to `retry.max_retries` times, permanent
    /// failures return immediately.
    pub async fn chat_with_retry(
        &self,
        body: &ChatRequest,
        retry: &RetryConfig,
    ) -> Result<ChatCompletion, String> {
        let mut attempt = 0u32;
        loop {
            match self.chat(body).await {
                Ok(completion) => return Ok(completion),
                Err(e) => {
                    if attempt >= retry.max_retries || !should_retry(&e) {
                        return Err(e);
                    }
                    let delay = retry.delay_for_attempt(attempt);
                    warn!(
                        "chat attempt {} failed ({e}); retrying in {:.1}s",
                        attempt + 1,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_no_retries() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn with_retries_sets_count() {
        let config = RetryConfig::with_retries(3);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn delay_increases_exponentially() {
        let config = RetryConfig {
            jitter: false,
            ..RetryConfig::with_retries(5)
        };
        let d0 = config.delay_for_attempt(0);
        let d1 = config.delay_for_attempt(1);
        let d2 = config.delay_for_attempt(2);

        assert!(d1 > d0, "d1={d1:?} should be > d0={d0:?}");
        assert!(d2 > d1, "d2={d2:?} should be > d1={d1:?}");
    }

    #[test]
    fn delay_capped_at_max() {
        let config = RetryConfig {
            jitter: false,
            max_delay: Duration::from_secs(2),
            ..RetryConfig::with_retries(10)
        };
        let d10 = config.delay_for_attempt(10);
        assert!(d10 <= Duration::from_secs(2));
    }

    #[test]
    fn jitter_reduces_delay() {
        let config = RetryConfig {
            jitter: true,
            ..RetryConfig::with_retries(3)
        };
        let no_jitter = RetryConfig {
            jitter: false,
            ..RetryConfig::with_retries(3)
        };

        assert!(config.delay_for_attempt(2) <= no_jitter.delay_for_attempt(2));
    }

    #[test]
    fn transient_errors_detected() {
        assert!(is_transient_error("chat API HTTP 429: rate limited"));
        assert!(is_transient_error("chat API HTTP 502: bad gateway"));
        assert!(is_transient_error("request failed: connection reset"));
        assert!(is_transient_error("request failed: timed out"));
    }

    #[test]
    fn permanent_errors_detected() {
        assert!(is_permanent_error("chat API HTTP 400: bad request"));
        assert!(is_permanent_error("chat API HTTP 401: unauthorized"));
    }

    #[test]
    fn non_transient_not_retried() {
        assert!(!is_transient_error("chat API HTTP 400: bad request"));
        assert!(!is_transient_error("some random error"));
        assert!(!should_retry("some random error"));
    }

    #[test]
    fn permanent_error_with_transient_marker_not_retried() {
        // A 400 body can still contain "timed out"; the permanent status
        // must win over the substring match.
        let error = "chat API HTTP 400: upstream request timed out during validation";
        assert!(is_transient_error(error));
        assert!(is_permanent_error(error));
        assert!(!should_retry(error));
    }

    #[test]
    fn transient_error_retried() {
        assert!(should_retry("chat API HTTP 503: service unavailable"));
        assert!(should_retry("request failed: connection refused"));
    }
}
