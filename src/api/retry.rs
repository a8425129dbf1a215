//! Retry logic with exponential backoff for transient API failures.
//!
//! A failed call is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - timeouts, network errors and the retryable
//!   server statuses (408, 500, 502, 503, 504)
//! - [`FailureType::RateLimited`] - HTTP 429
//! - [`FailureType::NeedsAuth`] - HTTP 401/403, never retried
//! - [`FailureType::Permanent`] - everything else, never retried
//!
//! [`RetryPolicy`] then decides whether to retry and how long to wait. Delays
//! are deterministic: `base_delay * multiplier^retry` (1s, 2s, 4s by default).
//!
//! # Example
//!
//! ```
//! use family_cloud_core::api::{ApiError, RetryDecision, RetryPolicy, classify_error};
//!
//! let policy = RetryPolicy::default();
//! let error = ApiError::http_status("https://api.example/videos", 503, "unavailable");
//!
//! match policy.should_retry(classify_error(&error), 0) {
//!     RetryDecision::Retry { delay, retry } => println!("retry #{retry} in {delay:?}"),
//!     RetryDecision::DoNotRetry { reason } => println!("giving up: {reason}"),
//! }
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use super::ApiError;

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential backoff (1 second).
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default backoff multiplier (doubles each retry).
const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

/// HTTP statuses that are worth retrying.
pub const RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Classification of API failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    Transient,

    /// Failure that won't succeed regardless of retries.
    Permanent,

    /// Credentials were rejected; retrying with the same token would not help.
    NeedsAuth,

    /// Server rate limiting (HTTP 429).
    RateLimited,
}

/// Decision on whether to retry a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which retry this will be (1-indexed).
        retry: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior with exponential backoff.
///
/// # Default Values
///
/// - `max_retries`: 3 (so at most 4 requests in total)
/// - `base_delay`: 1 second
/// - `backoff_multiplier`: 2
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with explicit retry count and base delay.
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Returns the maximum number of retries.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the base delay.
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Determines whether to retry after a failure.
    ///
    /// `retries_so_far` is the number of retries already performed
    /// (0 after the initial attempt fails).
    #[instrument(skip(self), fields(max_retries = self.max_retries))]
    pub fn should_retry(&self, failure_type: FailureType, retries_so_far: u32) -> RetryDecision {
        match failure_type {
            FailureType::Permanent => {
                return RetryDecision::DoNotRetry {
                    reason: "permanent failure - retry would not help".to_string(),
                };
            }
            FailureType::NeedsAuth => {
                return RetryDecision::DoNotRetry {
                    reason: "credentials rejected - retry with the same token would not help"
                        .to_string(),
                };
            }
            FailureType::Transient | FailureType::RateLimited => {}
        }

        if retries_so_far >= self.max_retries {
            debug!(retries_so_far, "retries exhausted");
            return RetryDecision::DoNotRetry {
                reason: format!("max retries ({}) exhausted", self.max_retries),
            };
        }

        let delay = self.delay_for(retries_so_far);
        RetryDecision::Retry {
            delay,
            retry: retries_so_far + 1,
        }
    }

    /// Delay before retry number `retries_so_far + 1`: `base * multiplier^retries_so_far`.
    #[must_use]
    pub fn delay_for(&self, retries_so_far: u32) -> Duration {
        let factor = self
            .backoff_multiplier
            .checked_pow(retries_so_far)
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Classifies an API error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | 408, 500, 502, 503, 504 | Transient |
/// | 429 | RateLimited |
/// | 401, 403 | NeedsAuth |
/// | other HTTP status | Permanent |
/// | Network, Timeout | Transient |
/// | anything raised before a request is sent | Permanent |
#[must_use]
pub fn classify_error(error: &ApiError) -> FailureType {
    match error {
        ApiError::HttpStatus { status, .. } => classify_http_status(*status),
        ApiError::Network { .. } | ApiError::Timeout { .. } => FailureType::Transient,
        ApiError::AuthenticationRequired
        | ApiError::Validation { .. }
        | ApiError::InvalidUrl { .. }
        | ApiError::Decode { .. }
        | ApiError::ClientBuild(_) => FailureType::Permanent,
    }
}

fn classify_http_status(status: u16) -> FailureType {
    match status {
        429 => FailureType::RateLimited,
        401 | 403 => FailureType::NeedsAuth,
        status if RETRYABLE_STATUS_CODES.contains(&status) => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: u16) -> ApiError {
        ApiError::http_status("https://api.example/videos", status, "x")
    }

    #[test]
    fn test_retry_policy_default_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries(), 3);
        assert_eq!(policy.base_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_delays_are_one_two_four_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::default();
        assert!(policy.delay_for(200) >= Duration::from_secs(4));
    }

    #[test]
    fn test_none_policy_never_retries() {
        let decision = RetryPolicy::none().should_retry(FailureType::Transient, 0);
        assert!(matches!(decision, RetryDecision::DoNotRetry { .. }));
    }

    #[test]
    fn test_should_retry_respects_max_retries() {
        let policy = RetryPolicy::default();
        for retries_so_far in 0..3 {
            let decision = policy.should_retry(FailureType::Transient, retries_so_far);
            assert_eq!(
                decision,
                RetryDecision::Retry {
                    delay: policy.delay_for(retries_so_far),
                    retry: retries_so_far + 1,
                }
            );
        }
        let decision = policy.should_retry(FailureType::Transient, 3);
        match decision {
            RetryDecision::DoNotRetry { reason } => assert!(reason.contains("exhausted")),
            other => panic!("expected DoNotRetry, got {other:?}"),
        }
    }

    #[test]
    fn test_permanent_and_auth_are_not_retried() {
        let policy = RetryPolicy::default();
        assert!(matches!(
            policy.should_retry(FailureType::Permanent, 0),
            RetryDecision::DoNotRetry { .. }
        ));
        assert!(matches!(
            policy.should_retry(FailureType::NeedsAuth, 0),
            RetryDecision::DoNotRetry { .. }
        ));
    }

    #[test]
    fn test_rate_limited_is_retried() {
        let decision = RetryPolicy::default().should_retry(FailureType::RateLimited, 0);
        assert!(matches!(decision, RetryDecision::Retry { retry: 1, .. }));
    }

    #[test]
    fn test_classify_allow_list_statuses() {
        for status in [408, 500, 502, 503, 504] {
            assert_eq!(
                classify_error(&status_error(status)),
                FailureType::Transient,
                "status {status}"
            );
        }
        assert_eq!(classify_error(&status_error(429)), FailureType::RateLimited);
    }

    #[test]
    fn test_classify_other_statuses_are_not_retryable() {
        assert_eq!(classify_error(&status_error(400)), FailureType::Permanent);
        assert_eq!(classify_error(&status_error(404)), FailureType::Permanent);
        assert_eq!(classify_error(&status_error(501)), FailureType::Permanent);
        assert_eq!(classify_error(&status_error(401)), FailureType::NeedsAuth);
        assert_eq!(classify_error(&status_error(403)), FailureType::NeedsAuth);
    }

    #[test]
    fn test_classify_timeout_is_transient() {
        let error = ApiError::Timeout {
            url: "https://api.example".to_string(),
        };
        assert_eq!(classify_error(&error), FailureType::Transient);
    }

    #[test]
    fn test_classify_pre_request_errors_are_permanent() {
        assert_eq!(
            classify_error(&ApiError::AuthenticationRequired),
            FailureType::Permanent
        );
        assert_eq!(
            classify_error(&ApiError::validation("filename")),
            FailureType::Permanent
        );
    }
}
