//! Retry policy: which outcomes are retried and how long to wait between attempts.

use std::time::Duration;

use super::transport::TransportError;

/// Response status codes that trigger another attempt.
pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Default number of additional attempts after the first.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Default base delay for exponential backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Exponential backoff without jitter.
///
/// The delay before retry `n` (0-indexed) is `backoff_base * 2^n`. A request is
/// attempted at most `1 + retry_count` times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub retry_count: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_count: DEFAULT_RETRY_COUNT,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl RetryPolicy {
    pub fn new(retry_count: u32, backoff_base: Duration) -> Self {
        Self {
            retry_count,
            backoff_base,
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.retry_count + 1
    }

    /// Delay to wait before retry number `retry` (0-indexed).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(retry))
    }

    /// Whether another attempt is allowed after `retries_done` retries.
    pub fn can_retry(&self, retries_done: u32) -> bool {
        retries_done < self.retry_count
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        RETRY_STATUSES.contains(&status)
    }

    pub fn is_retryable_error(&self, error: &TransportError) -> bool {
        error.is_transient()
    }
}
