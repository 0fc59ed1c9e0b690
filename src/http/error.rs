//! Error types for request execution.

use std::time::Duration;

use super::transport::Method;

/// Errors returned by [`ApiClient`](super::ApiClient) request execution.
///
/// Only infrastructure problems are reported here. A response with a 4xx or
/// 5xx status is still an `Ok(ApiResponse)`; callers assert on the status.
#[derive(Debug)]
pub enum RequestError {
    /// The client cannot issue the request as configured.
    Configuration(String),
    /// The last attempt exceeded its timeout budget.
    Timeout {
        method: Method,
        url: String,
        elapsed: Duration,
    },
    /// The request could not be completed for any other transport reason.
    RequestFailed {
        method: Method,
        url: String,
        elapsed: Duration,
        reason: String,
    },
}

impl RequestError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RequestError::Timeout { .. })
    }

    /// Wall-clock time spent before the failure, if a request was dispatched.
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            RequestError::Configuration(_) => None,
            RequestError::Timeout { elapsed, .. } | RequestError::RequestFailed { elapsed, .. } => {
                Some(*elapsed)
            }
        }
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::Configuration(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            RequestError::Timeout {
                method,
                url,
                elapsed,
            } => {
                write!(
                    f,
                    "Request timeout after {:.2}s: {} {}",
                    elapsed.as_secs_f64(),
                    method,
                    url
                )
            }
            RequestError::RequestFailed {
                method,
                url,
                elapsed,
                reason,
            } => {
                write!(
                    f,
                    "Request failed after {:.2}s: {} {} - {}",
                    elapsed.as_secs_f64(),
                    method,
                    url,
                    reason
                )
            }
        }
    }
}

impl std::error::Error for RequestError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_display() {
        let err = RequestError::Configuration("no timeout".to_string());
        assert_eq!(err.to_string(), "Configuration error: no timeout");

        let err = RequestError::Timeout {
            method: Method::Get,
            url: "http://x.test/users".to_string(),
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(
            err.to_string(),
            "Request timeout after 1.50s: GET http://x.test/users"
        );

        let err = RequestError::RequestFailed {
            method: Method::Post,
            url: "http://x.test/login".to_string(),
            elapsed: Duration::from_millis(250),
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("POST http://x.test/login"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_is_timeout_and_elapsed() {
        let err = RequestError::Timeout {
            method: Method::Get,
            url: "u".to_string(),
            elapsed: Duration::from_secs(2),
        };
        assert!(err.is_timeout());
        assert_eq!(err.elapsed(), Some(Duration::from_secs(2)));

        let err = RequestError::Configuration("x".to_string());
        assert!(!err.is_timeout());
        assert_eq!(err.elapsed(), None);
    }
}
