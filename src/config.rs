//! Settings loaded once at startup and the per-client configuration derived from them.
//!
//! [`Settings`] is parsed by clap; every field has a long flag and an
//! environment variable. There is no global instance: `main` builds one and
//! passes it by reference. Tests start from [`Settings::default`] and override
//! fields on their own copy.

use std::time::Duration;

use clap::Args;
use clap::builder::BoolishValueParser;
use serde::Serialize;
use serde_json::Value;

use crate::http::{RequestError, RetryPolicy};
use crate::logging::redact_value;

pub const DEFAULT_BASE_URL: &str = "https://reqres.in/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRY_COUNT: u32 = 3;
pub const DEFAULT_RETRY_DELAY_SECS: f64 = 1.0;

pub const TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 1..=300;
pub const RETRY_COUNT_RANGE: std::ops::RangeInclusive<u32> = 0..=10;
pub const RETRY_DELAY_RANGE_SECS: std::ops::RangeInclusive<f64> = 0.1..=10.0;

pub const AUTHORIZATION: &str = "Authorization";

/// Application settings, overridable from the environment.
#[derive(Args, Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    /// Base URL for the API under test
    #[arg(long, env = "API_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub api_base_url: String,

    /// Request timeout in seconds
    #[arg(
        long,
        env = "API_TIMEOUT",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..=300),
        global = true
    )]
    pub api_timeout: u64,

    /// Number of retry attempts for failed requests
    #[arg(
        long,
        env = "API_RETRY_COUNT",
        default_value_t = DEFAULT_RETRY_COUNT,
        value_parser = clap::value_parser!(u32).range(0..=10),
        global = true
    )]
    pub api_retry_count: u32,

    /// Base delay between retries in seconds (doubles on every retry)
    #[arg(
        long,
        env = "API_RETRY_DELAY",
        default_value_t = DEFAULT_RETRY_DELAY_SECS,
        value_parser = parse_retry_delay,
        global = true
    )]
    pub api_retry_delay: f64,

    /// Test environment (dev, staging, prod)
    #[arg(long, env = "TEST_ENV", default_value = "staging", global = true)]
    pub test_env: String,

    /// Logging level (DEBUG, INFO, WARNING, ERROR)
    #[arg(long, env = "LOG_LEVEL", default_value = "INFO", global = true)]
    pub log_level: String,

    /// Enable request/response logging
    #[arg(
        long,
        env = "ENABLE_LOGGING",
        default_value_t = true,
        action = clap::ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub enable_logging: bool,

    /// Also write JSON logs to a file under --log-dir
    #[arg(
        long,
        env = "LOG_TO_FILE",
        default_value_t = false,
        action = clap::ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_to_file: bool,

    /// Directory for log files
    #[arg(long, env = "LOG_DIR", default_value = "logs", global = true)]
    pub log_dir: String,

    /// API username for authentication
    #[arg(long, env = "API_USERNAME", global = true)]
    pub api_username: Option<String>,

    /// API password for authentication
    #[arg(long, env = "API_PASSWORD", hide_env_values = true, global = true)]
    pub api_password: Option<String>,

    /// API bearer token for authentication
    #[arg(long, env = "API_TOKEN", hide_env_values = true, global = true)]
    pub api_token: Option<String>,

    /// Number of parallel workers for the test runner
    #[arg(
        long,
        env = "PARALLEL_WORKERS",
        default_value_t = 4,
        value_parser = clap::value_parser!(u32).range(1..=16),
        global = true
    )]
    pub parallel_workers: u32,

    /// Threshold in seconds to flag a check as slow
    #[arg(
        long,
        env = "SLOW_TEST_THRESHOLD",
        default_value_t = 5.0,
        value_parser = parse_slow_threshold,
        global = true
    )]
    pub slow_test_threshold: f64,

    /// Directory for Allure test results
    #[arg(
        long,
        env = "ALLURE_RESULTS_DIR",
        default_value = "reports/allure-results",
        global = true
    )]
    pub allure_results_dir: String,

    /// Directory for HTML test reports
    #[arg(long, env = "HTML_REPORT_DIR", default_value = "reports/html", global = true)]
    pub html_report_dir: String,

    /// Performance threshold in milliseconds
    #[arg(
        long,
        env = "PERFORMANCE_THRESHOLD_MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    pub performance_threshold_ms: u64,

    /// Enable performance checks
    #[arg(
        long,
        env = "ENABLE_PERFORMANCE_TESTS",
        default_value_t = false,
        action = clap::ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub enable_performance_tests: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            api_timeout: DEFAULT_TIMEOUT_SECS,
            api_retry_count: DEFAULT_RETRY_COUNT,
            api_retry_delay: DEFAULT_RETRY_DELAY_SECS,
            test_env: "staging".to_string(),
            log_level: "INFO".to_string(),
            enable_logging: true,
            log_to_file: false,
            log_dir: "logs".to_string(),
            api_username: None,
            api_password: None,
            api_token: None,
            parallel_workers: 4,
            slow_test_threshold: 5.0,
            allure_results_dir: "reports/allure-results".to_string(),
            html_report_dir: "reports/html".to_string(),
            performance_threshold_ms: 1000,
            enable_performance_tests: false,
        }
    }
}

impl Settings {
    /// Full URL for `endpoint` under the configured base URL.
    pub fn full_url(&self, endpoint: &str) -> String {
        join_url(&self.api_base_url, endpoint)
    }

    pub fn is_production(&self) -> bool {
        self.test_env.eq_ignore_ascii_case("prod")
    }

    pub fn is_debug_mode(&self) -> bool {
        self.log_level.eq_ignore_ascii_case("debug")
    }

    pub fn slow_threshold(&self) -> Duration {
        Duration::from_secs_f64(self.slow_test_threshold)
    }

    pub fn performance_threshold(&self) -> Duration {
        Duration::from_millis(self.performance_threshold_ms)
    }

    /// Client configuration for these settings. A configured token becomes the
    /// default `Authorization` header.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.api_base_url)
            .with_timeout(Some(Duration::from_secs(self.api_timeout)))
            .with_retry(RetryPolicy::new(
                self.api_retry_count,
                Duration::from_secs_f64(self.api_retry_delay),
            ))
            .with_log_traffic(self.enable_logging);

        if let Some(token) = &self.api_token {
            config.set_header(AUTHORIZATION, &format!("Bearer {}", token));
        }

        config
    }

    /// Settings as JSON with credentials masked, for display.
    pub fn redacted(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(value) => redact_value(&value),
            Err(_) => Value::Null,
        }
    }
}

fn parse_retry_delay(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("`{}` is not a number", s))?;
    if RETRY_DELAY_RANGE_SECS.contains(&value) {
        Ok(value)
    } else {
        Err(format!(
            "{} is not in {}..={}",
            value,
            RETRY_DELAY_RANGE_SECS.start(),
            RETRY_DELAY_RANGE_SECS.end()
        ))
    }
}

fn parse_slow_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("`{}` is not a number", s))?;
    if value >= 0.1 {
        Ok(value)
    } else {
        Err(format!("{} must be at least 0.1", value))
    }
}

/// Joins a base URL and an endpoint with exactly one slash between them.
pub fn join_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

/// Sets `name` to `value`, replacing an entry with the byte-identical name or
/// appending a new one. Names are not case-folded.
pub(crate) fn upsert_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers.iter_mut().find(|(existing, _)| existing == name) {
        Some(entry) => entry.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

/// Per-client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Default per-request timeout. Requests without an override fail when this is `None`.
    pub timeout: Option<Duration>,
    pub retry: RetryPolicy,
    pub verify_tls: bool,
    pub log_traffic: bool,
    pub default_headers: Vec<(String, String)>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            retry: RetryPolicy::default(),
            verify_tls: true,
            log_traffic: true,
            default_headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ],
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    pub fn with_log_traffic(mut self, log_traffic: bool) -> Self {
        self.log_traffic = log_traffic;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        upsert_header(&mut self.default_headers, name, value);
    }

    /// Removes a default header. Returns whether it was present.
    pub fn remove_header(&mut self, name: &str) -> bool {
        let before = self.default_headers.len();
        self.default_headers.retain(|(existing, _)| existing != name);
        self.default_headers.len() != before
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.default_headers
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    /// Full URL for `endpoint` under this base URL.
    pub fn url_for(&self, endpoint: &str) -> String {
        join_url(&self.base_url, endpoint)
    }

    /// Checks bounds that clap enforces for [`Settings`] but a hand-built config may violate.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.base_url.trim().is_empty() {
            return Err(RequestError::Configuration(
                "base URL must not be empty".to_string(),
            ));
        }

        if let Some(timeout) = self.timeout {
            let secs = timeout.as_secs_f64();
            if secs < *TIMEOUT_RANGE_SECS.start() as f64 || secs > *TIMEOUT_RANGE_SECS.end() as f64
            {
                return Err(RequestError::Configuration(format!(
                    "timeout {:.3}s is outside {}..={} seconds",
                    secs,
                    TIMEOUT_RANGE_SECS.start(),
                    TIMEOUT_RANGE_SECS.end()
                )));
            }
        }

        if !RETRY_COUNT_RANGE.contains(&self.retry.retry_count) {
            return Err(RequestError::Configuration(format!(
                "retry count {} is outside {}..={}",
                self.retry.retry_count,
                RETRY_COUNT_RANGE.start(),
                RETRY_COUNT_RANGE.end()
            )));
        }

        // A zero base is fine when no retry will ever wait on it.
        let backoff = self.retry.backoff_base.as_secs_f64();
        if self.retry.retry_count > 0 && !RETRY_DELAY_RANGE_SECS.contains(&backoff) {
            return Err(RequestError::Configuration(format!(
                "retry backoff {:.3}s is outside {}..={} seconds",
                backoff,
                RETRY_DELAY_RANGE_SECS.start(),
                RETRY_DELAY_RANGE_SECS.end()
            )));
        }

        Ok(())
    }
}
