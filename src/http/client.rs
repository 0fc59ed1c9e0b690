//! Request executor: URL and header resolution, dispatch, retry and timing.

use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use serde_json::Value;

use super::error::RequestError;
use super::response::ApiResponse;
use super::transport::{
    HttpTransport, Method, PreparedRequest, RawBody, RequestBody, Transport, TransportError,
    TransportErrorKind,
};
use crate::config::{AUTHORIZATION, ClientConfig, Settings, upsert_header};
use crate::logging::{log_request, log_response};

/// One call's worth of request parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub endpoint: String,
    pub query: Vec<(String, String)>,
    pub json: Option<Value>,
    pub raw: Option<RawBody>,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl RequestSpec {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            query: Vec::new(),
            json: None,
            raw: None,
            headers: Vec::new(),
            timeout: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.raw = Some(RawBody::Text(body.into()));
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.raw = Some(RawBody::Form(fields));
        self
    }

    /// Adds a header override. Later overrides of the same name win.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        upsert_header(&mut self.headers, name, value);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Defaults first, then overrides; an override replaces a default with the
/// byte-identical name and is appended otherwise.
pub fn merge_headers(
    defaults: &[(String, String)],
    overrides: &[(String, String)],
) -> Vec<(String, String)> {
    let mut merged = defaults.to_vec();
    for (name, value) in overrides {
        upsert_header(&mut merged, name, value);
    }
    merged
}

/// Fluent request construction bound to a client.
pub struct RequestBuilder<'a, T: Transport> {
    client: &'a ApiClient<T>,
    spec: RequestSpec,
}

impl<'a, T: Transport> RequestBuilder<'a, T> {
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.spec = self.spec.query(key, value);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.spec = self.spec.json(body);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.spec = self.spec.body(body);
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.spec = self.spec.form(fields);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.spec = self.spec.header(name, value);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.spec = self.spec.timeout(timeout);
        self
    }

    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    pub fn send(self) -> Result<ApiResponse, RequestError> {
        self.client.execute(self.spec)
    }
}

/// Blocking API client with retry and traffic logging.
///
/// The network session is opened on construction and released by
/// [`close`](Self::close) or when the client is dropped.
pub struct ApiClient<T: Transport = HttpTransport> {
    config: ClientConfig,
    transport: Option<T>,
}

impl ApiClient<HttpTransport> {
    /// Creates a client with a reqwest-backed transport.
    pub fn new(config: ClientConfig) -> Result<Self, RequestError> {
        config.validate()?;
        let transport = HttpTransport::build(config.verify_tls).map_err(|e| {
            RequestError::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;
        Self::with_transport(config, transport)
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, RequestError> {
        Self::new(settings.client_config())
    }
}

impl<T: Transport> ApiClient<T> {
    /// Creates a client over a caller-supplied transport.
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, RequestError> {
        config.validate()?;
        debug!("API client session opened for {}", config.base_url);
        Ok(Self {
            config,
            transport: Some(transport),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    pub fn request(&self, method: Method, endpoint: &str) -> RequestBuilder<'_, T> {
        RequestBuilder {
            client: self,
            spec: RequestSpec::new(method, endpoint),
        }
    }

    pub fn get(&self, endpoint: &str) -> RequestBuilder<'_, T> {
        self.request(Method::Get, endpoint)
    }

    pub fn post(&self, endpoint: &str) -> RequestBuilder<'_, T> {
        self.request(Method::Post, endpoint)
    }

    pub fn put(&self, endpoint: &str) -> RequestBuilder<'_, T> {
        self.request(Method::Put, endpoint)
    }

    pub fn patch(&self, endpoint: &str) -> RequestBuilder<'_, T> {
        self.request(Method::Patch, endpoint)
    }

    pub fn delete(&self, endpoint: &str) -> RequestBuilder<'_, T> {
        self.request(Method::Delete, endpoint)
    }

    /// Resolves URL, headers, body and timeout without dispatching.
    pub fn prepare(&self, spec: RequestSpec) -> Result<PreparedRequest, RequestError> {
        let url = self.config.url_for(&spec.endpoint);

        let timeout = spec.timeout.or(self.config.timeout).ok_or_else(|| {
            RequestError::Configuration(format!(
                "No timeout for {} {}: set a default or pass one per request",
                spec.method, url
            ))
        })?;

        let body = match (spec.json, spec.raw) {
            (Some(json), Some(_)) => {
                warn!(
                    "Both JSON and raw bodies given for {} {}, sending the JSON body",
                    spec.method, url
                );
                Some(RequestBody::Json(json))
            }
            (Some(json), None) => Some(RequestBody::Json(json)),
            (None, Some(raw)) => Some(RequestBody::Raw(raw)),
            (None, None) => None,
        };

        Ok(PreparedRequest {
            method: spec.method,
            url,
            query: spec.query,
            headers: merge_headers(&self.config.default_headers, &spec.headers),
            body,
            timeout,
        })
    }

    /// Executes a request, retrying per the configured policy.
    ///
    /// Any HTTP status is returned as `Ok`. Only transport failures, and
    /// requests that cannot be issued at all, are `Err`.
    #[tracing::instrument(
        skip(self, spec),
        fields(method = %spec.method, endpoint = %spec.endpoint)
    )]
    pub fn execute(&self, spec: RequestSpec) -> Result<ApiResponse, RequestError> {
        let transport = self.transport.as_ref().ok_or_else(|| {
            RequestError::Configuration("API client session is closed".to_string())
        })?;
        let request = self.prepare(spec)?;
        let policy = self.config.retry;

        let start = Instant::now();
        let mut retries = 0;

        loop {
            if self.config.log_traffic {
                log_request(
                    request.method,
                    &request.url,
                    &request.headers,
                    request.body.as_ref(),
                );
            }

            let attempt_start = Instant::now();
            match transport.send(&request) {
                Ok(raw) => {
                    if self.config.log_traffic {
                        log_response(raw.status, attempt_start.elapsed(), &raw.headers, &raw.body);
                    }

                    if policy.is_retryable_status(raw.status) && policy.can_retry(retries) {
                        let delay = policy.delay_for(retries);
                        warn!(
                            "{} {}: attempt {}/{} returned {}, retrying in {:.1}s...",
                            request.method,
                            request.url,
                            retries + 1,
                            policy.max_attempts(),
                            raw.status,
                            delay.as_secs_f64()
                        );
                        thread::sleep(delay);
                        retries += 1;
                        continue;
                    }

                    return Ok(ApiResponse::new(raw, start.elapsed()));
                }
                Err(e) => {
                    if policy.is_retryable_error(&e) && policy.can_retry(retries) {
                        let delay = policy.delay_for(retries);
                        warn!(
                            "{} {}: attempt {}/{} failed ({}), retrying in {:.1}s...",
                            request.method,
                            request.url,
                            retries + 1,
                            policy.max_attempts(),
                            e,
                            delay.as_secs_f64()
                        );
                        thread::sleep(delay);
                        retries += 1;
                        continue;
                    }

                    let err = into_request_error(&request, e, start.elapsed());
                    error!("{}", err);
                    return Err(err);
                }
            }
        }
    }

    /// Sends `Authorization: Bearer <token>` with every later request.
    pub fn set_auth_token(&mut self, token: &str) {
        self.config.set_header(AUTHORIZATION, &format!("Bearer {}", token));
        info!("Authentication token set");
    }

    pub fn clear_auth_token(&mut self) {
        if self.config.remove_header(AUTHORIZATION) {
            info!("Authentication token cleared");
        }
    }

    /// Releases the network session. Later requests fail with a configuration error.
    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            debug!("API client session closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }
}

impl<T: Transport> Drop for ApiClient<T> {
    fn drop(&mut self) {
        self.close();
    }
}

fn into_request_error(
    request: &PreparedRequest,
    error: TransportError,
    elapsed: Duration,
) -> RequestError {
    match error.kind {
        TransportErrorKind::Timeout => RequestError::Timeout {
            method: request.method,
            url: request.url.clone(),
            elapsed,
        },
        TransportErrorKind::Connect | TransportErrorKind::Other => RequestError::RequestFailed {
            method: request.method,
            url: request.url.clone(),
            elapsed,
            reason: error.message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::retry::RetryPolicy;
    use crate::http::transport::{MockTransport, RawResponse};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FAST_BACKOFF: Duration = Duration::from_millis(100);

    fn config() -> ClientConfig {
        ClientConfig::new("https://x.test/api/").with_retry(RetryPolicy::none())
    }

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        }
    }

    #[test]
    fn test_prepare_builds_url_with_single_slash() {
        let client = ApiClient::with_transport(config(), MockTransport::new()).unwrap();
        let request = client.prepare(RequestSpec::new(Method::Get, "/users/")).unwrap();
        assert_eq!(request.url, "https://x.test/api/users/");
    }

    #[test]
    fn test_prepare_merges_headers_override_wins() {
        let client = ApiClient::with_transport(config(), MockTransport::new()).unwrap();
        let spec = RequestSpec::new(Method::Get, "users")
            .header("Accept", "text/html")
            .header("X-Trace", "1");
        let request = client.prepare(spec).unwrap();

        assert_eq!(
            request.headers,
            vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "text/html".to_string()),
                ("X-Trace".to_string(), "1".to_string()),
            ]
        );
        // Defaults are untouched.
        assert_eq!(client.config().header("Accept"), Some("application/json"));
    }

    #[test]
    fn test_merge_headers_does_not_case_fold() {
        let defaults = vec![("Accept".to_string(), "application/json".to_string())];
        let overrides = vec![("accept".to_string(), "text/plain".to_string())];
        let merged = merge_headers(&defaults, &overrides);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_prepare_timeout_resolution() {
        let client = ApiClient::with_transport(
            config().with_timeout(Some(Duration::from_secs(30))),
            MockTransport::new(),
        )
        .unwrap();
        let request = client.prepare(RequestSpec::new(Method::Get, "users")).unwrap();
        assert_eq!(request.timeout, Duration::from_secs(30));

        let request = client
            .prepare(RequestSpec::new(Method::Get, "users").timeout(Duration::from_secs(2)))
            .unwrap();
        assert_eq!(request.timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_prepare_json_wins_over_raw_body() {
        let client = ApiClient::with_transport(config(), MockTransport::new()).unwrap();
        let spec = RequestSpec::new(Method::Post, "users")
            .body("raw")
            .json(json!({"name": "neo"}));
        let request = client.prepare(spec).unwrap();
        assert_eq!(request.body, Some(RequestBody::Json(json!({"name": "neo"}))));

        let spec = RequestSpec::new(Method::Post, "users").body("raw");
        let request = client.prepare(spec).unwrap();
        assert_eq!(
            request.body,
            Some(RequestBody::Raw(RawBody::Text("raw".to_string())))
        );
    }

    #[test]
    fn test_execute_without_timeout_is_configuration_error() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();

        let client = ApiClient::with_transport(config().with_timeout(None), transport).unwrap();
        let err = client.get("users").send().unwrap_err();

        assert!(matches!(err, RequestError::Configuration(_)));
    }

    #[test]
    fn test_execute_success() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .withf(|r| {
                r.method == Method::Get
                    && r.url == "https://x.test/api/users"
                    && r.query == vec![("page".to_string(), "2".to_string())]
            })
            .returning(|_| Ok(raw(200, r#"{"page": 2}"#)));

        let client = ApiClient::with_transport(config(), transport).unwrap();
        let response = client.get("users").query("page", 2).send().unwrap();

        assert!(response.is_success());
        assert_eq!(response.json()["page"], 2);
    }

    #[test]
    fn test_execute_client_error_is_ok_and_not_retried() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(raw(404, "{}")));

        let config = config().with_retry(RetryPolicy::new(3, FAST_BACKOFF));
        let client = ApiClient::with_transport(config, transport).unwrap();
        let response = client.get("users/23").send().unwrap();

        assert!(response.is_client_error());
        assert_eq!(response.status_code, 404);
    }

    #[test]
    fn test_execute_retries_retryable_status_until_exhausted() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(4)
            .returning(|_| Ok(raw(503, r#"{"error": "unavailable"}"#)));

        let config = config().with_retry(RetryPolicy::new(3, FAST_BACKOFF));
        let client = ApiClient::with_transport(config, transport).unwrap();
        let response = client.get("users").send().unwrap();

        assert_eq!(response.status_code, 503);
        assert!(response.is_server_error());
        // 100ms + 200ms + 400ms of backoff, all inside the measured time.
        assert!(response.elapsed >= Duration::from_millis(700));
    }

    #[test]
    fn test_execute_retry_then_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let mut transport = MockTransport::new();
        transport.expect_send().times(2).returning(move |_| {
            if calls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(raw(429, ""))
            } else {
                Ok(raw(201, r#"{"id": "1"}"#))
            }
        });

        let config = config().with_retry(RetryPolicy::new(3, FAST_BACKOFF));
        let client = ApiClient::with_transport(config, transport).unwrap();
        let response = client.post("users").json(json!({"name": "neo"})).send().unwrap();

        assert_eq!(response.status_code, 201);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_execute_timeout_retried_then_surfaces_as_timeout() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(2).returning(|_| {
            Err(TransportError::new(
                TransportErrorKind::Timeout,
                "operation timed out",
            ))
        });

        let config = config().with_retry(RetryPolicy::new(1, FAST_BACKOFF));
        let client = ApiClient::with_transport(config, transport).unwrap();
        let err = client.get("users").send().unwrap_err();

        assert!(err.is_timeout());
        match err {
            RequestError::Timeout { method, url, elapsed } => {
                assert_eq!(method, Method::Get);
                assert_eq!(url, "https://x.test/api/users");
                assert!(elapsed >= FAST_BACKOFF);
            }
            other => panic!("Expected Timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_execute_connect_error_surfaces_as_request_failed() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(3).returning(|_| {
            Err(TransportError::new(
                TransportErrorKind::Connect,
                "connection refused",
            ))
        });

        let config = config().with_retry(RetryPolicy::new(2, FAST_BACKOFF));
        let client = ApiClient::with_transport(config, transport).unwrap();
        let err = client.delete("users/2").send().unwrap_err();

        match err {
            RequestError::RequestFailed { method, reason, .. } => {
                assert_eq!(method, Method::Delete);
                assert!(reason.contains("connection refused"));
            }
            other => panic!("Expected RequestFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_execute_non_transient_error_is_not_retried() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Err(TransportError::new(
                TransportErrorKind::Other,
                "invalid header value",
            ))
        });

        let config = config().with_retry(RetryPolicy::new(3, FAST_BACKOFF));
        let client = ApiClient::with_transport(config, transport).unwrap();
        let err = client.get("users").send().unwrap_err();

        assert!(matches!(err, RequestError::RequestFailed { .. }));
    }

    #[test]
    fn test_set_and_clear_auth_token() {
        let mut transport = MockTransport::new();
        let mut seq = mockall::Sequence::new();
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|r| {
                r.headers
                    .iter()
                    .any(|(k, v)| k == "Authorization" && v == "Bearer abc")
            })
            .returning(|_| Ok(raw(200, "{}")));
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|r| r.headers.iter().all(|(k, _)| k != "Authorization"))
            .returning(|_| Ok(raw(200, "{}")));

        let mut client = ApiClient::with_transport(config(), transport).unwrap();

        client.set_auth_token("abc");
        client.get("users").send().unwrap();

        client.clear_auth_token();
        client.get("users").send().unwrap();
        assert_eq!(client.config().header("Authorization"), None);
    }

    #[test]
    fn test_close_releases_session() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();

        let mut client = ApiClient::with_transport(config(), transport).unwrap();
        assert!(!client.is_closed());

        client.close();
        client.close();
        assert!(client.is_closed());
        assert!(client.transport().is_none());

        let err = client.get("users").send().unwrap_err();
        assert!(matches!(err, RequestError::Configuration(_)));
    }

    #[test]
    fn test_with_transport_rejects_invalid_config() {
        let result = ApiClient::with_transport(ClientConfig::new(""), MockTransport::new());
        assert!(matches!(result, Err(RequestError::Configuration(_))));
    }

    #[test_log::test]
    fn test_execute_with_traffic_logging_disabled() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(raw(200, "not json")));

        let client =
            ApiClient::with_transport(config().with_log_traffic(false), transport).unwrap();
        let response = client.get("users").send().unwrap();

        assert!(response.is_success());
        assert_eq!(response.json(), &json!({}));
    }

    #[test]
    fn test_client_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiClient<HttpTransport>>();
    }
}
