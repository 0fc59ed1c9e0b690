//! Request and response log records.
//!
//! Everything passes through [`redact`](super::redact) first. These functions
//! only emit log records; they never fail and never touch the data they are
//! given.

use std::time::Duration;

use log::{Level, debug, info, log_enabled};
use serde_json::Value;

use super::redact::{redact_pairs, redact_value};
use super::truncate;
use crate::http::{Method, RawBody, RequestBody};

/// Logs an outbound request.
pub fn log_request(
    method: Method,
    url: &str,
    headers: &[(String, String)],
    body: Option<&RequestBody>,
) {
    info!("→ REQUEST: {} {}", method, url);
    if !log_enabled!(Level::Debug) {
        return;
    }

    let headers = redact_pairs(headers);
    if !headers.is_empty() {
        debug!("  Headers: {}", Value::Object(headers));
    }

    if let Some(body) = body.and_then(render_request_body) {
        debug!("  Body: {}", body);
    }
}

/// Logs an inbound response.
pub fn log_response(status: u16, elapsed: Duration, headers: &[(String, String)], body: &str) {
    info!("← RESPONSE: {} ({:.3}s)", status, elapsed.as_secs_f64());
    if !log_enabled!(Level::Debug) {
        return;
    }

    let headers = redact_pairs(headers);
    if !headers.is_empty() {
        debug!("  Headers: {}", Value::Object(headers));
    }

    if let Some(body) = render_response_body(body) {
        debug!("  Body: {}", body);
    }
}

pub(crate) fn render_request_body(body: &RequestBody) -> Option<String> {
    match body {
        RequestBody::Json(value) => render_json(value),
        RequestBody::Raw(RawBody::Form(pairs)) if !pairs.is_empty() => {
            Some(Value::Object(redact_pairs(pairs)).to_string())
        }
        RequestBody::Raw(RawBody::Form(_)) => None,
        RequestBody::Raw(RawBody::Text(text)) => render_response_body(text),
    }
}

pub(crate) fn render_response_body(body: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(value) => render_json(&value),
        Err(_) => Some(truncate(body, 200)),
    }
}

fn render_json(value: &Value) -> Option<String> {
    let empty = match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    };
    if empty {
        None
    } else {
        Some(redact_value(value).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::redact::REDACTED;
    use serde_json::json;

    #[test]
    fn test_render_request_body_redacts_json() {
        let body = RequestBody::Json(json!({"email": "a@b.c", "password": "pistol"}));
        let rendered = render_request_body(&body).unwrap();
        assert!(rendered.contains(REDACTED));
        assert!(!rendered.contains("pistol"));
        assert!(rendered.contains("a@b.c"));
    }

    #[test]
    fn test_render_request_body_redacts_form() {
        let body = RequestBody::Raw(RawBody::Form(vec![(
            "api_key".to_string(),
            "k-123".to_string(),
        )]));
        let rendered = render_request_body(&body).unwrap();
        assert!(!rendered.contains("k-123"));
    }

    #[test]
    fn test_render_request_body_redacts_json_text() {
        let body = RequestBody::Raw(RawBody::Text(r#"{"token": "abc"}"#.to_string()));
        let rendered = render_request_body(&body).unwrap();
        assert!(!rendered.contains("abc"));
    }

    #[test]
    fn test_render_response_body() {
        assert_eq!(render_response_body(""), None);
        assert_eq!(render_response_body("{}"), None);
        assert_eq!(
            render_response_body(r#"{"id": 1}"#),
            Some(r#"{"id":1}"#.to_string())
        );

        let long = "x".repeat(500);
        assert_eq!(render_response_body(&long).unwrap().chars().count(), 200);
    }

    #[test_log::test]
    fn test_log_functions_do_not_alter_inputs() {
        let headers = vec![("Authorization".to_string(), "Bearer t".to_string())];
        let body = RequestBody::Json(json!({"password": "p"}));

        log_request(Method::Post, "http://x.test/login", &headers, Some(&body));
        log_response(200, Duration::from_millis(5), &headers, r#"{"token": "t"}"#);

        assert_eq!(headers[0].1, "Bearer t");
        assert_eq!(body, RequestBody::Json(json!({"password": "p"})));
    }
}
