use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use serde_json::Value;

use super::{Checks, report};
use crate::config::Settings;
use crate::http::{ApiClient, Method, RequestSpec};

/// Per-call options for an ad-hoc request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub json: Option<Value>,
    pub data: Option<String>,
    pub timeout: Option<Duration>,
}

/// Sends one request and checks the response.
#[tracing::instrument(skip(settings, options, checks))]
pub fn request(
    settings: &Settings,
    method: Method,
    endpoint: &str,
    options: RequestOptions,
    checks: &Checks,
) -> Result<()> {
    let client = ApiClient::from_settings(settings)?;
    let url = client.config().url_for(endpoint);
    debug!("Sending {} {}", method, url);

    let mut spec = RequestSpec::new(method, endpoint);
    spec.query = options.query;
    spec.json = options.json;
    spec.timeout = options.timeout;
    if let Some(data) = options.data {
        spec = spec.body(data);
    }
    for (name, value) in &options.headers {
        spec = spec.header(name, value);
    }

    let response = client
        .execute(spec)
        .with_context(|| format!("{} {} did not complete", method, url))?;

    report(method, &url, &response, checks, settings)
}

/// Parses `key=value`. The value may itself contain `=`.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{}`", s)),
    }
}

pub fn parse_json(s: &str) -> Result<Value, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid JSON: {}", e))
}
