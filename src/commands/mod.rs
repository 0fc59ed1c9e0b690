use anyhow::Result;
use log::warn;
use serde_json::Value;

use crate::config::Settings;
use crate::http::{ApiResponse, Method};

mod config;
mod login;
mod request;
mod users;

pub use config::show_config;
pub use login::login;
pub use request::{RequestOptions, parse_json, parse_key_value, request};
pub use users::{UsersCommand, users};

/// Assertions applied to a response before the command reports success.
#[derive(clap::Args, Debug, Clone, Default, PartialEq)]
pub struct Checks {
    /// Expected status code (default: any 2xx)
    #[arg(long, value_name = "CODE", global = true)]
    pub expect_status: Option<u16>,

    /// Top-level JSON key that must be present (repeatable)
    #[arg(long = "expect-key", value_name = "KEY", global = true)]
    pub expect_keys: Vec<String>,
}

/// Fails if the response does not satisfy `checks` or the configured timing limits.
pub fn verify(response: &ApiResponse, checks: &Checks, settings: &Settings) -> Result<()> {
    match checks.expect_status {
        Some(expected) if response.status_code != expected => {
            anyhow::bail!("Expected status {}, got {}", expected, response.status_code);
        }
        None if !response.is_success() => {
            anyhow::bail!("Expected a 2xx status, got {}", response.status_code);
        }
        _ => {}
    }

    if !checks.expect_keys.is_empty() {
        let body = response.json();
        for key in &checks.expect_keys {
            if body.get(key).is_none() {
                anyhow::bail!("Response JSON has no key `{}`", key);
            }
        }
    }

    if response.elapsed > settings.slow_threshold() {
        warn!(
            "Slow response: {:.3}s exceeds {:.1}s",
            response.elapsed.as_secs_f64(),
            settings.slow_test_threshold
        );
    }

    if settings.enable_performance_tests && response.elapsed > settings.performance_threshold() {
        anyhow::bail!(
            "Response took {}ms, over the {}ms threshold",
            response.elapsed.as_millis(),
            settings.performance_threshold_ms
        );
    }

    Ok(())
}

/// Summary line followed by the body, pretty-printed when it is JSON.
pub fn render(method: Method, url: &str, response: &ApiResponse) -> String {
    let mut out = format!(
        "{} {} -> {} ({:.3}s)",
        method,
        url,
        response.status_code,
        response.elapsed.as_secs_f64()
    );

    let body = match response.json_as::<Value>() {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| response.text.clone()),
        Err(_) => response.text.clone(),
    };
    if !body.is_empty() {
        out.push('\n');
        out.push_str(&body);
    }
    out
}

/// Prints the response and applies the checks.
pub(crate) fn report(
    method: Method,
    url: &str,
    response: &ApiResponse,
    checks: &Checks,
    settings: &Settings,
) -> Result<()> {
    println!("{}", render(method, url, response));
    verify(response, checks, settings)
}
