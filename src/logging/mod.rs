//! Logging setup and traffic records.
//!
//! # Structure
//!
//! - `redact` - Masking of credential-bearing fields
//! - `traffic` - Request/response log records
//!
//! [`init`] installs two sinks on one subscriber: a colorized console stream on
//! stderr and, optionally, a JSON log file. `log` macros are bridged into the
//! same subscriber, so both styles of call site reach both sinks.

pub mod redact;
pub mod traffic;

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use redact::{REDACTED, is_sensitive_key, redact_map, redact_pairs, redact_value};
pub use traffic::{log_request, log_response};

/// Where and how much to log.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Level or filter directive, e.g. `INFO` or `apiprobe=debug`.
    pub level: String,
    /// Directory for the JSON log file; `None` disables the file sink.
    pub log_dir: Option<PathBuf>,
}

/// Installs the global subscriber. Returns the log file path, if any.
pub fn init(options: &LogOptions) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_new(filter_directive(&options.level))
        .with_context(|| format!("Invalid log level: {}", options.level))?;

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false);

    let (file_layer, log_file) = match &options.log_dir {
        Some(dir) => {
            let (file, path) = create_log_file(dir)?;
            let layer = fmt::layer()
                .json()
                .with_writer(Mutex::new(file))
                .with_file(true)
                .with_line_number(true);
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    if let Some(path) = &log_file {
        tracing::info!("Logging to file: {}", path.display());
    }

    Ok(log_file)
}

/// Maps level names used in env files (`WARNING`, `CRITICAL`) onto filter directives.
pub fn filter_directive(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    }
}

/// Creates `<dir>/api_tests_<timestamp>.log`.
pub fn create_log_file(dir: &Path) -> Result<(File, PathBuf)> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {:?}", dir))?;

    let path = dir.join(log_file_name(chrono::Local::now()));
    let file =
        File::create(&path).with_context(|| format!("Failed to create log file {:?}", path))?;
    Ok((file, path))
}

fn log_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("api_tests_{}.log", now.format("%Y%m%d_%H%M%S"))
}

/// First `max_chars` characters of `text`, respecting char boundaries.
pub fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
