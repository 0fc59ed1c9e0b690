//! Response envelope with status classification and lazy JSON decoding.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use log::error;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::transport::RawResponse;
use crate::logging::truncate;

/// The wrapped result of one HTTP exchange.
///
/// Status, headers and body text are captured at construction. The JSON view is
/// decoded on first access and cached; a body that is not JSON decodes to an
/// empty object instead of an error.
#[derive(Debug)]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub elapsed: Duration,
    pub text: String,
    decoded: OnceCell<Decoded>,
}

#[derive(Debug)]
struct Decoded {
    value: Value,
    error: Option<String>,
}

impl ApiResponse {
    pub fn new(raw: RawResponse, elapsed: Duration) -> Self {
        let mut headers: HashMap<String, String> = HashMap::new();
        for (name, value) in raw.headers {
            headers
                .entry(name.to_ascii_lowercase())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        Self {
            status_code: raw.status,
            headers,
            elapsed,
            text: raw.body,
            decoded: OnceCell::new(),
        }
    }

    /// The body decoded as JSON, or an empty object if it is not valid JSON.
    pub fn json(&self) -> &Value {
        &self.decoded().value
    }

    /// The decode error recorded by [`json`](Self::json), if decoding failed.
    pub fn json_error(&self) -> Option<&str> {
        self.decoded().error.as_deref()
    }

    /// Strict typed decoding for callers that need the body to match a shape.
    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.text)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code)
    }

    fn decoded(&self) -> &Decoded {
        self.decoded
            .get_or_init(|| match serde_json::from_str::<Value>(&self.text) {
                Ok(value) => Decoded { value, error: None },
                Err(e) => {
                    error!(
                        "Failed to decode JSON response: {}",
                        truncate(&self.text, 200)
                    );
                    Decoded {
                        value: Value::Object(Map::new()),
                        error: Some(e.to_string()),
                    }
                }
            })
    }
}

impl fmt::Display for ApiResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<ApiResponse [{}] {:.3}s>",
            self.status_code,
            self.elapsed.as_secs_f64()
        )
    }
}
