//! Masks credential-bearing fields before they reach a log sink.
//!
//! Only top-level keys are inspected. Nested objects are logged as they are.

use serde_json::{Map, Value};

/// Key fragments that mark a field as sensitive (matched case-insensitively).
pub const SENSITIVE_KEYS: &[&str] = &["password", "token", "api_key", "secret", "authorization"];

/// Replacement for sensitive values.
pub const REDACTED: &str = "***REDACTED***";

/// Check if a key names sensitive data.
pub fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_KEYS.iter().any(|sensitive| key.contains(sensitive))
}

/// Copy of `map` with sensitive top-level values replaced by [`REDACTED`].
pub fn redact_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let value = if is_sensitive_key(key) {
                Value::String(REDACTED.to_string())
            } else {
                value.clone()
            };
            (key.clone(), value)
        })
        .collect()
}

/// Redacts a JSON value if it is an object; other values pass through.
pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(redact_map(map)),
        other => other.clone(),
    }
}

/// Builds a redacted object from ordered pairs (headers, form fields).
///
/// A repeated key keeps its last value.
pub fn redact_pairs(pairs: &[(String, String)]) -> Map<String, Value> {
    let map: Map<String, Value> = pairs
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    redact_map(&map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_sensitive_key() {
        assert!(is_sensitive_key("password"));
        assert!(is_sensitive_key("PASSWORD"));
        assert!(is_sensitive_key("new_Password"));
        assert!(is_sensitive_key("Authorization"));
        assert!(is_sensitive_key("access_token"));
        assert!(is_sensitive_key("X-Api_Key"));
        assert!(is_sensitive_key("client_secret"));

        assert!(!is_sensitive_key("email"));
        assert!(!is_sensitive_key("name"));
        assert!(!is_sensitive_key("api-key")); // hyphen does not match "api_key"
    }

    #[test]
    fn test_redact_value_masks_password_any_case() {
        for key in ["password", "Password", "PASSWORD"] {
            let mut body = json!({ "email": "eve.holt@reqres.in" });
            body[key] = json!("pistol");
            let redacted = redact_value(&body);
            assert_eq!(redacted[key], REDACTED);
            assert_eq!(redacted["email"], "eve.holt@reqres.in");
        }
    }

    #[test]
    fn test_redact_value_without_sensitive_keys_is_unchanged() {
        let body = json!({"name": "morpheus", "job": "leader", "tags": [1, 2]});
        assert_eq!(redact_value(&body), body);
    }

    #[test]
    fn test_redaction_is_not_recursive() {
        let body = json!({"user": {"password": "nested"}, "token": {"value": "x"}});
        let redacted = redact_value(&body);
        assert_eq!(redacted["user"]["password"], "nested");
        assert_eq!(redacted["token"], REDACTED);
    }

    #[test]
    fn test_redact_value_non_object_passthrough() {
        assert_eq!(redact_value(&json!("password")), json!("password"));
        assert_eq!(redact_value(&json!([{"password": 1}])), json!([{"password": 1}]));
    }

    #[test]
    fn test_redact_pairs() {
        let headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Authorization".to_string(), "Bearer abc".to_string()),
        ];
        let redacted = redact_pairs(&headers);
        assert_eq!(redacted["Content-Type"], "application/json");
        assert_eq!(redacted["Authorization"], REDACTED);
    }
}
