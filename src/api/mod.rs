//! Endpoint clients for the service under test.
//!
//! Each client borrows an [`ApiClient`](crate::http::ApiClient) and maps one
//! group of endpoints onto it. Optional extra fields are passed as an ordered
//! list applied after the required fields; a later entry replaces an earlier
//! one with the same key.

mod auth;
mod resources;
mod users;

pub use auth::{AuthApi, token_from};
pub use resources::{NewResource, ResourcesApi};
pub use users::{UsersApi, list_data};

use serde_json::{Map, Value};

/// Builds a JSON object from required fields followed by extra fields.
pub fn build_payload(required: Vec<(&str, Value)>, extra: &[(&str, Value)]) -> Value {
    let mut payload = Map::new();
    for (key, value) in required {
        payload.insert(key.to_string(), value);
    }
    for (key, value) in extra {
        payload.insert(key.to_string(), value.clone());
    }
    Value::Object(payload)
}

fn page_query(page: Option<u32>, per_page: Option<u32>) -> Vec<(String, String)> {
    let mut query = Vec::new();
    if let Some(page) = page {
        query.push(("page".to_string(), page.to_string()));
    }
    if let Some(per_page) = per_page {
        query.push(("per_page".to_string(), per_page.to_string()));
    }
    query
}
