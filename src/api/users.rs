use serde_json::{Map, Value, json};

use super::{build_payload, page_query};
use crate::http::{ApiClient, ApiResponse, HttpTransport, RequestError, Transport};

const PREFIX: &str = "users";

/// The `users` endpoints.
pub struct UsersApi<'a, T: Transport = HttpTransport> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> UsersApi<'a, T> {
    pub fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    pub fn list(
        &self,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<ApiResponse, RequestError> {
        let mut request = self.client.get(PREFIX);
        for (key, value) in page_query(page, per_page) {
            request = request.query(&key, value);
        }
        request.send()
    }

    pub fn get(&self, id: u64) -> Result<ApiResponse, RequestError> {
        self.client.get(&format!("{}/{}", PREFIX, id)).send()
    }

    pub fn create(
        &self,
        name: &str,
        job: &str,
        extra: &[(&str, Value)],
    ) -> Result<ApiResponse, RequestError> {
        let payload = build_payload(vec![("name", json!(name)), ("job", json!(job))], extra);
        self.client.post(PREFIX).json(payload).send()
    }

    /// Full update (PUT). Only the given fields are sent.
    pub fn update(
        &self,
        id: u64,
        name: Option<&str>,
        job: Option<&str>,
        extra: &[(&str, Value)],
    ) -> Result<ApiResponse, RequestError> {
        let mut required = Vec::new();
        if let Some(name) = name {
            required.push(("name", json!(name)));
        }
        if let Some(job) = job {
            required.push(("job", json!(job)));
        }
        let payload = build_payload(required, extra);
        self.client
            .put(&format!("{}/{}", PREFIX, id))
            .json(payload)
            .send()
    }

    /// Partial update (PATCH).
    pub fn partial_update(
        &self,
        id: u64,
        fields: &[(&str, Value)],
    ) -> Result<ApiResponse, RequestError> {
        let payload = build_payload(Vec::new(), fields);
        self.client
            .patch(&format!("{}/{}", PREFIX, id))
            .json(payload)
            .send()
    }

    pub fn delete(&self, id: u64) -> Result<ApiResponse, RequestError> {
        self.client.delete(&format!("{}/{}", PREFIX, id)).send()
    }

    /// Lists users with a server-side delay, for response-time checks.
    pub fn list_delayed(&self, delay_secs: u32) -> Result<ApiResponse, RequestError> {
        self.client.get(PREFIX).query("delay", delay_secs).send()
    }
}

/// The `data` array of a list response, or empty if absent.
pub fn list_data(response: &ApiResponse) -> Vec<Map<String, Value>> {
    response
        .json()
        .get("data")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
        .unwrap_or_default()
}
