use serde::Serialize;
use serde_json::{Value, json};

use super::{build_payload, page_query};
use crate::http::{ApiClient, ApiResponse, HttpTransport, RequestError, Transport};

// The service exposes its generic resources under "unknown".
const PREFIX: &str = "unknown";

/// Required fields for a new resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewResource {
    pub name: String,
    pub year: u32,
    pub color: String,
    pub pantone_value: String,
}

/// The `unknown` (resources) endpoints.
pub struct ResourcesApi<'a, T: Transport = HttpTransport> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> ResourcesApi<'a, T> {
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
        resource: &NewResource,
        extra: &[(&str, Value)],
    ) -> Result<ApiResponse, RequestError> {
        let payload = build_payload(
            vec![
                ("name", json!(resource.name)),
                ("year", json!(resource.year)),
                ("color", json!(resource.color)),
                ("pantone_value", json!(resource.pantone_value)),
            ],
            extra,
        );
        self.client.post(PREFIX).json(payload).send()
    }

    pub fn update(&self, id: u64, fields: &[(&str, Value)]) -> Result<ApiResponse, RequestError> {
        self.client
            .put(&format!("{}/{}", PREFIX, id))
            .json(build_payload(Vec::new(), fields))
            .send()
    }

    pub fn partial_update(
        &self,
        id: u64,
        fields: &[(&str, Value)],
    ) -> Result<ApiResponse, RequestError> {
        self.client
            .patch(&format!("{}/{}", PREFIX, id))
            .json(build_payload(Vec::new(), fields))
            .send()
    }

    pub fn delete(&self, id: u64) -> Result<ApiResponse, RequestError> {
        self.client.delete(&format!("{}/{}", PREFIX, id)).send()
    }
}
