use serde_json::{Value, json};

use super::build_payload;
use crate::config::AUTHORIZATION;
use crate::http::{ApiClient, ApiResponse, HttpTransport, RequestError, Transport};

/// The `register`, `login` and `logout` endpoints.
pub struct AuthApi<'a, T: Transport = HttpTransport> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> AuthApi<'a, T> {
    pub fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    pub fn register(
        &self,
        email: &str,
        password: &str,
        extra: &[(&str, Value)],
    ) -> Result<ApiResponse, RequestError> {
        self.post_credentials("register", Some(email), Some(password), extra)
    }

    /// Registration with missing fields, for negative checks.
    pub fn register_partial(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<ApiResponse, RequestError> {
        self.post_credentials("register", email, password, &[])
    }

    pub fn login(
        &self,
        email: &str,
        password: &str,
        extra: &[(&str, Value)],
    ) -> Result<ApiResponse, RequestError> {
        self.post_credentials("login", Some(email), Some(password), extra)
    }

    /// Login with missing fields, for negative checks.
    pub fn login_partial(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<ApiResponse, RequestError> {
        self.post_credentials("login", email, password, &[])
    }

    /// Logs out, sending `token` as a bearer credential when given.
    pub fn logout(&self, token: Option<&str>) -> Result<ApiResponse, RequestError> {
        let mut request = self.client.post("logout");
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, &format!("Bearer {}", token));
        }
        request.send()
    }

    fn post_credentials(
        &self,
        endpoint: &str,
        email: Option<&str>,
        password: Option<&str>,
        extra: &[(&str, Value)],
    ) -> Result<ApiResponse, RequestError> {
        let mut required = Vec::new();
        if let Some(email) = email {
            required.push(("email", json!(email)));
        }
        if let Some(password) = password {
            required.push(("password", json!(password)));
        }
        self.client
            .post(endpoint)
            .json(build_payload(required, extra))
            .send()
    }
}

/// The `token` field of a login or registration response.
pub fn token_from(response: &ApiResponse) -> Option<&str> {
    response.json().get("token").and_then(Value::as_str)
}
