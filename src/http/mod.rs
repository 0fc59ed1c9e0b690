//! Blocking HTTP client with retry, response wrapping and traffic logging.

mod client;
mod error;
mod response;
mod retry;
mod transport;

pub use client::{ApiClient, RequestBuilder, RequestSpec, merge_headers};
pub use error::RequestError;
pub use response::ApiResponse;
pub use retry::{DEFAULT_BACKOFF_BASE, DEFAULT_RETRY_COUNT, RETRY_STATUSES, RetryPolicy};
pub use transport::{
    HttpTransport, Method, PreparedRequest, RawBody, RawResponse, RequestBody, Transport,
    TransportError, TransportErrorKind,
};

#[cfg(test)]
pub use transport::MockTransport;
