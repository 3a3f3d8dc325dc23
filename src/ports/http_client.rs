use async_trait::async_trait;
use axum::body::Body as AxumBody;
use hyper::{Request, Response};
use thiserror::Error;

/// Custom error type for HTTP client operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpClientError {
    /// Error when the connection to the target fails
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error when the outgoing request cannot be constructed or sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for HTTP client operations
pub type HttpClientResult<T> = Result<T, HttpClientError>;

/// HttpClient defines the port (interface) for issuing sub-requests.
///
/// The execution engine depends only on this trait, which keeps it fully
/// testable with an in-memory client. Timeouts are enforced by the engine,
/// not by implementations.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// Send one HTTP request to its target.
    ///
    /// # Arguments
    /// * `req` - The HTTP request to send
    ///
    /// # Returns
    /// A future that resolves to the target's response or an error
    async fn send_request(&self, req: Request<AxumBody>) -> HttpClientResult<Response<AxumBody>>;
}
