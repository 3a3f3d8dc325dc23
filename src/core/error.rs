//! Batch-level error taxonomy.
//!
//! Errors split into two tiers. `BatchError` aborts the whole batch before
//! any sub-request is issued and maps to an HTTP 400 at the handler
//! boundary. Per-request failures (transport, timeouts) never become a
//! `BatchError`; they are recorded inside the failing key's
//! [`ExecutionResult`](crate::core::result::ExecutionResult) instead.

use thiserror::Error;

/// Error that aborts an entire batch before execution starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BatchError {
    /// Envelope or per-request shape/URL/method defect.
    #[error("{message}")]
    Validation {
        message: String,
        /// Key of the offending sub-request, when the defect is per-request.
        request: Option<String>,
    },

    /// Missing dependency reference or dependency cycle.
    #[error("{message}")]
    Dependency { message: String, request: String },
}

impl BatchError {
    /// Validation error not tied to a particular request key.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            request: None,
        }
    }

    /// Validation error tagged with the offending request key.
    pub fn validation_for(message: impl Into<String>, request: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            request: Some(request.into()),
        }
    }

    /// Dependency error tagged with the offending request key.
    pub fn dependency(message: impl Into<String>, request: impl Into<String>) -> Self {
        Self::Dependency {
            message: message.into(),
            request: request.into(),
        }
    }

    /// Wire-format type tag (`"ValidationError"` / `"DependencyError"`).
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::Dependency { .. } => "DependencyError",
        }
    }

    /// Request key the error is tagged with, if any.
    pub fn request_key(&self) -> Option<&str> {
        match self {
            Self::Validation { request, .. } => request.as_deref(),
            Self::Dependency { request, .. } => Some(request.as_str()),
        }
    }

    /// Serialize to the wire error object: `{"error": {"message", "request"?, "type"}}`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut error = serde_json::Map::new();
        error.insert("message".into(), serde_json::Value::String(self.to_string()));
        if let Some(key) = self.request_key() {
            error.insert("request".into(), serde_json::Value::String(key.to_string()));
        }
        error.insert(
            "type".into(),
            serde_json::Value::String(self.error_type().to_string()),
        );
        serde_json::json!({ "error": error })
    }
}
