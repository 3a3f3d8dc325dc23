use std::net::SocketAddr;

use eyre::Result;
use http::{HeaderName, HeaderValue};

use crate::config::models::GatewayConfig;

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Gateway configuration validator
pub struct GatewayConfigValidator;

impl GatewayConfigValidator {
    /// Validate the entire gateway configuration, collecting every error.
    pub fn validate(config: &GatewayConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if !config.batch_path.starts_with('/') {
            errors.push(ValidationError::InvalidField {
                field: "batch_path".to_string(),
                message: "Batch path must start with '/'".to_string(),
            });
        }

        if config.max_requests == 0 {
            errors.push(ValidationError::InvalidField {
                field: "max_requests".to_string(),
                message: "Must accept at least one request per batch".to_string(),
            });
        }

        if config.concurrency == 0 {
            errors.push(ValidationError::InvalidField {
                field: "concurrency".to_string(),
                message: "Concurrency bound must be at least 1".to_string(),
            });
        }

        if config.request_timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "request_timeout_secs".to_string(),
                message: "Per-request timeout must be non-zero".to_string(),
            });
        }

        if config.batch_timeout_secs == Some(0) {
            errors.push(ValidationError::InvalidField {
                field: "batch_timeout_secs".to_string(),
                message: "Batch deadline must be non-zero when set".to_string(),
            });
        }

        for (name, value) in &config.default_headers {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidField {
                    field: format!("default_headers.{name}"),
                    message: "Not a valid HTTP header name".to_string(),
                });
            }
            if HeaderValue::from_str(value).is_err() {
                errors.push(ValidationError::InvalidField {
                    field: format!("default_headers.{name}"),
                    message: "Not a valid HTTP header value".to_string(),
                });
            }
        }

        for name in &config.forward_headers {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidField {
                    field: format!("forward_headers.{name}"),
                    message: "Not a valid HTTP header name".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
