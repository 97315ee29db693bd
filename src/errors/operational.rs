use axum::http::StatusCode;
use serde_json::Value;
use thiserror::Error;

use super::codes::ErrorCode;

/// An expected, explicitly constructed failure
///
/// Its status, code and message reach the client verbatim.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct OperationalError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<Value>,
}

impl OperationalError {
    pub fn new(message: impl Into<String>, status: StatusCode, code: ErrorCode) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::NOT_FOUND, ErrorCode::NotFound)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::BAD_REQUEST, ErrorCode::ValidationError)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            message,
            StatusCode::UNAUTHORIZED,
            ErrorCode::custom("UNAUTHORIZED"),
        )
    }

    pub fn method_not_allowed(method: &str) -> Self {
        Self::new(
            format!("Method {method} not allowed"),
            StatusCode::METHOD_NOT_ALLOWED,
            ErrorCode::custom("METHOD_NOT_ALLOWED"),
        )
    }

    pub fn rate_limited() -> Self {
        Self::new(
            "Too many requests, please try again later",
            StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::RateLimitError,
        )
    }

    pub fn payload_too_large(max_bytes: usize) -> Self {
        Self::new(
            format!("Request body exceeds the {max_bytes} byte limit"),
            StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::custom("PAYLOAD_TOO_LARGE"),
        )
    }
}
