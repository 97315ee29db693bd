use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::codes::ErrorCode;

/// Structured error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always false for errors
    pub success: bool,
    /// RFC 3339 time the failure was rendered
    pub timestamp: String,
    /// Error details
    pub error: ErrorDetail,
}

/// Error details
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Error code for programmatic handling
    #[schema(value_type = String, example = "VALIDATION_ERROR")]
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Request path at the time of failure
    pub path: String,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(code: ErrorCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            success: false,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            error: ErrorDetail {
                code,
                message: message.into(),
                details: None,
                path: path.into(),
            },
        }
    }

    /// Attach details, if any
    pub fn with_details(mut self, details: Option<Value>) -> Self {
        self.error.details = details;
        self
    }
}
