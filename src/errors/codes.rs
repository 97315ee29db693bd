use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Error codes for structured API responses
///
/// The six named variants form the closed taxonomy every pipeline stage maps
/// onto. `Custom` carries codes supplied by callers constructing an
/// [`OperationalError`](super::OperationalError) directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Input validation failed
    ValidationError,

    /// Requested record or route does not exist
    NotFound,

    /// Unique constraint violated
    Conflict,

    /// Data layer rejected the operation
    DatabaseError,

    /// Too many requests / rate limit exceeded
    RateLimitError,

    /// Internal server error
    InternalError,

    /// Caller-supplied operational code (e.g. `PAYLOAD_TOO_LARGE`)
    Custom(String),
}

impl ErrorCode {
    pub fn custom(code: impl Into<String>) -> Self {
        Self::from(code.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::RateLimitError => "RATE_LIMIT_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
            Self::Custom(code) => code,
        }
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "VALIDATION_ERROR" => Self::ValidationError,
            "NOT_FOUND" => Self::NotFound,
            "CONFLICT" => Self::Conflict,
            "DATABASE_ERROR" => Self::DatabaseError,
            "RATE_LIMIT_ERROR" => Self::RateLimitError,
            "INTERNAL_ERROR" => Self::InternalError,
            _ => Self::Custom(code),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}
