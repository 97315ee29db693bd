use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Rule that rejected a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    InvalidType,
    Required,
    TooSmall,
    TooBig,
    InvalidString,
    InvalidEnumValue,
    InvalidJson,
}

/// One offending field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    /// Dot/bracket path, e.g. `lessons[2].title`
    pub field: String,
    pub message: String,
    pub code: IssueCode,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>, code: IssueCode) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code,
        }
    }
}

/// Which part of the request a schema applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPart {
    Body,
    Params,
    Query,
}

impl RequestPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Params => "params",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for RequestPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every issue found in the first request part that failed validation
#[derive(Debug, Clone, Error)]
#[error("{part} validation failed with {} issue(s)", issues.len())]
pub struct ValidationFailure {
    pub part: RequestPart,
    pub issues: Vec<FieldIssue>,
}

impl ValidationFailure {
    pub fn new(part: RequestPart, issues: Vec<FieldIssue>) -> Self {
        Self { part, issues }
    }
}
