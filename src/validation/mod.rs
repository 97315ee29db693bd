//! Schema-driven validation of request bodies, route parameters and queries

pub mod extract;
pub mod issues;
pub mod middleware;
pub mod schema;

pub use extract::{ValidBody, ValidParams, ValidQuery};
pub use issues::{FieldIssue, IssueCode, RequestPart, ValidationFailure};
pub use middleware::{validate_request, RequestSchemas};
pub use schema::Schema;
