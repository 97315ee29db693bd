//! Structured error handling for API responses
//!
//! Every stage of the request pipeline reports failures as an [`AppError`].
//! Converting one into a response only records the failure on the response;
//! the [`normalizer`] middleware renders the envelope.

pub mod codes;
pub mod data;
pub mod normalizer;
pub mod operational;
pub mod response;

use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use thiserror::Error;

use crate::validation::ValidationFailure;

pub use codes::ErrorCode;
pub use data::DataError;
pub use normalizer::{normalize_errors, RequestContext};
pub use operational::OperationalError;
pub use response::{ErrorDetail, ErrorResponse};

/// Any failure a pipeline stage or handler can produce
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Operational(#[from] OperationalError),

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error(transparent)]
    Data(#[from] DataError),

    /// Unexpected defect; its text never reaches the client
    #[error("{0}")]
    Unclassified(anyhow::Error),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<OperationalError>() {
            Ok(op) => return Self::Operational(op),
            Err(err) => err,
        };
        let err = match err.downcast::<ValidationFailure>() {
            Ok(failure) => return Self::Validation(failure),
            Err(err) => err,
        };
        match err.downcast::<DataError>() {
            Ok(data) => Self::Data(data),
            Err(err) => Self::Unclassified(err),
        }
    }
}

/// Failure recorded on a response, awaiting rendering by the normalizer
#[derive(Debug, Clone)]
pub struct PendingError(pub Arc<AppError>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = normalizer::classify(&self).status;
        let mut response = status.into_response();
        response
            .extensions_mut()
            .insert(PendingError(Arc::new(self)));
        response
    }
}
