use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::{AppError, OperationalError};

/// Reject requests whose declared `Content-Length` exceeds `max_bytes`
///
/// Streamed bodies without a length are bounded where they are buffered.
pub async fn limit_body_size(
    State(max_bytes): State<usize>,
    request: Request,
    next: Next,
) -> Response {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    match declared {
        Some(length) if length > max_bytes as u64 => {
            AppError::from(OperationalError::payload_too_large(max_bytes)).into_response()
        }
        _ => next.run(request).await,
    }
}
