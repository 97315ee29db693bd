use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{error, warn};

use super::{AppError, DataError, ErrorCode, ErrorResponse, PendingError};
use crate::api::middleware::client::{client_ip, user_agent};
use crate::metrics::registry::API_ERRORS_TOTAL;

/// Status, code, message and details chosen for a failure
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<Value>,
}

impl Classification {
    fn new(status: StatusCode, code: ErrorCode, message: &str) -> Self {
        Self {
            status,
            code,
            message: message.to_string(),
            details: None,
        }
    }
}

/// Request facts captured before the pipeline runs
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub method: String,
    pub path: String,
    pub url: String,
    pub ip: String,
    pub user_agent: String,
}

impl RequestContext {
    pub fn from_request(request: &Request) -> Self {
        Self {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            url: request.uri().to_string(),
            ip: client_ip(request.headers(), request.extensions()),
            user_agent: user_agent(request.headers()),
        }
    }
}

/// Map a failure onto the wire contract
///
/// Precedence is the match order: operational errors, validation failures,
/// then data-layer errors, then everything else.
pub fn classify(err: &AppError) -> Classification {
    match err {
        AppError::Operational(op) => Classification {
            status: op.status,
            code: op.code.clone(),
            message: op.message.clone(),
            details: op.details.clone(),
        },
        AppError::Validation(failure) => Classification {
            details: Some(serde_json::to_value(&failure.issues).unwrap_or(Value::Null)),
            ..Classification::new(
                StatusCode::BAD_REQUEST,
                ErrorCode::ValidationError,
                "Validation failed",
            )
        },
        AppError::Data(DataError::UniqueConstraint { fields }) => Classification {
            details: Some(json!({ "field": fields })),
            ..Classification::new(
                StatusCode::CONFLICT,
                ErrorCode::Conflict,
                "Unique constraint violation",
            )
        },
        AppError::Data(DataError::RecordNotFound) => Classification::new(
            StatusCode::NOT_FOUND,
            ErrorCode::NotFound,
            "Record not found",
        ),
        AppError::Data(DataError::Request { .. }) => Classification::new(
            StatusCode::BAD_REQUEST,
            ErrorCode::DatabaseError,
            "Database operation failed",
        ),
        AppError::Data(DataError::InvalidData(_)) => Classification::new(
            StatusCode::BAD_REQUEST,
            ErrorCode::ValidationError,
            "Invalid data provided",
        ),
        AppError::Unclassified(_) => Classification::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InternalError,
            "Internal server error",
        ),
    }
}

/// Log a failure with its full detail and build the client-facing envelope
pub fn render(err: &AppError, ctx: &RequestContext) -> (StatusCode, ErrorResponse) {
    let classification = classify(err);
    let stack = format!("{err:?}");

    if classification.status.is_server_error() {
        error!(
            message = %err,
            stack = %stack,
            url = %ctx.url,
            method = %ctx.method,
            ip = %ctx.ip,
            user_agent = %ctx.user_agent,
            status = classification.status.as_u16(),
            "Request failed"
        );
    } else {
        warn!(
            message = %err,
            stack = %stack,
            url = %ctx.url,
            method = %ctx.method,
            ip = %ctx.ip,
            user_agent = %ctx.user_agent,
            status = classification.status.as_u16(),
            "Request rejected"
        );
    }

    API_ERRORS_TOTAL
        .with_label_values(&[classification.code.as_str()])
        .inc();

    let body = ErrorResponse::new(classification.code, classification.message, &ctx.path)
        .with_details(classification.details);
    (classification.status, body)
}

/// Middleware rendering every recorded failure into the error envelope
///
/// Headers set by the failing stage (rate-limit headers, for instance) are
/// carried over to the rendered response.
pub async fn normalize_errors(request: Request, next: Next) -> Response {
    let ctx = RequestContext::from_request(&request);
    let mut response = next.run(request).await;

    let Some(PendingError(err)) = response.extensions_mut().remove::<PendingError>() else {
        return response;
    };

    let (status, body) = render(&err, &ctx);
    let mut rendered = (status, Json(body)).into_response();
    for (name, value) in response.headers() {
        if name == header::CONTENT_TYPE || name == header::CONTENT_LENGTH {
            continue;
        }
        rendered.headers_mut().append(name.clone(), value.clone());
    }
    rendered
}
