use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use super::{log_sanitized, sanitize_value};
use crate::api::middleware::client::client_ip;
use crate::errors::{AppError, OperationalError};
use crate::query::{parse_pairs, replace_query};

#[derive(Debug, Clone)]
pub struct SanitizeSettings {
    /// Ceiling applied while buffering bodies
    pub max_body_bytes: usize,
}

/// Middleware sanitizing the query string and any JSON body
///
/// Route parameters only exist after routing and are sanitized by the
/// validation stage when it materializes them.
pub async fn sanitize_request(
    State(settings): State<SanitizeSettings>,
    request: Request,
    next: Next,
) -> Response {
    match sanitize(request, &settings).await {
        Ok(request) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

async fn sanitize(request: Request, settings: &SanitizeSettings) -> Result<Request, AppError> {
    let path = request.uri().path().to_string();
    let ip = client_ip(request.headers(), request.extensions());
    let (mut parts, body) = request.into_parts();
    let mut changed = Vec::new();

    if let Some(query) = parts.uri.query().filter(|q| !q.is_empty()) {
        let original = parse_pairs(query);
        let mut pairs = original.clone();
        for (key, value) in pairs.iter_mut() {
            let mut leaf = Value::String(std::mem::take(value));
            changed.extend(sanitize_value(&mut leaf, &format!("query.{key}")));
            if let Value::String(clean) = leaf {
                *value = clean;
            }
        }
        if pairs != original {
            parts.uri = replace_query(&parts.uri, &pairs)?;
        }
    }

    // Any body that parses as JSON is walked, whatever its declared media type
    let bytes = axum::body::to_bytes(body, settings.max_body_bytes)
        .await
        .map_err(|_| OperationalError::payload_too_large(settings.max_body_bytes))?;

    let body = match serde_json::from_slice::<Value>(&bytes) {
        Ok(mut value) => {
            let leaves = sanitize_value(&mut value, "body");
            if leaves.is_empty() {
                Body::from(bytes)
            } else {
                changed.extend(leaves);
                let rewritten = serde_json::to_vec(&value).map_err(anyhow::Error::from)?;
                parts.headers.remove(header::CONTENT_LENGTH);
                Body::from(rewritten)
            }
        }
        // Malformed JSON is reported by the validator.
        Err(_) => Body::from(bytes),
    };

    log_sanitized(&changed, &path, &ip);
    Ok(Request::from_parts(parts, body))
}
