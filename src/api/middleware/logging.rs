use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::client::{client_ip, user_agent};
use crate::query::parse_pairs;

/// Query keys whose values never reach the logs
const SENSITIVE_KEYS: &[&str] = &["api_key", "token", "password", "secret"];

/// Middleware to log all HTTP requests and responses with structured data
///
/// Each request gets a UUID that is echoed back as `X-Request-Id`.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = redact_query(request.uri().query().unwrap_or(""));
    let ip = client_ip(request.headers(), request.extensions());
    let agent = user_agent(request.headers());

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        query = %query,
        ip = %ip,
        user_agent = %agent,
        "Incoming request"
    );

    let mut response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();
    log_completion(&request_id, &method, &path, status, duration.as_millis());

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

fn log_completion(request_id: &str, method: &str, path: &str, status: StatusCode, duration_ms: u128) {
    if status.is_server_error() {
        error!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration_ms,
            "Request failed (server error)"
        );
    } else if status.is_client_error() {
        warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration_ms,
            "Request failed (client error)"
        );
    } else {
        info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration_ms,
            "Request completed"
        );
    }
}

/// Mask the values of sensitive query parameters
fn redact_query(query: &str) -> String {
    query
        .split('&')
        .map(|segment| {
            let raw_key = segment.split_once('=').map(|(k, _)| k).unwrap_or(segment);
            let key = parse_pairs(raw_key)
                .into_iter()
                .next()
                .map(|(k, _)| k.to_ascii_lowercase())
                .unwrap_or_default();
            if SENSITIVE_KEYS.contains(&key.as_str()) {
                format!("{raw_key}=***")
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware::from_fn, routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn test_redact_query() {
        assert_eq!(redact_query(""), "");
        assert_eq!(redact_query("search=verbs"), "search=verbs");
        assert_eq!(redact_query("api_key=secret123"), "api_key=***");
        assert_eq!(
            redact_query("q=sol+ring&Password=hunter2&limit=10&token=a&token=b"),
            "q=sol+ring&Password=***&limit=10&token=***&token=***"
        );
    }

    #[tokio::test]
    async fn test_request_id_header() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(from_fn(logging_middleware));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let id = response.headers()["x-request-id"].to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }
}
