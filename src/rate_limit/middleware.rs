use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

use super::{Decision, RateLimiter};
use crate::api::middleware::client::{client_ip, user_agent};
use crate::errors::{AppError, OperationalError};
use crate::metrics::registry::RATE_LIMIT_REJECTIONS_TOTAL;

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Middleware counting each request against `limiter`
///
/// Requests over the ceiling short-circuit with a 429 `RATE_LIMIT_ERROR`
/// carrying `Retry-After`. When limiters are nested, the innermost one's
/// `RateLimit-*` headers are kept.
pub async fn enforce_rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = limiter.key_for(request.headers(), request.extensions());
    let decision = limiter.check(&key);
    let reset_secs = limiter.seconds_until_reset(&decision);

    if !decision.allowed {
        let policy = &limiter.policy().name;
        warn!(
            ip = %client_ip(request.headers(), request.extensions()),
            user_agent = %user_agent(request.headers()),
            path = %request.uri().path(),
            method = %request.method(),
            policy = %policy,
            "Rate limit exceeded"
        );
        RATE_LIMIT_REJECTIONS_TOTAL
            .with_label_values(&[policy.as_str()])
            .inc();

        let mut response = AppError::from(OperationalError::rate_limited()).into_response();
        let headers = response.headers_mut();
        set_limit_headers(headers, &decision, reset_secs);
        headers.insert(axum::http::header::RETRY_AFTER, HeaderValue::from(reset_secs));
        return response;
    }

    let mut response = next.run(request).await;
    set_limit_headers(response.headers_mut(), &decision, reset_secs);
    response
}

fn set_limit_headers(headers: &mut HeaderMap, decision: &Decision, reset_secs: u64) {
    headers
        .entry(RATELIMIT_LIMIT)
        .or_insert(HeaderValue::from(decision.limit));
    headers
        .entry(RATELIMIT_REMAINING)
        .or_insert(HeaderValue::from(decision.remaining));
    headers
        .entry(RATELIMIT_RESET)
        .or_insert(HeaderValue::from(reset_secs));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PendingError;
    use crate::rate_limit::{create_limiter, ManualClock};
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(limiter: Arc<RateLimiter>) -> Router {
        Router::new()
            .route("/limited", get(|| async { "ok" }))
            .layer(from_fn_with_state(limiter, enforce_rate_limit))
    }

    fn request_from(ip: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .uri("/limited")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_headers_and_rejection() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = Arc::new(create_limiter(Duration::from_secs(60), 2).with_clock(clock));
        let app = app(limiter);

        let first = app.clone().oneshot(request_from("1.1.1.1")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["ratelimit-limit"], "2");
        assert_eq!(first.headers()["ratelimit-remaining"], "1");
        assert_eq!(first.headers()["ratelimit-reset"], "60");

        app.clone().oneshot(request_from("1.1.1.1")).await.unwrap();
        let third = app.clone().oneshot(request_from("1.1.1.1")).await.unwrap();
        assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(third.headers()["retry-after"], "60");
        assert_eq!(third.headers()["ratelimit-remaining"], "0");
        assert!(third.extensions().get::<PendingError>().is_some());

        let other = app.oneshot(request_from("2.2.2.2")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_inner_limiter_headers_win() {
        let outer = Arc::new(create_limiter(Duration::from_secs(900), 1000));
        let inner = Arc::new(create_limiter(Duration::from_secs(60), 5));
        let app = Router::new()
            .route(
                "/login",
                get(|| async { "ok" }).route_layer(from_fn_with_state(inner, enforce_rate_limit)),
            )
            .layer(from_fn_with_state(outer, enforce_rate_limit));

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["ratelimit-limit"], "5");
    }
}
