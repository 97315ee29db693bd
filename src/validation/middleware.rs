use axum::{
    body::Body,
    extract::{FromRequestParts, RawPathParams, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::issues::{FieldIssue, IssueCode, RequestPart, ValidationFailure};
use super::schema::Schema;
use crate::api::middleware::client::client_ip;
use crate::config::RequestLimits;
use crate::errors::{AppError, OperationalError};
use crate::metrics::registry::VALIDATION_FAILURES_TOTAL;
use crate::query::{object_to_pairs, pairs_to_object, parse_pairs, replace_query};
use crate::sanitize::{log_sanitized, sanitize_value};

/// Validated body, as stored in request extensions
#[derive(Debug, Clone)]
pub struct ValidatedBody(pub Value);

/// Validated route parameters
#[derive(Debug, Clone)]
pub struct ValidatedParams(pub Value);

/// Validated query parameters
#[derive(Debug, Clone)]
pub struct ValidatedQuery(pub Value);

/// Shapes declared for a route
#[derive(Debug, Clone)]
pub struct RequestSchemas {
    pub body: Option<Schema>,
    pub params: Option<Schema>,
    pub query: Option<Schema>,
    /// Ceiling applied while buffering the body
    pub max_body_bytes: usize,
}

impl Default for RequestSchemas {
    fn default() -> Self {
        Self {
            body: None,
            params: None,
            query: None,
            max_body_bytes: RequestLimits::default().max_body_bytes,
        }
    }
}

impl RequestSchemas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn body(mut self, schema: Schema) -> Self {
        self.body = Some(schema);
        self
    }

    pub fn params(mut self, schema: Schema) -> Self {
        self.params = Some(schema);
        self
    }

    pub fn query(mut self, schema: Schema) -> Self {
        self.query = Some(schema);
        self
    }
}

/// Middleware validating body, then params, then query
///
/// The first failing part aborts the request with all of that part's issues.
/// Parts that pass are replaced by their coerced form.
pub async fn validate_request(
    State(schemas): State<Arc<RequestSchemas>>,
    request: Request,
    next: Next,
) -> Response {
    match validate_parts(&schemas, request).await {
        Ok(request) => next.run(request).await,
        Err(err) => {
            if let AppError::Validation(failure) = &err {
                VALIDATION_FAILURES_TOTAL
                    .with_label_values(&[failure.part.as_str()])
                    .inc();
            }
            err.into_response()
        }
    }
}

async fn validate_parts(schemas: &RequestSchemas, request: Request) -> Result<Request, AppError> {
    let (mut parts, mut body) = request.into_parts();

    if let Some(schema) = &schemas.body {
        let bytes = axum::body::to_bytes(body, schemas.max_body_bytes)
            .await
            .map_err(|_| OperationalError::payload_too_large(schemas.max_body_bytes))?;
        let mut raw = parse_body(&bytes)?;
        let changed = sanitize_value(&mut raw, "body");
        if !changed.is_empty() {
            let ip = client_ip(&parts.headers, &parts.extensions);
            log_sanitized(&changed, parts.uri.path(), &ip);
        }
        let value = check(schema, &raw, RequestPart::Body, false)?;

        let rewritten = serde_json::to_vec(&value).map_err(anyhow::Error::from)?;
        parts.headers.remove(header::CONTENT_LENGTH);
        parts.extensions.insert(ValidatedBody(value));
        body = Body::from(rewritten);
    }

    if let Some(schema) = &schemas.params {
        let raw = path_params(&mut parts).await;
        let value = check(schema, &raw, RequestPart::Params, true)?;
        parts.extensions.insert(ValidatedParams(value));
    }

    if let Some(schema) = &schemas.query {
        let pairs = parse_pairs(parts.uri.query().unwrap_or(""));
        let raw = Value::Object(pairs_to_object(&pairs));
        let value = check(schema, &raw, RequestPart::Query, true)?;
        if let Value::Object(map) = &value {
            parts.uri = replace_query(&parts.uri, &object_to_pairs(map))?;
        }
        parts.extensions.insert(ValidatedQuery(value));
    }

    Ok(Request::from_parts(parts, body))
}

fn parse_body(bytes: &[u8]) -> Result<Value, ValidationFailure> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| {
        ValidationFailure::new(
            RequestPart::Body,
            vec![FieldIssue::new(
                "body",
                format!("Malformed JSON: {e}"),
                IssueCode::InvalidJson,
            )],
        )
    })
}

fn check(schema: &Schema, raw: &Value, part: RequestPart, coerce: bool) -> Result<Value, ValidationFailure> {
    schema.validate(raw, coerce).map_err(|issues| {
        let issues = issues
            .into_iter()
            .map(|mut issue| {
                if issue.field.is_empty() {
                    issue.field = part.as_str().to_string();
                }
                issue
            })
            .collect();
        ValidationFailure::new(part, issues)
    })
}

/// Route parameters as a sanitized JSON object of strings
async fn path_params(parts: &mut Parts) -> Value {
    let mut map = Map::new();
    if let Ok(params) = RawPathParams::from_request_parts(parts, &()).await {
        for (key, value) in &params {
            map.insert(key.to_string(), Value::String(value.to_string()));
        }
    }

    let mut value = Value::Object(map);
    let changed = sanitize_value(&mut value, "params");
    if !changed.is_empty() {
        let ip = client_ip(&parts.headers, &parts.extensions);
        log_sanitized(&changed, parts.uri.path(), &ip);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::{get, post},
        Extension, Router,
    };
    use serde_json::json;
    use tower::ServiceExt;

    use crate::errors::PendingError;

    fn schemas() -> Arc<RequestSchemas> {
        Arc::new(
            RequestSchemas::new()
                .body(
                    Schema::object()
                        .field("title", Schema::string().min_len(3))
                        .with_default("published", Schema::boolean(), json!(false)),
                )
                .params(Schema::object().field("id", Schema::integer().min(1.0)))
                .query(Schema::object().optional("preview", Schema::boolean())),
        )
    }

    async fn handler(
        Extension(ValidatedParams(params)): Extension<ValidatedParams>,
        Extension(ValidatedQuery(query)): Extension<ValidatedQuery>,
        request: Request,
    ) -> String {
        let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
            .await
            .unwrap();
        json!({
            "params": params,
            "query": query,
            "body": serde_json::from_slice::<Value>(&bytes).unwrap(),
        })
        .to_string()
    }

    fn app() -> Router {
        Router::new().route(
            "/courses/:id",
            post(handler).route_layer(from_fn_with_state(schemas(), validate_request)),
        )
    }

    fn post_request(uri: &str, body: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn validation_failure(response: &Response) -> &ValidationFailure {
        match response.extensions().get::<PendingError>().map(|p| p.0.as_ref()) {
            Some(AppError::Validation(failure)) => failure,
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_all_parts_replaced_with_coerced_values() {
        let response = app()
            .oneshot(post_request(
                "/courses/7?preview=true&debug=1",
                r#"{"title":"Spanish I","extra":"dropped"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let seen: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(seen["params"], json!({ "id": 7 }));
        assert_eq!(seen["query"], json!({ "preview": true }));
        assert_eq!(seen["body"], json!({ "title": "Spanish I", "published": false }));
    }

    #[tokio::test]
    async fn test_body_failure_reported_before_params() {
        let response = app()
            .oneshot(post_request("/courses/abc", r#"{"title":"x"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let failure = validation_failure(&response);
        assert_eq!(failure.part, RequestPart::Body);
        assert_eq!(failure.issues.len(), 1);
        assert_eq!(failure.issues[0].field, "title");
    }

    #[tokio::test]
    async fn test_params_failure() {
        let response = app()
            .oneshot(post_request("/courses/abc", r#"{"title":"Spanish I"}"#))
            .await
            .unwrap();

        let failure = validation_failure(&response);
        assert_eq!(failure.part, RequestPart::Params);
        assert_eq!(failure.issues[0].field, "id");
        assert_eq!(failure.issues[0].code, IssueCode::InvalidType);
    }

    #[tokio::test]
    async fn test_malformed_and_missing_body() {
        let response = app()
            .oneshot(post_request("/courses/1", "{not json"))
            .await
            .unwrap();
        let failure = validation_failure(&response);
        assert_eq!(failure.issues[0].field, "body");
        assert_eq!(failure.issues[0].code, IssueCode::InvalidJson);

        let response = app().oneshot(post_request("/courses/1", "")).await.unwrap();
        let failure = validation_failure(&response);
        assert_eq!(failure.issues[0].field, "body");
        assert_eq!(failure.issues[0].message, "Expected object, received null");
    }

    #[tokio::test]
    async fn test_body_sanitized_whatever_the_content_type() {
        for content_type in [Some("text/plain"), None] {
            let mut builder = HttpRequest::builder().method("POST").uri("/courses/7");
            if let Some(content_type) = content_type {
                builder = builder.header("content-type", content_type);
            }
            let request = builder
                .body(Body::from(r#"{"title":"Ctl\u0000Chars<b>"}"#))
                .unwrap();

            let response = app().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let seen: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(seen["body"]["title"], "CtlChars&lt;b&gt;");
        }
    }

    #[tokio::test]
    async fn test_oversized_body_without_length_rejected() {
        let app = Router::new().route(
            "/courses/:id",
            post(handler).route_layer(from_fn_with_state(
                Arc::new(RequestSchemas::new().body(Schema::object()).max_body_bytes(32)),
                validate_request,
            )),
        );
        let chunks = vec![Ok::<_, std::io::Error>("a".repeat(64))];
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/courses/7")
            .header("content-type", "text/plain")
            .body(Body::from_stream(futures::stream::iter(chunks)))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        match response.extensions().get::<PendingError>().map(|p| p.0.as_ref()) {
            Some(AppError::Operational(err)) => assert_eq!(err.code.as_str(), "PAYLOAD_TOO_LARGE"),
            other => panic!("expected payload too large, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_route_without_schemas_passes_through() {
        let app = Router::new().route(
            "/ping",
            get(|| async { "pong" }).route_layer(from_fn_with_state(
                Arc::new(RequestSchemas::new()),
                validate_request,
            )),
        );
        let response = app
            .oneshot(HttpRequest::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
