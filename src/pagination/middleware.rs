use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::resolver::{resolve, PaginationDescriptor, PaginationPolicy};
use super::responder::{apply_headers, PaginationMeta};
use crate::errors::AppError;
use crate::query::parse_pairs;

/// Middleware resolving the pagination descriptor for a listing route
///
/// The descriptor is stored in request extensions. When the handler answers
/// with [`super::Paginated`], the navigation headers are added on the way out,
/// computed against the URL the client sent.
pub async fn resolve_pagination(
    State(policy): State<Arc<PaginationPolicy>>,
    mut request: Request,
    next: Next,
) -> Response {
    let pairs = parse_pairs(request.uri().query().unwrap_or(""));
    let descriptor = match resolve(&pairs, &policy) {
        Ok(descriptor) => descriptor,
        Err(err) => return AppError::from(err).into_response(),
    };

    tracing::debug!(
        page = descriptor.page,
        limit = descriptor.limit,
        sort_by = %descriptor.sort_by,
        "Pagination resolved"
    );

    let uri = request.uri().clone();
    request.extensions_mut().insert(descriptor);

    let mut response = next.run(request).await;
    if let Some(meta) = response.extensions_mut().remove::<PaginationMeta>() {
        apply_headers(response.headers_mut(), &meta, &uri);
    }
    response
}

/// Extractor for the descriptor resolved by [`resolve_pagination`]
#[derive(Debug, Clone)]
pub struct Pagination(pub PaginationDescriptor);

#[async_trait]
impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<PaginationDescriptor>()
            .cloned()
            .map(Pagination)
            .ok_or_else(|| {
                AppError::Unclassified(anyhow::anyhow!(
                    "no pagination descriptor on request; route is not paginated"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PendingError;
    use crate::pagination::Paginated;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn list(Pagination(descriptor): Pagination) -> Paginated<u64> {
        let total = 95u64;
        let items = (descriptor.skip()..total)
            .take(descriptor.take() as usize)
            .collect();
        Paginated::new(items, &descriptor, total)
    }

    fn app() -> Router {
        let policy = Arc::new(PaginationPolicy::default().filter_keys(&["level"]));
        Router::new().route(
            "/items",
            get(list).route_layer(from_fn_with_state(policy, resolve_pagination)),
        )
    }

    async fn call(uri: &str) -> Response {
        app()
            .oneshot(HttpRequest::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_headers_added_to_paginated_response() {
        let response = call("/items?level=A1&offset=40&limit=10").await;
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers["x-current-page"], "5");
        assert_eq!(headers["x-total-pages"], "10");
        assert_eq!(headers["x-next-offset"], "50");
        assert!(headers["link"]
            .to_str()
            .unwrap()
            .starts_with("</items?level=A1&offset=50&limit=10>; rel=\"next\""));
        assert!(response.extensions().get::<PaginationMeta>().is_none());
    }

    #[tokio::test]
    async fn test_malformed_page_rejected() {
        let response = call("/items?page=abc").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.extensions().get::<PendingError>().is_some());
    }

    #[tokio::test]
    async fn test_extractor_without_middleware() {
        let app = Router::new().route("/bare", get(list));
        let response = app
            .oneshot(HttpRequest::builder().uri("/bare").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
