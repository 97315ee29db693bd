use axum::{
    http::{HeaderMap, HeaderName, HeaderValue, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::resolver::PaginationDescriptor;
use crate::query::{encode_pairs, parse_pairs};

/// Navigation metadata for one page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
    pub offset: u64,
}

impl PaginationMeta {
    pub fn new(descriptor: &PaginationDescriptor, total: u64) -> Self {
        let limit = descriptor.limit.max(1);
        let page = descriptor.page.max(1);
        let total_pages = total.div_ceil(limit);

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
            offset: (page - 1).saturating_mul(limit),
        }
    }

    pub fn next_offset(&self) -> Option<u64> {
        self.has_next.then(|| self.offset.saturating_add(self.limit))
    }

    pub fn prev_offset(&self) -> Option<u64> {
        self.has_prev.then(|| self.offset.saturating_sub(self.limit))
    }

    fn last_offset(&self) -> u64 {
        self.total_pages.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// Write the `X-*` navigation headers and the `Link` header
///
/// Link targets are built from `uri` with `page` removed and `offset`/`limit`
/// overridden; every other query parameter is carried over.
pub fn apply_headers(headers: &mut HeaderMap, meta: &PaginationMeta, uri: &Uri) {
    let blank = |v: Option<u64>| v.map(|n| n.to_string()).unwrap_or_default();

    let values = [
        ("x-total-count", meta.total.to_string()),
        ("x-total-pages", meta.total_pages.to_string()),
        ("x-current-page", meta.page.to_string()),
        ("x-has-next", meta.has_next.to_string()),
        ("x-has-prev", meta.has_prev.to_string()),
        ("x-limit", meta.limit.to_string()),
        ("x-offset", meta.offset.to_string()),
        ("x-next-offset", blank(meta.next_offset())),
        ("x-prev-offset", blank(meta.prev_offset())),
    ];
    for (name, value) in values {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }

    if let Ok(link) = HeaderValue::from_str(&link_header(meta, uri)) {
        headers.insert(axum::http::header::LINK, link);
    }
}

/// RFC 5988 `Link` value with `next`, `prev`, `first` and `last` relations
pub fn link_header(meta: &PaginationMeta, uri: &Uri) -> String {
    let mut links = Vec::with_capacity(4);
    if let Some(offset) = meta.next_offset() {
        links.push(format!("<{}>; rel=\"next\"", page_url(uri, offset, meta.limit)));
    }
    if let Some(offset) = meta.prev_offset() {
        links.push(format!("<{}>; rel=\"prev\"", page_url(uri, offset, meta.limit)));
    }
    links.push(format!("<{}>; rel=\"first\"", page_url(uri, 0, meta.limit)));
    links.push(format!(
        "<{}>; rel=\"last\"",
        page_url(uri, meta.last_offset(), meta.limit)
    ));
    links.join(", ")
}

fn page_url(uri: &Uri, offset: u64, limit: u64) -> String {
    let mut pairs: Vec<(String, String)> = parse_pairs(uri.query().unwrap_or(""))
        .into_iter()
        .filter(|(k, _)| !matches!(k.as_str(), "page" | "offset" | "limit"))
        .collect();
    pairs.push(("offset".to_string(), offset.to_string()));
    pairs.push(("limit".to_string(), limit.to_string()));

    format!("{}?{}", uri.path(), encode_pairs(&pairs))
}

/// Paginated success body: `{ success, data, pagination }`
///
/// Converting into a response also records the metadata so the pagination
/// middleware can attach navigation headers.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, descriptor: &PaginationDescriptor, total: u64) -> Self {
        Self {
            success: true,
            data,
            pagination: PaginationMeta::new(descriptor, total),
        }
    }
}

impl<T: Serialize> IntoResponse for Paginated<T> {
    fn into_response(self) -> Response {
        let meta = self.pagination;
        let mut response = Json(self).into_response();
        response.extensions_mut().insert(meta);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::resolver::{resolve, PaginationPolicy};

    fn descriptor(query: &str) -> PaginationDescriptor {
        resolve(&parse_pairs(query), &PaginationPolicy::default()).unwrap()
    }

    fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
        headers.get(name).unwrap().to_str().unwrap()
    }

    #[test]
    fn test_empty_result() {
        let meta = PaginationMeta::new(&descriptor(""), 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }

    #[test]
    fn test_first_and_last_page_flags() {
        let first = PaginationMeta::new(&descriptor("page=1&limit=10"), 50);
        assert_eq!(first.total_pages, 5);
        assert!(!first.has_prev);
        assert!(first.has_next);

        let last = PaginationMeta::new(&descriptor("page=5&limit=10"), 50);
        assert!(!last.has_next);
        assert!(last.has_prev);
        assert_eq!(last.offset, 40);
    }

    #[test]
    fn test_offsets_at_the_addressable_edge() {
        let meta = PaginationMeta::new(&descriptor("offset=9223372036854775807&limit=100"), u64::MAX);
        assert!(meta.has_next);
        assert_eq!(meta.next_offset(), Some(meta.offset + 100));
        assert_eq!(meta.prev_offset(), Some(meta.offset - 100));
        assert!(meta.last_offset() >= meta.offset);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let meta = PaginationMeta::new(&descriptor("limit=20"), 41);
        assert_eq!(meta.total_pages, 3);
    }

    #[test]
    fn test_headers() {
        let meta = PaginationMeta::new(&descriptor("page=2&limit=10"), 45);
        let uri: Uri = "/api/courses?page=2&limit=10".parse().unwrap();
        let mut headers = HeaderMap::new();
        apply_headers(&mut headers, &meta, &uri);

        assert_eq!(header(&headers, "x-total-count"), "45");
        assert_eq!(header(&headers, "x-total-pages"), "5");
        assert_eq!(header(&headers, "x-current-page"), "2");
        assert_eq!(header(&headers, "x-has-next"), "true");
        assert_eq!(header(&headers, "x-has-prev"), "true");
        assert_eq!(header(&headers, "x-limit"), "10");
        assert_eq!(header(&headers, "x-offset"), "10");
        assert_eq!(header(&headers, "x-next-offset"), "20");
        assert_eq!(header(&headers, "x-prev-offset"), "0");
    }

    #[test]
    fn test_blank_offsets_on_single_page() {
        let meta = PaginationMeta::new(&descriptor(""), 3);
        let mut headers = HeaderMap::new();
        apply_headers(&mut headers, &meta, &"/api/courses".parse().unwrap());

        assert_eq!(header(&headers, "x-next-offset"), "");
        assert_eq!(header(&headers, "x-prev-offset"), "");
    }

    #[test]
    fn test_link_preserves_other_parameters() {
        let meta = PaginationMeta::new(&descriptor("page=2&limit=10"), 45);
        let uri: Uri = "/api/courses?language=es&page=2&limit=10&sortBy=title"
            .parse()
            .unwrap();

        assert_eq!(
            link_header(&meta, &uri),
            "</api/courses?language=es&sortBy=title&offset=20&limit=10>; rel=\"next\", \
             </api/courses?language=es&sortBy=title&offset=0&limit=10>; rel=\"prev\", \
             </api/courses?language=es&sortBy=title&offset=0&limit=10>; rel=\"first\", \
             </api/courses?language=es&sortBy=title&offset=40&limit=10>; rel=\"last\""
        );
    }

    #[test]
    fn test_link_omits_next_and_prev_when_not_applicable() {
        let meta = PaginationMeta::new(&descriptor(""), 0);
        let link = link_header(&meta, &"/api/courses".parse().unwrap());
        assert_eq!(
            link,
            "</api/courses?offset=0&limit=20>; rel=\"first\", \
             </api/courses?offset=0&limit=20>; rel=\"last\""
        );
    }

    #[tokio::test]
    async fn test_paginated_body_and_extension() {
        let response = Paginated::new(vec!["a", "b"], &descriptor("limit=2"), 3).into_response();
        assert_eq!(
            response.extensions().get::<PaginationMeta>().map(|m| m.total_pages),
            Some(2)
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], serde_json::json!(["a", "b"]));
        assert_eq!(body["pagination"]["totalPages"], 2);
        assert_eq!(body["pagination"]["hasNext"], true);
    }
}
