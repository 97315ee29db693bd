use axum::{
    extract::ConnectInfo,
    http::{Extensions, HeaderMap},
};
use std::net::SocketAddr;

/// Best-effort client address for logging and rate limiting
///
/// The socket peer wins when the server was started with connect info;
/// otherwise the first `X-Forwarded-For` hop, then `X-Real-IP`.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    if let Some(ConnectInfo(addr)) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

pub fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_connect_info_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 5000))));

        assert_eq!(client_ip(&headers, &extensions), "10.0.0.1");
    }

    #[test]
    fn test_forwarded_for_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.2"),
        );
        assert_eq!(client_ip(&headers, &Extensions::new()), "203.0.113.9");
    }

    #[test]
    fn test_unknown_without_hints() {
        assert_eq!(client_ip(&HeaderMap::new(), &Extensions::new()), "unknown");
        assert_eq!(user_agent(&HeaderMap::new()), "unknown");
    }
}
