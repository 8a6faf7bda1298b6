//! Request-derived values shared by the handlers.
//!
//! # Responsibilities
//! - Resolve the public origin used when generating image URLs
//! - Build the full request URL that keys the edge cache
//!
//! # Design Decisions
//! - A configured `public_origin` always wins over request headers
//! - `X-Forwarded-Proto` is honored; plain `http` otherwise

use axum::http::{header, HeaderMap, Uri};

pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Scheme and authority the client used, e.g. `https://img.example.com`.
pub fn request_origin(headers: &HeaderMap, uri: &Uri, public_origin: Option<&str>) -> String {
    if let Some(origin) = public_origin {
        return origin.trim_end_matches('/').to_string();
    }

    let scheme = headers
        .get(X_FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| uri.scheme_str())
        .unwrap_or("http");

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or("localhost");

    format!("{}://{}", scheme, host)
}

/// Origin plus path and query; the edge cache key for a request.
pub fn request_url(origin: &str, uri: &Uri) -> String {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("{}{}", origin, path_and_query)
}
