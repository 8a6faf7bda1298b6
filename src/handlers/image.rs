//! Single image fetch through the edge cache.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};

use crate::assets::content_type;
use crate::cache::CachedImage;
use crate::error::{AppError, ErrorContext};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::storage::normalize_relative_path;

pub const IMAGE_CACHE_CONTROL: &str =
    "public, max-age=31536000, immutable, stale-while-revalidate=86400";

/// Strong ETag derived from the storage path and the fetch time.
pub fn make_etag(path: &str, fetched_at_ms: u128) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update(b":");
    hasher.update(fetched_at_ms.to_string().as_bytes());
    let digest = hasher.finalize();
    format!("\"{}\"", hex::encode(&digest[..12]))
}

/// Whether an `If-None-Match` header matches `etag` (lists and `*` included).
pub fn etag_matches(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|value| {
        value
            .split(',')
            .map(str::trim)
            .any(|candidate| candidate == etag || candidate == "*" || candidate.strip_prefix("W/") == Some(etag))
    })
}

fn build_response(image: &CachedImage, not_modified: bool) -> Response {
    let mut response = if not_modified {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        Response::new(Body::from(image.body.clone()))
    };

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(image.content_type),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(image.cache_control),
    );
    if let Ok(etag) = HeaderValue::from_str(&image.etag) {
        headers.insert(header::ETAG, etag);
    }
    headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
    response
}

/// Serve `raw_path` from the edge cache, falling back to storage.
///
/// `cache_key` is the full request URL. A fresh fetch is written back to the
/// edge cache in the background.
pub async fn handle_get_image(
    state: &AppState,
    raw_path: &str,
    cache_key: String,
    if_none_match: Option<&str>,
) -> Result<Response, AppError> {
    let path = normalize_relative_path(raw_path)
        .map_err(|e| AppError::validation(ErrorContext::GetImage, e.to_string()))?;

    if let Some(cached) = state.edge_cache.lookup(&cache_key).await {
        metrics::record_cache_lookup("edge", true);
        tracing::debug!(path = %path, "Edge cache hit");
        return Ok(build_response(&cached, etag_matches(if_none_match, &cached.etag)));
    }
    metrics::record_cache_lookup("edge", false);

    let body = state.storage.get(&path).await.map_err(|e| {
        if e.is_not_found() {
            AppError::not_found(ErrorContext::GetImage)
        } else {
            AppError::upstream(ErrorContext::GetImage, format!("Failed to fetch image: {}", e))
        }
    })?;

    let fetched_at_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let image = CachedImage {
        content_type: content_type(&path),
        cache_control: IMAGE_CACHE_CONTROL,
        etag: make_etag(&path, fetched_at_ms),
        body,
    };

    let response = build_response(&image, false);
    state.edge_cache.store_detached(cache_key, image);
    Ok(response)
}
