//! Directory listing of images, cached in the bounded cache.
//!
//! The cached listing holds names and relative paths only; absolute URLs are
//! built per request from the caller's origin.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::assets::is_image_file;
use crate::cache::{listing_key, CachedValue};
use crate::error::{AppError, ErrorContext};
use crate::handlers::set_cache_control;
use crate::http::server::AppState;
use crate::model::{DirectoryListing, ImageEntry, ListedImage};
use crate::observability::metrics;
use crate::storage::{encode_path, normalize_relative_path, StorageEntry};

#[derive(Serialize)]
struct ListingResponse {
    success: bool,
    files: Vec<ImageEntry>,
}

/// Keep image files only, with paths relative to the storage root.
pub fn build_listing(subdir: &str, entries: Vec<StorageEntry>) -> DirectoryListing {
    let files = entries
        .into_iter()
        .filter(|entry| !entry.is_dir && is_image_file(&entry.name))
        .map(|entry| {
            let relative = if subdir.is_empty() {
                entry.name.clone()
            } else {
                format!("{}/{}", subdir, entry.name)
            };
            ListedImage {
                path: encode_path(&relative),
                name: entry.name,
            }
        })
        .collect();
    DirectoryListing { files }
}

/// Bind a listing to `origin`.
pub fn render_listing(origin: &str, listing: &DirectoryListing) -> Vec<ImageEntry> {
    listing.files.iter().map(|file| file.to_entry(origin)).collect()
}

async fn load_listing(state: &AppState, subdir: &str) -> Result<Arc<DirectoryListing>, AppError> {
    let key = listing_key(subdir);

    if let Some(CachedValue::Listing(listing)) = state.cache.get(&key) {
        metrics::record_cache_lookup("listing", true);
        return Ok(listing);
    }
    metrics::record_cache_lookup("listing", false);

    let entries = state.storage.list(subdir).await.map_err(|e| {
        AppError::upstream(ErrorContext::GetImages, format!("Failed to list images: {}", e))
    })?;
    let listing = Arc::new(build_listing(subdir, entries));

    tracing::debug!(subdir = %subdir, files = listing.files.len(), "Listing cached");
    state.cache.set(
        key,
        CachedValue::Listing(listing.clone()),
        Duration::from_secs(state.config.cache.listing_ttl_secs),
    );
    Ok(listing)
}

pub async fn handle_list_images(
    state: &AppState,
    origin: &str,
    raw_subpath: &str,
) -> Result<Response, AppError> {
    let subdir = normalize_relative_path(raw_subpath)
        .map_err(|e| AppError::validation(ErrorContext::GetImages, e.to_string()))?;

    let listing = load_listing(state, &subdir).await?;

    let mut response = (
        StatusCode::OK,
        Json(ListingResponse {
            success: true,
            files: render_listing(origin, &listing),
        }),
    )
        .into_response();
    set_cache_control(&mut response, "no-cache");
    Ok(response)
}
