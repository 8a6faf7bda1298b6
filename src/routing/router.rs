//! Route classification.
//!
//! # Order (first match wins)
//! 1. OPTIONS → preflight
//! 2. `/` while the upload page lives elsewhere → redirect
//! 3. `POST /upload` → upload
//! 4. `GET /images[/<subpath>]` → listing
//! 5. `/carousel[/<subpath>]` → carousel page
//! 6. static aliases → asset table
//! 7. `GET` of a whitelisted image extension → image fetch
//! 8. anything else → not found

use axum::http::Method;

use crate::assets::is_image_file;
use crate::assets::table::{APP_JS, FAVICON_ICO, INDEX_HTML, ROBOTS_TXT, STYLES_CSS};
use crate::routing::matcher::{AliasMatcher, SectionMatcher};

/// Handling strategy for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Preflight,
    Redirect,
    Upload,
    ListImages { subpath: String },
    Carousel { subpath: String },
    Static { filename: &'static str },
    Image { path: String },
    NotFound,
}

impl Route {
    /// Low-cardinality label for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Route::Preflight => "preflight",
            Route::Redirect => "redirect",
            Route::Upload => "upload",
            Route::ListImages { .. } => "list_images",
            Route::Carousel { .. } => "carousel",
            Route::Static { .. } => "static",
            Route::Image { .. } => "image",
            Route::NotFound => "not_found",
        }
    }
}

/// Immutable classifier compiled from the site configuration.
#[derive(Debug, Clone)]
pub struct Router {
    upload_page_path: String,
    images: SectionMatcher,
    carousel: SectionMatcher,
    statics: AliasMatcher,
}

impl Router {
    /// `upload_page_path` must already be normalized to a single leading `/`.
    pub fn new(upload_page_path: &str) -> Self {
        let statics = AliasMatcher::new()
            .alias("/app.js", APP_JS)
            .alias("/styles.css", STYLES_CSS)
            .alias("/favicon.ico", FAVICON_ICO)
            .alias("/robots.txt", ROBOTS_TXT)
            .alias(upload_page_path, INDEX_HTML)
            .alias(format!("{}.html", upload_page_path), INDEX_HTML)
            .alias("/index.html", INDEX_HTML)
            .alias("/", INDEX_HTML);

        Self {
            upload_page_path: upload_page_path.to_string(),
            images: SectionMatcher::new("images"),
            carousel: SectionMatcher::new("carousel"),
            statics,
        }
    }

    pub fn upload_page_path(&self) -> &str {
        &self.upload_page_path
    }

    pub fn classify(&self, method: &Method, path: &str) -> Route {
        if method == Method::OPTIONS {
            return Route::Preflight;
        }

        if path == "/" && self.upload_page_path != "/" {
            return Route::Redirect;
        }

        if path == "/upload" && method == Method::POST {
            return Route::Upload;
        }

        if method == Method::GET {
            if let Some(subpath) = self.images.capture(path) {
                return Route::ListImages {
                    subpath: subpath.to_string(),
                };
            }
        }

        if let Some(subpath) = self.carousel.capture(path) {
            return Route::Carousel {
                subpath: subpath.to_string(),
            };
        }

        if let Some(filename) = self.statics.lookup(path) {
            return Route::Static { filename };
        }

        let storage_path = path.strip_prefix('/').unwrap_or(path);
        if method == Method::GET && is_image_file(storage_path) {
            return Route::Image {
                path: storage_path.to_string(),
            };
        }

        Route::NotFound
    }
}
