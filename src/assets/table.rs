//! Immutable filename → content mapping, embedded at compile time.

use std::collections::HashMap;

use bytes::Bytes;

use crate::assets::mime::content_type;

pub const INDEX_HTML: &str = "index.html";
pub const APP_JS: &str = "app.js";
pub const STYLES_CSS: &str = "styles.css";
pub const FAVICON_ICO: &str = "favicon.ico";
pub const ROBOTS_TXT: &str = "robots.txt";
pub const CAROUSEL_HTML: &str = "carousel.html";

/// A single embedded file.
#[derive(Debug, Clone)]
pub struct StaticAsset {
    pub body: Bytes,
    pub content_type: &'static str,
}

/// Lookup table for the pages and scripts the edge serves itself.
#[derive(Debug, Clone)]
pub struct StaticAssetTable {
    assets: HashMap<&'static str, StaticAsset>,
}

impl StaticAssetTable {
    /// Table with the built-in upload page, carousel page and friends.
    pub fn embedded() -> Self {
        Self::from_entries([
            (INDEX_HTML, Bytes::from_static(include_bytes!("../../static/index.html"))),
            (APP_JS, Bytes::from_static(include_bytes!("../../static/app.js"))),
            (STYLES_CSS, Bytes::from_static(include_bytes!("../../static/styles.css"))),
            (FAVICON_ICO, Bytes::from_static(include_bytes!("../../static/favicon.ico"))),
            (ROBOTS_TXT, Bytes::from_static(include_bytes!("../../static/robots.txt"))),
            (CAROUSEL_HTML, Bytes::from_static(include_bytes!("../../static/carousel.html"))),
        ])
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Bytes)>,
    {
        let assets = entries
            .into_iter()
            .map(|(name, body)| {
                (
                    name,
                    StaticAsset {
                        body,
                        content_type: content_type(name),
                    },
                )
            })
            .collect();
        Self { assets }
    }

    pub fn get(&self, name: &str) -> Option<&StaticAsset> {
        self.assets.get(name)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl Default for StaticAssetTable {
    fn default() -> Self {
        Self::embedded()
    }
}
