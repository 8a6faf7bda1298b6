//! Caching subsystem.
//!
//! # Caches
//! ```text
//! bounded.rs  in-process, size-bounded TTL map
//!             → rate-limit counters ("rate_limit:<client>")
//!             → directory listings ("image_list:<subdir|root>")
//!
//! edge.rs     shared response cache for image bytes, keyed by request URL
//!             → populated in the background after an upstream fetch
//! ```
//!
//! # Design Decisions
//! - Both caches are constructed once and injected through `AppState`
//! - Bounded cache expiry is lazy (on read) plus explicit sweeps; no timers
//! - Edge cache eviction is delegated to moka (byte-weighted, TTL)

pub mod bounded;
pub mod edge;

use std::sync::Arc;

use crate::model::{DirectoryListing, RateLimitCounter};

pub use bounded::{BoundedCache, CacheEntry};
pub use edge::{CachedImage, EdgeCache};

/// Values stored in the bounded cache.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Counter(RateLimitCounter),
    Listing(Arc<DirectoryListing>),
}

/// The bounded cache as wired into the service.
pub type SharedCache = Arc<BoundedCache<CachedValue>>;

pub fn rate_limit_key(client_id: &str) -> String {
    format!("rate_limit:{}", client_id)
}

pub fn listing_key(subdir: &str) -> String {
    if subdir.is_empty() {
        "image_list:root".to_string()
    } else {
        format!("image_list:{}", subdir)
    }
}
