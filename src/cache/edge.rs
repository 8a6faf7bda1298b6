//! Shared response cache for image bytes.
//!
//! Stands in for the platform edge cache: keyed by full request URL,
//! bounded by total body bytes, entries expire after a TTL. Writes are
//! spawned onto the runtime so cache population never delays a response.

use std::time::Duration;

use bytes::Bytes;
use moka::future::Cache;

use crate::config::EdgeCacheConfig;

/// A fully built image response, replayable verbatim.
#[derive(Debug, Clone)]
pub struct CachedImage {
    pub content_type: &'static str,
    pub cache_control: &'static str,
    pub etag: String,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct EdgeCache {
    inner: Option<Cache<String, CachedImage>>,
}

impl EdgeCache {
    pub fn new(config: &EdgeCacheConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let inner = Cache::builder()
            .max_capacity(config.max_bytes)
            .weigher(|_key: &String, value: &CachedImage| {
                u32::try_from(value.body.len()).unwrap_or(u32::MAX)
            })
            .time_to_live(Duration::from_secs(config.ttl_secs))
            .build();

        Self { inner: Some(inner) }
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub async fn lookup(&self, key: &str) -> Option<CachedImage> {
        match &self.inner {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    pub async fn store(&self, key: String, value: CachedImage) {
        if let Some(cache) = &self.inner {
            cache.insert(key, value).await;
        }
    }

    /// Populate the cache in the background. The caller never waits on it.
    pub fn store_detached(&self, key: String, value: CachedImage) {
        let Some(cache) = self.inner.clone() else {
            return;
        };
        tokio::spawn(async move {
            tracing::trace!(key = %key, bytes = value.body.len(), "Edge cache populate");
            cache.insert(key, value).await;
        });
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.as_ref().map(|c| c.entry_count()).unwrap_or(0)
    }
}
