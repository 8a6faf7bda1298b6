//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the image edge service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EdgeConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Remote file-storage backend.
    pub storage: StorageConfig,

    /// Page paths and URL generation.
    pub site: SiteConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// In-process bounded cache (rate-limit counters, directory listings).
    pub cache: CacheConfig,

    /// Shared response cache for image bytes.
    pub edge_cache: EdgeCacheConfig,

    /// Upload validation and fan-out.
    pub upload: UploadConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Timeout for a single storage backend call in seconds.
    pub storage_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 60,
            storage_secs: 30,
        }
    }
}

/// Storage backend credentials and location.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Base URL of the WebDAV collection (no trailing slash after loading).
    pub base_url: String,

    /// Basic auth username.
    pub username: String,

    /// Basic auth password.
    pub password: String,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Page paths and URL generation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Path of the upload page; always begins with exactly one `/` after loading.
    pub upload_page_path: String,

    /// Where `GET /` redirects when the upload page lives elsewhere.
    pub root_redirect: String,

    /// Origin used for generated image URLs. Derived from request headers when unset.
    pub public_origin: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            upload_page_path: "/upload".to_string(),
            root_redirect: "https://www.bing.com".to_string(),
            public_origin: None,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per client within one window.
    pub max_requests: u64,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Trusted header carrying the client IP.
    pub client_ip_header: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 60,
            client_ip_header: "cf-connecting-ip".to_string(),
        }
    }
}

/// Bounded cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries before sweep/eviction kicks in.
    pub capacity: usize,

    /// How long a directory listing stays fresh, in seconds.
    pub listing_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            listing_ttl_secs: 24 * 60 * 60,
        }
    }
}

/// Edge (shared response) cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EdgeCacheConfig {
    /// Enable the edge cache for image fetches.
    pub enabled: bool,

    /// Upper bound on cached body bytes.
    pub max_bytes: u64,

    /// Time-to-live of a cached image response, in seconds.
    pub ttl_secs: u64,
}

impl Default for EdgeCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_bytes: 256 * 1024 * 1024,
            ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

/// Upload validation and fan-out.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum size of a single file in bytes.
    pub max_file_bytes: usize,

    /// Maximum size of a whole upload request body in bytes.
    pub max_request_bytes: usize,

    /// Number of files stored concurrently per batch.
    pub concurrency: usize,

    /// Accepted MIME types.
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            max_request_bytes: 64 * 1024 * 1024,
            concurrency: 5,
            allowed_mime_types: [
                "image/jpeg",
                "image/png",
                "image/gif",
                "image/webp",
                "image/bmp",
                "image/avif",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty for development, JSON for production.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
