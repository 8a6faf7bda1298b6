//! Storage capability trait.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage request failed: {0}")]
    Transport(String),

    #[error("Storage returned {status} for {op} {path}")]
    Status {
        op: &'static str,
        path: String,
        status: u16,
    },

    #[error("Invalid storage response: {0}")]
    InvalidResponse(String),

    #[error("Invalid storage configuration: {0}")]
    Config(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Status { status: 404, .. })
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        StorageError::Transport(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One entry of a directory listing as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    /// Raw href from the backend.
    pub href: String,
    /// Decoded last path segment.
    pub name: String,
    /// Whether the href denotes a collection (trailing slash).
    pub is_dir: bool,
}

impl StorageEntry {
    pub fn from_href(href: impl Into<String>) -> Self {
        let href = href.into();
        let is_dir = href.ends_with('/');
        let name = href
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .map(|segment| {
                percent_encoding::percent_decode_str(segment)
                    .decode_utf8_lossy()
                    .into_owned()
            })
            .unwrap_or_default();
        Self { href, name, is_dir }
    }
}

/// Capability over the remote file store.
///
/// Paths are storage-relative, `/`-separated and already normalized
/// (see [`crate::storage::normalize_relative_path`]).
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Store `data` under `name`, replacing any existing file.
    async fn put(&self, name: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Fetch the bytes stored under `name`.
    async fn get(&self, name: &str) -> StorageResult<Bytes>;

    /// Entries directly under `dir` (empty string for the root).
    async fn list(&self, dir: &str) -> StorageResult<Vec<StorageEntry>>;
}
