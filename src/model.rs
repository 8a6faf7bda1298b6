//! Data shared between handlers, caches and the wire.

use serde::{Deserialize, Serialize};

/// One successfully stored upload, as reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFileDescriptor {
    pub original_name: String,
    pub generated_name: String,
    pub url: String,
    pub size_bytes: u64,
    pub mime_type: String,
}

/// Requests seen from one client in the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitCounter {
    pub count: u64,
}

/// An image visible under a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub url: String,
    pub name: String,
}

/// A listed image before it is bound to the serving origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedImage {
    pub name: String,
    /// Percent-encoded path relative to the origin, no leading slash.
    pub path: String,
}

impl ListedImage {
    pub fn to_entry(&self, origin: &str) -> ImageEntry {
        ImageEntry {
            url: format!("{}/{}", origin, self.path),
            name: self.name.clone(),
        }
    }
}

/// Parsed and filtered directory listing, in backend order.
///
/// Origin-independent, so one cached listing serves every host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub files: Vec<ListedImage>,
}
