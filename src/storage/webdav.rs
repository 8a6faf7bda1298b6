//! WebDAV implementation of [`StorageClient`].
//!
//! # Requests
//! - `PUT  <base>/<path>` with basic auth and the file's content type
//! - `GET  <base>/<path>`
//! - `PROPFIND <base>/<dir>/` with `Depth: 1`, multistatus parsed for hrefs

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};

use crate::config::StorageConfig;
use crate::observability::metrics;
use crate::storage::client::{StorageClient, StorageEntry, StorageError, StorageResult};
use crate::storage::path::encode_path;

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:"><d:prop><d:resourcetype/></d:prop></d:propfind>"#;

/// Authenticated WebDAV client against a fixed base URL.
#[derive(Clone)]
pub struct WebDavClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl std::fmt::Debug for WebDavClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDavClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl WebDavClient {
    pub fn new(config: &StorageConfig, timeout: Duration) -> StorageResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn file_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, encode_path(path))
    }

    fn collection_url(&self, dir: &str) -> String {
        if dir.is_empty() {
            format!("{}/", self.base_url)
        } else {
            format!("{}/{}/", self.base_url, encode_path(dir))
        }
    }

    fn request(&self, method: Method, url: String) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    async fn send(
        &self,
        op: &'static str,
        path: &str,
        builder: reqwest::RequestBuilder,
    ) -> StorageResult<reqwest::Response> {
        let start = Instant::now();
        let result = builder.send().await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(op, path, error = %e, "Storage request failed");
                metrics::record_storage_request(op, "error");
                return Err(e.into());
            }
        };

        let status = response.status();
        tracing::debug!(
            op,
            path,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Storage response"
        );

        if status.is_success() || status == StatusCode::MULTI_STATUS {
            metrics::record_storage_request(op, "ok");
            Ok(response)
        } else {
            metrics::record_storage_request(op, "status");
            Err(StorageError::Status {
                op,
                path: path.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl StorageClient for WebDavClient {
    async fn put(&self, name: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        let builder = self
            .request(Method::PUT, self.file_url(name))
            .header(CONTENT_TYPE, content_type)
            .body(data);
        self.send("PUT", name, builder).await?;
        Ok(())
    }

    async fn get(&self, name: &str) -> StorageResult<Bytes> {
        let builder = self.request(Method::GET, self.file_url(name));
        let response = self.send("GET", name, builder).await?;
        Ok(response.bytes().await?)
    }

    async fn list(&self, dir: &str) -> StorageResult<Vec<StorageEntry>> {
        let method = Method::from_bytes(b"PROPFIND")
            .map_err(|e| StorageError::Config(e.to_string()))?;
        let builder = self
            .request(method, self.collection_url(dir))
            .header("Depth", "1")
            .header(CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(PROPFIND_BODY);
        let response = self.send("PROPFIND", dir, builder).await?;
        let body = response.text().await?;
        parse_multistatus(&body)
    }
}

fn href_pattern() -> &'static Regex {
    static HREF: OnceLock<Regex> = OnceLock::new();
    HREF.get_or_init(|| {
        Regex::new(r"(?is)<(?:[a-z0-9_.-]+:)?href(?:\s[^>]*)?>\s*(.*?)\s*</(?:[a-z0-9_.-]+:)?href\s*>")
            .unwrap_or_else(|e| panic!("href pattern must compile: {}", e))
    })
}

/// Extract every `href` of a multistatus document, in document order.
pub fn parse_multistatus(body: &str) -> StorageResult<Vec<StorageEntry>> {
    if !body.contains("multistatus") {
        return Err(StorageError::InvalidResponse(
            "PROPFIND response is not a multistatus document".to_string(),
        ));
    }

    Ok(href_pattern()
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape_xml(m.as_str()))
        .filter(|href| !href.is_empty())
        .map(StorageEntry::from_href)
        .collect())
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
