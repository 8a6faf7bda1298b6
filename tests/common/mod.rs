//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, HeaderMap, Method, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use bytes::Bytes;
use tokio::net::TcpListener;

use image_edge::config::EdgeConfig;
use image_edge::http::{app, AppState};
use image_edge::storage::{encode_path, StorageClient, StorageEntry, StorageError, StorageResult};

pub const BOUNDARY: &str = "----edge-test-boundary";

/// In-memory storage backend that counts calls and can be told to fail.
#[derive(Default)]
pub struct MockStorage {
    files: Mutex<BTreeMap<String, Bytes>>,
    dirs: Mutex<BTreeSet<String>>,
    fail_marker: Mutex<Option<Vec<u8>>>,
    fail_all: AtomicBool,
    put_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    pub puts: AtomicUsize,
    pub gets: AtomicUsize,
    pub lists: AtomicUsize,
}

impl MockStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, path: &str, data: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), Bytes::copy_from_slice(data));
    }

    pub fn add_dir(&self, path: &str) {
        self.dirs.lock().unwrap().insert(path.to_string());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    /// Fail every PUT whose body equals `marker`.
    pub fn fail_puts_with(&self, marker: &[u8]) {
        *self.fail_marker.lock().unwrap() = Some(marker.to_vec());
    }

    /// Hold every PUT open for `delay` so overlapping stores are observable.
    pub fn delay_puts(&self, delay: Duration) {
        *self.put_delay.lock().unwrap() = Some(delay);
    }

    /// Make every operation fail as if the backend were unreachable.
    pub fn set_unreachable(&self, down: bool) {
        self.fail_all.store(down, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> StorageResult<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            Err(StorageError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

#[async_trait]
impl StorageClient for MockStorage {
    async fn put(&self, name: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.put_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.check_reachable()?;
        if self.fail_marker.lock().unwrap().as_deref() == Some(&data[..]) {
            return Err(StorageError::Status {
                op: "PUT",
                path: name.to_string(),
                status: 507,
            });
        }
        self.files.lock().unwrap().insert(name.to_string(), data);
        Ok(())
    }

    async fn get(&self, name: &str) -> StorageResult<Bytes> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        self.files
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::Status {
                op: "GET",
                path: name.to_string(),
                status: 404,
            })
    }

    async fn list(&self, dir: &str) -> StorageResult<Vec<StorageEntry>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        let prefix = if dir.is_empty() {
            "/dav/".to_string()
        } else {
            format!("/dav/{}/", encode_path(dir))
        };
        let mut entries = vec![StorageEntry::from_href(prefix.clone())];
        for path in self.files.lock().unwrap().keys() {
            if parent_of(path) == dir {
                entries.push(StorageEntry::from_href(format!("/dav/{}", encode_path(path))));
            }
        }
        for path in self.dirs.lock().unwrap().iter() {
            if parent_of(path) == dir {
                entries.push(StorageEntry::from_href(format!("/dav/{}/", encode_path(path))));
            }
        }
        Ok(entries)
    }
}

/// Defaults tuned for tests: tiny rate-limit window disabled unless asked for.
pub fn test_config() -> EdgeConfig {
    let mut config = EdgeConfig::default();
    config.storage.base_url = "http://storage.invalid/dav".to_string();
    config.rate_limit.enabled = false;
    config
}

pub fn test_app(config: EdgeConfig, storage: Arc<MockStorage>) -> (Router, AppState) {
    let state = AppState::new(config, storage);
    (app(state.clone()), state)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::HOST, "img.example.com")
        .body(Body::empty())
        .unwrap()
}

/// One `file` part: (filename, content type, bytes).
pub type FilePart<'a> = (&'a str, &'a str, &'a [u8]);

pub fn multipart_body(parts: &[FilePart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (filename, content_type, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload(parts: &[FilePart<'_>]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(header::HOST, "img.example.com")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub async fn body_bytes(response: Response) -> Bytes {
    to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn header_str<'a>(response: &'a Response, name: header::HeaderName) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Requests observed by the mock WebDAV server.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub depth: Option<String>,
    pub authorized: bool,
}

#[derive(Clone, Default)]
struct DavState {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    expected_auth: String,
}

/// Handle onto a running mock WebDAV server.
pub struct MockDav {
    pub addr: SocketAddr,
    state: DavState,
}

impl MockDav {
    pub fn base_url(&self) -> String {
        format!("http://{}/dav", self.addr)
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.state.seen.lock().unwrap().clone()
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.files.lock().unwrap().get(path).cloned()
    }

    pub fn put_file(&self, path: &str, data: &[u8]) {
        self.state
            .files
            .lock()
            .unwrap()
            .insert(path.to_string(), data.to_vec());
    }
}

/// Start a WebDAV server on an ephemeral port accepting `user`/`pass`
/// (`Basic dXNlcjpwYXNz`).
pub async fn start_mock_dav() -> MockDav {
    let state = DavState {
        expected_auth: "Basic dXNlcjpwYXNz".to_string(),
        ..DavState::default()
    };
    let router = Router::new()
        .route("/{*path}", any(dav_handler))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    MockDav { addr, state }
}

async fn dav_handler(
    State(state): State<DavState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(state.expected_auth.as_str());
    let path = uri.path().to_string();
    state.seen.lock().unwrap().push(SeenRequest {
        method: method.to_string(),
        path: path.clone(),
        depth: headers
            .get("depth")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        authorized,
    });

    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match method.as_str() {
        "PUT" => {
            state.files.lock().unwrap().insert(path, body.to_vec());
            StatusCode::CREATED.into_response()
        }
        "GET" => match state.files.lock().unwrap().get(&path) {
            Some(data) => (StatusCode::OK, data.clone()).into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        },
        "PROPFIND" => {
            let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8"?><d:multistatus xmlns:d="DAV:">"#);
            xml.push_str(&format!("<d:response><d:href>{}</d:href></d:response>", path));
            let mut children: Vec<String> = state
                .files
                .lock()
                .unwrap()
                .keys()
                .filter(|key| key.starts_with(&path) && !key[path.len()..].contains('/'))
                .cloned()
                .collect();
            children.sort();
            for child in children {
                xml.push_str(&format!("<d:response><d:href>{}</d:href></d:response>", child));
            }
            xml.push_str("</d:multistatus>");
            (StatusCode::MULTI_STATUS, xml).into_response()
        }
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}
