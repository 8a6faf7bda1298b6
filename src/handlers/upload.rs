//! Multi-file upload.
//!
//! # Flow
//! ```text
//! multipart stream
//!     → per file: type check, whitelist check, size check (failures collected)
//!     → accepted files stored in batches of `upload.concurrency`
//!     → ≥1 stored: 200 {success, files, errors?}, root listing invalidated
//!     → 0 stored:  structured error carrying every per-file message
//! ```

use axum::{
    extract::multipart::{Field, Multipart, MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::{Bytes, BytesMut};
use futures_util::future::join_all;
use rand::Rng;
use serde::Serialize;

use crate::assets::mime::{extension_for_mime, extension_of, IMAGE_EXTENSIONS};
use crate::cache::listing_key;
use crate::config::UploadConfig;
use crate::error::{AppError, ErrorContext};
use crate::handlers::set_cache_control;
use crate::http::server::AppState;
use crate::model::UploadedFileDescriptor;
use crate::observability::metrics;

/// Multipart field carrying files.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
struct UploadResponse {
    success: bool,
    files: Vec<UploadedFileDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

/// A file that passed validation and is ready to store.
#[derive(Debug, Clone)]
pub struct AcceptedFile {
    pub original_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

/// Why a single file was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRejection {
    NotAnImage(String),
    UnsupportedType(String),
    TooLarge { size: usize, limit: usize },
    Empty,
}

impl std::fmt::Display for FileRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileRejection::NotAnImage(mime) => write!(f, "not an image ({})", mime),
            FileRejection::UnsupportedType(mime) => write!(f, "unsupported image type {}", mime),
            FileRejection::TooLarge { size, limit } => write!(
                f,
                "{} bytes exceeds the {} MB size limit",
                size,
                limit / 1024 / 1024
            ),
            FileRejection::Empty => write!(f, "file is empty"),
        }
    }
}

/// Type checks that can run before the body is read.
pub fn check_type(mime: &str, config: &UploadConfig) -> Result<(), FileRejection> {
    if !mime.starts_with("image/") {
        return Err(FileRejection::NotAnImage(mime.to_string()));
    }
    if !config.allowed_mime_types.iter().any(|m| m == mime) {
        return Err(FileRejection::UnsupportedType(mime.to_string()));
    }
    Ok(())
}

/// Storage name: millisecond timestamp, six random digits, original extension.
///
/// Collisions are unlikely but not ruled out; nothing checks for an existing file.
pub fn generate_name(original_name: &str, mime: &str, timestamp_ms: i64, token: u32) -> String {
    let ext = extension_of(original_name)
        .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .or_else(|| extension_for_mime(mime).map(str::to_string))
        .unwrap_or_else(|| "bin".to_string());
    format!("{}{:06}.{}", timestamp_ms, token % 1_000_000, ext)
}

fn field_error(e: MultipartError) -> AppError {
    let status = e.status();
    AppError::validation(ErrorContext::Upload, format!("Malformed upload: {}", e.body_text()))
        .with_status(status)
}

/// Read a field up to `limit` bytes; beyond that the rest is drained and dropped.
async fn read_limited(field: &mut Field<'_>, limit: usize) -> Result<(Bytes, usize), AppError> {
    let mut buf = BytesMut::new();
    let mut size = 0usize;
    while let Some(chunk) = field.chunk().await.map_err(field_error)? {
        size += chunk.len();
        if size <= limit {
            buf.extend_from_slice(&chunk);
        } else if !buf.is_empty() {
            buf = BytesMut::new();
        }
    }
    Ok((buf.freeze(), size))
}

/// Drain the multipart stream into accepted files and per-file errors.
pub async fn collect_files(
    multipart: &mut Multipart,
    config: &UploadConfig,
) -> Result<(Vec<AcceptedFile>, Vec<String>), AppError> {
    let mut accepted = Vec::new();
    let mut errors = Vec::new();
    let mut seen = 0usize;

    while let Some(mut field) = multipart.next_field().await.map_err(field_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        seen += 1;

        let original_name = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("file-{}", seen));
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_ascii_lowercase();

        if let Err(rejection) = check_type(&mime_type, config) {
            tracing::debug!(file = %original_name, reason = %rejection, "Upload rejected");
            errors.push(format!("{}: {}", original_name, rejection));
            continue;
        }

        let (data, size) = read_limited(&mut field, config.max_file_bytes).await?;
        let rejection = if size > config.max_file_bytes {
            Some(FileRejection::TooLarge {
                size,
                limit: config.max_file_bytes,
            })
        } else if size == 0 {
            Some(FileRejection::Empty)
        } else {
            None
        };

        match rejection {
            Some(rejection) => {
                tracing::debug!(file = %original_name, reason = %rejection, "Upload rejected");
                errors.push(format!("{}: {}", original_name, rejection));
            }
            None => accepted.push(AcceptedFile {
                original_name,
                mime_type,
                data,
            }),
        }
    }

    if seen == 0 {
        return Err(AppError::validation(
            ErrorContext::Upload,
            format!("No files provided in field '{}'", FILE_FIELD),
        ));
    }

    Ok((accepted, errors))
}

async fn store_one(
    state: &AppState,
    origin: &str,
    file: AcceptedFile,
) -> Result<UploadedFileDescriptor, String> {
    let token: u32 = rand::thread_rng().gen_range(0..1_000_000);
    let generated_name = generate_name(
        &file.original_name,
        &file.mime_type,
        chrono::Utc::now().timestamp_millis(),
        token,
    );
    let size_bytes = file.data.len() as u64;

    match state
        .storage
        .put(&generated_name, file.data, &file.mime_type)
        .await
    {
        Ok(()) => {
            tracing::info!(
                original = %file.original_name,
                stored = %generated_name,
                bytes = size_bytes,
                "File stored"
            );
            Ok(UploadedFileDescriptor {
                url: format!("{}/{}", origin, generated_name),
                original_name: file.original_name,
                generated_name,
                size_bytes,
                mime_type: file.mime_type,
            })
        }
        Err(e) => {
            tracing::error!(original = %file.original_name, error = %e, "File store failed");
            Err(format!("{}: upload failed: {}", file.original_name, e))
        }
    }
}

pub async fn handle_upload(
    state: &AppState,
    origin: &str,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let config = &state.config.upload;
    let (accepted, mut errors) = collect_files(&mut multipart, config).await?;
    let rejected = errors.len();

    let mut files = Vec::with_capacity(accepted.len());
    let mut pending = accepted.into_iter().peekable();
    while pending.peek().is_some() {
        let batch: Vec<_> = pending.by_ref().take(config.concurrency.max(1)).collect();
        let results = join_all(batch.into_iter().map(|file| store_one(state, origin, file))).await;
        for result in results {
            match result {
                Ok(descriptor) => files.push(descriptor),
                Err(message) => errors.push(message),
            }
        }
    }
    let store_failures = errors.len() - rejected;

    metrics::record_upload("stored", files.len());
    metrics::record_upload("rejected", rejected);
    metrics::record_upload("failed", store_failures);

    if files.is_empty() {
        let error = if store_failures > 0 {
            AppError::upstream(ErrorContext::Upload, "No files were uploaded")
        } else {
            AppError::validation(ErrorContext::Upload, "No files were uploaded")
        };
        return Err(error.with_errors(errors));
    }

    if state.cache.delete(&listing_key("")) {
        tracing::debug!("Root listing invalidated after upload");
    }

    let mut response = (
        StatusCode::OK,
        Json(UploadResponse {
            success: true,
            files,
            errors,
        }),
    )
        .into_response();
    set_cache_control(&mut response, "no-store");
    Ok(response)
}
