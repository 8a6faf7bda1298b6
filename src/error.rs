//! Request-level error taxonomy and the uniform JSON error formatter.
//!
//! Every non-success response leaves through [`AppError::into_response`]:
//! `{success:false, message, code, context, timestamp}` with
//! `Cache-Control: no-store`.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::model::UploadedFileDescriptor;

/// Subsystem an error originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorContext {
    #[serde(rename = "upload")]
    Upload,
    #[serde(rename = "getImage")]
    GetImage,
    #[serde(rename = "getImages")]
    GetImages,
    #[serde(rename = "route")]
    Route,
    #[serde(rename = "main")]
    Main,
}

impl ErrorContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorContext::Upload => "upload",
            ErrorContext::GetImage => "getImage",
            ErrorContext::GetImages => "getImages",
            ErrorContext::Route => "route",
            ErrorContext::Main => "main",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Client-fixable input problem.
    #[error("{message}")]
    Validation {
        message: String,
        context: ErrorContext,
        status: StatusCode,
        errors: Vec<String>,
    },

    /// Storage backend unreachable or returned a non-2xx status.
    #[error("{message}")]
    Upstream {
        message: String,
        context: ErrorContext,
        status: StatusCode,
        errors: Vec<String>,
    },

    #[error("Not Found")]
    NotFound { context: ErrorContext },

    #[error("Too many requests, please try again later")]
    RateLimited,

    #[error("Request timed out")]
    Timeout,

    #[error("Internal server error: {message}")]
    Internal {
        message: String,
        context: ErrorContext,
    },
}

impl AppError {
    pub fn validation(context: ErrorContext, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            context,
            status: StatusCode::BAD_REQUEST,
            errors: Vec::new(),
        }
    }

    pub fn upstream(context: ErrorContext, message: impl Into<String>) -> Self {
        AppError::Upstream {
            message: message.into(),
            context,
            status: StatusCode::BAD_GATEWAY,
            errors: Vec::new(),
        }
    }

    pub fn not_found(context: ErrorContext) -> Self {
        AppError::NotFound { context }
    }

    pub fn internal(context: ErrorContext, message: impl Into<String>) -> Self {
        AppError::Internal {
            message: message.into(),
            context,
        }
    }

    /// Override the HTTP status of a validation or upstream error.
    pub fn with_status(mut self, new_status: StatusCode) -> Self {
        match &mut self {
            AppError::Validation { status, .. } | AppError::Upstream { status, .. } => {
                *status = new_status;
            }
            _ => {}
        }
        self
    }

    /// Attach per-item failure messages (upload batches).
    pub fn with_errors(mut self, items: Vec<String>) -> Self {
        match &mut self {
            AppError::Validation { errors, .. } | AppError::Upstream { errors, .. } => {
                *errors = items;
            }
            _ => {}
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { status, .. } | AppError::Upstream { status, .. } => *status,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn context(&self) -> ErrorContext {
        match self {
            AppError::Validation { context, .. }
            | AppError::Upstream { context, .. }
            | AppError::NotFound { context }
            | AppError::Internal { context, .. } => *context,
            AppError::RateLimited | AppError::Timeout => ErrorContext::Main,
        }
    }

    fn item_errors(&self) -> &[String] {
        match self {
            AppError::Validation { errors, .. } | AppError::Upstream { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// Wire shape of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub success: bool,
    pub message: String,
    pub code: u16,
    pub context: ErrorContext,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<UploadedFileDescriptor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<&'a [String]>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let context = self.context();

        if status.is_server_error() {
            tracing::error!(context = context.as_str(), status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(context = context.as_str(), status = status.as_u16(), error = %self, "Request rejected");
        }

        let items = self.item_errors();
        let (files, errors) = if items.is_empty() {
            (None, None)
        } else {
            (Some(Vec::new()), Some(items))
        };

        let body = ErrorBody {
            success: false,
            message: self.to_string(),
            code: status.as_u16(),
            context,
            timestamp: chrono::Utc::now().to_rfc3339(),
            files,
            errors,
        };

        let mut response = (status, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }
}
