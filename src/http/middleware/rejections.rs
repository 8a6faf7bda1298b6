//! Route bare rejections from tower-http layers through the error formatter.
//!
//! `RequestBodyLimitLayer` answers an oversized `Content-Length` with a
//! plain-text 413 and `TimeoutLayer` with an empty 408. Neither reaches the
//! handlers, so both are rewritten here.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::{AppError, ErrorContext};

fn is_formatted(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"))
}

pub async fn format_layer_rejections(response: Response) -> Response {
    if is_formatted(&response) {
        return response;
    }

    match response.status() {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::validation(
            ErrorContext::Upload,
            "Request body exceeds the upload size limit",
        )
        .with_status(StatusCode::PAYLOAD_TOO_LARGE)
        .into_response(),
        StatusCode::REQUEST_TIMEOUT => AppError::Timeout.into_response(),
        _ => response,
    }
}
