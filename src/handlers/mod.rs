//! Request handlers, one per route class.
//!
//! Each handler receives the shared [`AppState`](crate::http::server::AppState)
//! and already-classified inputs, and returns either a finished response or an
//! [`AppError`](crate::error::AppError) for the uniform formatter.

pub mod image;
pub mod listing;
pub mod pages;
pub mod upload;

use axum::http::{header, HeaderValue};
use axum::response::Response;

pub(crate) fn set_cache_control(response: &mut Response, value: &'static str) {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(value));
}
