//! Preflight, redirect, static assets and the carousel page.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::assets::render_carousel;
use crate::assets::table::CAROUSEL_HTML;
use crate::error::{AppError, ErrorContext};
use crate::handlers::set_cache_control;
use crate::http::server::AppState;
use crate::storage::normalize_relative_path;

const STATIC_CACHE_CONTROL: &str = "public, max-age=3600";

/// Empty 204 carrying the full CORS header set.
pub fn preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
    response
}

pub fn redirect(target: &str) -> Result<Response, AppError> {
    let location = HeaderValue::from_str(target)
        .map_err(|_| AppError::internal(ErrorContext::Route, "invalid redirect target"))?;
    let mut response = StatusCode::FOUND.into_response();
    response.headers_mut().insert(header::LOCATION, location);
    Ok(response)
}

pub fn serve_static(state: &AppState, filename: &str) -> Result<Response, AppError> {
    let asset = state
        .assets
        .get(filename)
        .ok_or_else(|| AppError::not_found(ErrorContext::Route))?;

    let mut response = Response::new(Body::from(asset.body.clone()));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(asset.content_type),
    );
    set_cache_control(&mut response, STATIC_CACHE_CONTROL);
    Ok(response)
}

/// Carousel page with `subpath` substituted into its script.
pub fn serve_carousel(state: &AppState, subpath: &str) -> Result<Response, AppError> {
    let subdir = normalize_relative_path(subpath)
        .map_err(|e| AppError::validation(ErrorContext::Route, e.to_string()))?;

    let asset = state
        .assets
        .get(CAROUSEL_HTML)
        .ok_or_else(|| AppError::not_found(ErrorContext::Route))?;
    let template = String::from_utf8_lossy(&asset.body);

    let mut response = Response::new(Body::from(render_carousel(&template, &subdir)));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(asset.content_type),
    );
    set_cache_control(&mut response, "no-store");
    Ok(response)
}
