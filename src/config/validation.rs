//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows, capacities, TTLs > 0)
//! - Check that the storage URL and bind address parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::EdgeConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.storage.base_url.is_empty() {
        errors.push(ValidationError::new("storage.base_url", "must be set"));
    } else {
        match Url::parse(&config.storage.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::new(
                "storage.base_url",
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new("storage.base_url", e.to_string())),
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.timeouts.storage_secs == 0 {
        errors.push(ValidationError::new("timeouts.storage_secs", "must be > 0"));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::new("rate_limit.max_requests", "must be > 0"));
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::new("rate_limit.window_secs", "must be > 0"));
        }
        if config.rate_limit.client_ip_header.trim().is_empty() {
            errors.push(ValidationError::new("rate_limit.client_ip_header", "must be set"));
        }
    }

    if config.cache.capacity == 0 {
        errors.push(ValidationError::new("cache.capacity", "must be > 0"));
    }
    if config.cache.listing_ttl_secs == 0 {
        errors.push(ValidationError::new("cache.listing_ttl_secs", "must be > 0"));
    }

    if config.edge_cache.enabled && config.edge_cache.ttl_secs == 0 {
        errors.push(ValidationError::new("edge_cache.ttl_secs", "must be > 0"));
    }

    if config.upload.concurrency == 0 {
        errors.push(ValidationError::new("upload.concurrency", "must be > 0"));
    }
    if config.upload.max_file_bytes == 0 {
        errors.push(ValidationError::new("upload.max_file_bytes", "must be > 0"));
    }
    if config.upload.max_request_bytes < config.upload.max_file_bytes {
        errors.push(ValidationError::new(
            "upload.max_request_bytes",
            "must be at least upload.max_file_bytes",
        ));
    }
    if let Some(bad) = config
        .upload
        .allowed_mime_types
        .iter()
        .find(|m| !m.starts_with("image/"))
    {
        errors.push(ValidationError::new(
            "upload.allowed_mime_types",
            format!("'{}' is not an image type", bad),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
