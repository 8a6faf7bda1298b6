//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::EdgeConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, normalize and validate configuration.
///
/// Without a path the defaults are used. Environment overrides are applied
/// after the file in both cases.
pub fn load_config(path: Option<&Path>) -> Result<EdgeConfig, ConfigError> {
    load_config_with(path, |_| {})
}

/// Like [`load_config`], with `adjust` applied after the environment
/// overrides and before validation (command-line flags).
pub fn load_config_with<F>(path: Option<&Path>, adjust: F) -> Result<EdgeConfig, ConfigError>
where
    F: FnOnce(&mut EdgeConfig),
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => EdgeConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    adjust(&mut config);
    normalize(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay deployment variables on top of the file configuration.
pub fn apply_env_overrides<F>(config: &mut EdgeConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("WEBDAV_URL") {
        config.storage.base_url = url;
    }
    if let Some(username) = lookup("WEBDAV_USERNAME") {
        config.storage.username = username;
    }
    if let Some(password) = lookup("WEBDAV_PASSWORD") {
        config.storage.password = password;
    }
    if let Some(path) = lookup("UPLOAD_PAGE_PATH") {
        config.site.upload_page_path = path;
    }
    if let Some(bind) = lookup("BIND_ADDRESS") {
        config.listener.bind_address = bind;
    }
}

/// Canonicalize values that the rest of the service compares verbatim.
pub fn normalize(config: &mut EdgeConfig) {
    config.storage.base_url = config.storage.base_url.trim_end_matches('/').to_string();
    config.site.upload_page_path = normalize_page_path(&config.site.upload_page_path);
    if let Some(origin) = config.site.public_origin.as_mut() {
        *origin = origin.trim_end_matches('/').to_string();
    }
}

/// Force a page path to begin with exactly one `/`.
pub fn normalize_page_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}
