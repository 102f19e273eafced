//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then apply
/// environment overrides.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    finish(config)
}

/// Load from an optional file; without one, start from defaults.
pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => finish(AppConfig::default()),
    }
}

fn finish(mut config: AppConfig) -> Result<AppConfig, ConfigError> {
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay the deployment environment on top of file values.
///
/// Empty variables are ignored.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(endpoint) = get("AZURE_STORAGE_BLOB_ENDPOINT") {
        config.storage.blob_endpoint = endpoint;
    }
    if let Some(container) = get("AZURE_STORAGE_CONTAINER_NAME") {
        config.storage.files_container = container;
    }
    if let Some(token) = get("AZURE_STORAGE_SAS_TOKEN") {
        config.storage.sas_token = Some(token);
    }
    if let Some(client_id) = get("AZURE_CLIENT_ID") {
        config.storage.client_id = Some(client_id);
    }
    if let Some(tenant_id) = get("AZURE_TENANT_ID") {
        config.storage.tenant_id = Some(tenant_id);
    }
    if let Some(token_file) = get("AZURE_FEDERATED_TOKEN_FILE") {
        config.storage.federated_token_file = Some(token_file);
    }
    if let Some(region) = get("AZURE_REGION") {
        config.region.region = region;
    }
    if let Some(suffix) = get("AZURE_REGION_SUFFIX") {
        config.region.region_suffix = suffix;
    }
    if let Some(env_name) = get("AZURE_ENV_NAME") {
        config.region.environment = env_name;
    }
    if let Some(hostname) = get("HOSTNAME") {
        config.region.hostname = hostname;
    }
    if let Some(port) = get("PORT") {
        match port.parse::<u16>() {
            Ok(port) => config.listener.bind_address = format!("0.0.0.0:{port}"),
            Err(_) => tracing::warn!(port = %port, "Ignoring invalid PORT"),
        }
    }
}
