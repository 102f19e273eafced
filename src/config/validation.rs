//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Require an endpoint when the Azure backend is selected
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{AppConfig, StorageBackend};

/// A single semantic problem with a configuration.
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

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {:?}", config.listener.bind_address),
        ));
    }

    let storage = &config.storage;
    if storage.backend == StorageBackend::Azure {
        if storage.blob_endpoint.trim().is_empty() {
            errors.push(ValidationError::new(
                "storage.blob_endpoint",
                "required for the azure backend (or set AZURE_STORAGE_BLOB_ENDPOINT)",
            ));
        } else {
            match Url::parse(&storage.blob_endpoint) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => errors.push(ValidationError::new(
                    "storage.blob_endpoint",
                    format!("unsupported scheme {:?}", url.scheme()),
                )),
                Err(e) => errors.push(ValidationError::new("storage.blob_endpoint", e.to_string())),
            }
        }
    }

    if storage.federated_token_file.is_some()
        && (storage.client_id.is_none() || storage.tenant_id.is_none())
    {
        errors.push(ValidationError::new(
            "storage.federated_token_file",
            "workload identity also needs storage.client_id and storage.tenant_id",
        ));
    }

    for (field, name) in [
        ("storage.files_container", &storage.files_container),
        ("storage.status_container", &storage.status_container),
    ] {
        if !is_valid_container_name(name) {
            errors.push(ValidationError::new(
                field,
                format!("{name:?} must be 3-63 lowercase letters, digits or single hyphens"),
            ));
        }
    }
    if storage.files_container == storage.status_container {
        errors.push(ValidationError::new(
            "storage.files_container",
            "must differ from storage.status_container",
        ));
    }
    if storage.status_blob.is_empty() || storage.status_blob.contains('/') {
        errors.push(ValidationError::new("storage.status_blob", "must be a plain blob name"));
    }
    if storage.request_timeout_secs == 0 {
        errors.push(ValidationError::new("storage.request_timeout_secs", "must be > 0"));
    }

    if config.health.unhealthy_duration_secs == 0 {
        errors.push(ValidationError::new("health.unhealthy_duration_secs", "must be > 0"));
    }
    if config.health.probe_timeout_ms == 0 {
        errors.push(ValidationError::new("health.probe_timeout_ms", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.limits.max_upload_bytes == 0 {
        errors.push(ValidationError::new("limits.max_upload_bytes", "must be > 0"));
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {:?}", obs.metrics_address),
        ));
    }
    if !matches!(
        obs.log_level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level {:?}", obs.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Azure container naming rules.
fn is_valid_container_name(name: &str) -> bool {
    (3..=63).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--")
}
