//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Blob storage backend and container names.
    pub storage: StorageConfig,

    /// Health toggle settings.
    pub health: HealthConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request limits.
    pub limits: LimitsConfig,

    /// Region identity reported by the index and info endpoints.
    pub region: RegionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Which blob store implementation to use.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Azure Blob Storage over REST.
    #[default]
    Azure,
    /// Process-local store; state is lost on restart.
    Memory,
}

/// Blob storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Blob service endpoint, e.g. "https://acct.blob.core.windows.net".
    pub blob_endpoint: String,

    /// SAS token sent with every request. Without one, requests use the
    /// managed identity, or workload identity when the three fields below
    /// are set.
    pub sas_token: Option<String>,

    /// User-assigned identity or workload identity client id.
    pub client_id: Option<String>,

    /// Entra tenant for workload identity.
    pub tenant_id: Option<String>,

    /// Projected service account token for workload identity.
    pub federated_token_file: Option<String>,

    /// Container holding uploaded files.
    pub files_container: String,

    /// Container holding the health record.
    pub status_container: String,

    /// Blob name of the health record.
    pub status_blob: String,

    /// Per-request timeout for storage calls in seconds.
    pub request_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Azure,
            blob_endpoint: String::new(),
            sas_token: None,
            client_id: None,
            tenant_id: None,
            federated_token_file: None,
            files_container: "files".to_string(),
            status_container: "status".to_string(),
            status_blob: "health-status.json".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Health toggle configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthConfig {
    /// How long `unhealthy` / `make_unhealthy` keep the instance down.
    pub unhealthy_duration_secs: u64,

    /// Deadline for the storage liveness probe in milliseconds.
    pub probe_timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            unhealthy_duration_secs: 60,
            probe_timeout_ms: 2000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes (uploads).
    pub max_upload_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 1024 * 1024, // 1MB
        }
    }
}

/// Deployment identity.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RegionConfig {
    pub region: String,
    pub region_suffix: String,
    pub environment: String,
    pub hostname: String,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            region: "unknown".to_string(),
            region_suffix: "unknown".to_string(),
            environment: "unknown".to_string(),
            hostname: "unknown".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
