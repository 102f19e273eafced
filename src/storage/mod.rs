//! Blob storage subsystem.
//!
//! # Data Flow
//! ```text
//! health store / file handlers
//!     → BlobStore trait (container + key addressing)
//!     → azure.rs (object_store Azure client; container calls over REST)
//!     → memory.rs (in-process store for local runs and tests)
//! ```
//!
//! # Design Decisions
//! - One client instance, built at startup and injected as `Arc<dyn BlobStore>`
//! - Puts always overwrite (last-write-wins, no etag checks)
//! - Missing containers and missing blobs are distinct error variants so
//!   callers can map them to their own policy

pub mod azure;
pub mod memory;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use azure::{AzureAuth, AzureBlobStore};
pub use memory::MemoryBlobStore;

/// Result alias for blob store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by a blob store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("blob not found: {container}/{key}")]
    BlobNotFound { container: String, key: String },

    #[error("storage rejected credentials (status {0})")]
    Unauthorized(u16),

    #[error("unexpected status {status} from storage during {operation}")]
    UnexpectedStatus { operation: &'static str, status: u16 },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("invalid blob name: {0}")]
    InvalidName(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("invalid storage endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("storage credential unavailable: {0}")]
    Credential(String),

    #[error("object store error: {0}")]
    Backend(#[source] object_store::Error),
}

impl StoreError {
    /// True when the error means "the thing is not there" rather than
    /// "the store could not be reached".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::ContainerNotFound(_) | StoreError::BlobNotFound { .. }
        )
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::ContainerNotFound(_) => "container_not_found",
            StoreError::BlobNotFound { .. } => "blob_not_found",
            StoreError::Unauthorized(_) => "unauthorized",
            StoreError::UnexpectedStatus { .. } => "unexpected_status",
            StoreError::Transport(_) => "transport",
            StoreError::Malformed(_) => "malformed",
            StoreError::InvalidName(_) => "invalid_name",
            StoreError::Unavailable(_) => "unavailable",
            StoreError::InvalidEndpoint(_) => "invalid_endpoint",
            StoreError::Credential(_) => "credential",
            StoreError::Backend(_) => "backend",
        }
    }
}

/// Container metadata returned by a properties lookup.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ContainerProperties {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// Key-value object store addressed by `(container, key)`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Backend name for logs and the info endpoint.
    fn name(&self) -> &'static str;

    async fn container_exists(&self, container: &str) -> StoreResult<bool>;

    /// Create a container. Creating one that already exists is not an error.
    async fn create_container(&self, container: &str) -> StoreResult<()>;

    /// Fetch container metadata. Used as the storage liveness probe.
    async fn container_properties(&self, container: &str) -> StoreResult<ContainerProperties>;

    async fn get_object(&self, container: &str, key: &str) -> StoreResult<Vec<u8>>;

    /// Write an object, replacing any existing one.
    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> StoreResult<()>;

    /// List object names in a container, sorted by name.
    async fn list_objects(&self, container: &str) -> StoreResult<Vec<String>>;

    /// Create the container unless it already exists.
    async fn ensure_container(&self, container: &str) -> StoreResult<()> {
        if !self.container_exists(container).await? {
            tracing::info!(container = %container, backend = self.name(), "Creating container");
            self.create_container(container).await?;
        }
        Ok(())
    }
}

/// Reject names the REST API would misroute.
pub(crate) fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty()
        || key.len() > 1024
        || key.contains('/')
        || key == "."
        || key == ".."
        || key.chars().any(char::is_control)
    {
        return Err(StoreError::InvalidName(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        assert!(StoreError::ContainerNotFound("status".into()).is_not_found());
        assert!(StoreError::BlobNotFound {
            container: "status".into(),
            key: "health-status.json".into()
        }
        .is_not_found());
        assert!(!StoreError::Unauthorized(403).is_not_found());
        assert!(!StoreError::Unavailable("down".into()).is_not_found());
    }

    #[test]
    fn key_validation() {
        assert!(validate_key("notes.txt").is_ok());
        assert!(validate_key("health-status.json").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("bad\nname").is_err());
        assert!(validate_key("..").is_err());
    }
}
