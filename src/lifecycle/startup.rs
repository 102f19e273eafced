//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the configured blob store backend
//! - Fail fast on an unusable storage configuration
//! - Provision the status and files containers before traffic arrives

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::storage::{AzureBlobStore, BlobStore, MemoryBlobStore, StoreError};

/// Construct the blob store named by `storage.backend`.
pub fn build_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, StoreError> {
    match config.backend {
        StorageBackend::Azure => {
            let store = AzureBlobStore::from_config(config)?;
            tracing::info!(
                endpoint = %store.endpoint(),
                account = %store.account(),
                auth = store.auth().mode(),
                "Using Azure blob storage"
            );
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory blob storage; data is lost on exit");
            Ok(Arc::new(MemoryBlobStore::new()))
        }
    }
}

/// Create the status and files containers if they are missing.
///
/// Failures are logged, not fatal: the health endpoint reports storage as
/// down until the status container exists. Returns how many containers are
/// in place.
pub async fn provision_containers(blobs: &dyn BlobStore, config: &StorageConfig) -> usize {
    let mut ready = 0;
    for container in [&config.status_container, &config.files_container] {
        match blobs.ensure_container(container).await {
            Ok(()) => ready += 1,
            Err(e) => tracing::warn!(
                container = %container,
                error = %e,
                kind = e.kind(),
                "Failed to provision container"
            ),
        }
    }
    ready
}
