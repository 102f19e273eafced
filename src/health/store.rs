//! Durable get/set of the single health record.
//!
//! # Design Decisions
//! - `fetch`/`put` return typed results; `read`/`write` are the fail-soft
//!   forms the state machine uses
//! - A missing container or blob is the normal "never written" state
//! - No etag or version checks: the last writer wins

use std::sync::Arc;

use crate::health::clock::Clock;
use crate::health::record::HealthRecord;
use crate::observability::metrics;
use crate::storage::{BlobStore, StoreError, StoreResult};

/// Health record persistence over a blob store.
#[derive(Clone)]
pub struct HealthStatusStore {
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    container: String,
    blob: String,
}

impl HealthStatusStore {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        container: impl Into<String>,
        blob: impl Into<String>,
    ) -> Self {
        Self {
            blobs,
            clock,
            container: container.into(),
            blob: blob.into(),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Load the record. `Ok(None)` when it has never been written.
    pub async fn fetch(&self) -> StoreResult<Option<HealthRecord>> {
        match self.blobs.get_object(&self.container, &self.blob).await {
            Ok(bytes) => HealthRecord::from_json(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Malformed(e.to_string())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Load the record, treating every failure as "no record".
    pub async fn read(&self) -> Option<HealthRecord> {
        let result = self.fetch().await;
        metrics::record_store_operation("health_read", outcome(&result));
        match result {
            Ok(record) => record,
            Err(e @ StoreError::Malformed(_)) => {
                tracing::warn!(error = %e, blob = %self.blob, "Ignoring malformed health record");
                None
            }
            Err(
                e @ (StoreError::Unauthorized(_)
                | StoreError::UnexpectedStatus { .. }
                | StoreError::Transport(_)
                | StoreError::Unavailable(_)
                | StoreError::InvalidEndpoint(_)
                | StoreError::InvalidName(_)
                | StoreError::Credential(_)
                | StoreError::Backend(_)),
            ) => {
                tracing::warn!(error = %e, kind = e.kind(), "Health record unreadable, assuming healthy");
                None
            }
            Err(e @ (StoreError::ContainerNotFound(_) | StoreError::BlobNotFound { .. })) => {
                tracing::debug!(error = %e, "No health record");
                None
            }
        }
    }

    /// Overwrite the record. Zero seconds writes a healthy record.
    pub async fn put(&self, unhealthy_seconds: u64) -> StoreResult<HealthRecord> {
        self.blobs.ensure_container(&self.container).await?;
        let record = HealthRecord::new(self.clock.now(), unhealthy_seconds);
        let body = record
            .to_json()
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        self.blobs.put_object(&self.container, &self.blob, body).await?;
        Ok(record)
    }

    /// Overwrite the record, reporting only whether it worked.
    pub async fn write(&self, unhealthy_seconds: u64) -> bool {
        let result = self.put(unhealthy_seconds).await;
        metrics::record_store_operation("health_write", outcome(&result));
        match result {
            Ok(record) => {
                tracing::info!(
                    status = ?record.status(),
                    unhealthy_until = ?record.unhealthy_until(),
                    "Health record written"
                );
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), unhealthy_seconds, "Failed to write health record");
                false
            }
        }
    }
}

fn outcome<T>(result: &StoreResult<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    }
}
