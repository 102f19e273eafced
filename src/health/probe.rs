//! Storage liveness probe.
//!
//! # Responsibilities
//! - Check live connectivity to the backing store, separate from reading
//!   the persisted record
//! - Bound the check with a timeout so a hung store can't stall failover
//!
//! The status container must exist; a store that answers "no such
//! container" fails the probe. Startup provisions it.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time;

use crate::observability::metrics;
use crate::storage::{BlobStore, StoreError};

/// Why a liveness probe failed.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("storage probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("storage probe failed: {0}")]
    Store(#[from] StoreError),
}

impl ProbeError {
    fn reason(&self) -> &'static str {
        match self {
            ProbeError::Timeout(_) => "timeout",
            ProbeError::Store(e) => e.kind(),
        }
    }
}

/// Probes a container's properties within a deadline.
#[derive(Clone)]
pub struct LivenessProbe {
    blobs: Arc<dyn BlobStore>,
    container: String,
}

impl LivenessProbe {
    pub fn new(blobs: Arc<dyn BlobStore>, container: impl Into<String>) -> Self {
        Self {
            blobs,
            container: container.into(),
        }
    }

    pub async fn check(&self, timeout: Duration) -> Result<(), ProbeError> {
        let result = match time::timeout(timeout, self.blobs.container_properties(&self.container)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ProbeError::Store(e)),
            Err(_) => Err(ProbeError::Timeout(timeout)),
        };

        if let Err(e) = &result {
            tracing::warn!(container = %self.container, error = %e, "Storage liveness probe failed");
            metrics::record_probe_failure(e.reason());
        }
        result
    }
}
