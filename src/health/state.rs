//! Health state machine.
//!
//! # States
//! - Healthy: instance takes traffic (also the verdict when no record exists)
//! - Unhealthy: instance reports 503 until `unhealthy_until`
//!
//! # State Transitions
//! ```text
//! Healthy   → Unhealthy: set_unhealthy(duration)
//! *         → Healthy:   set_healthy()
//! Unhealthy → Healthy:   evaluation after unhealthy_until (persisted)
//! ```
//!
//! Expiry is checked lazily on every evaluation; there is no timer.

use crate::health::record::{HealthRecord, HealthStatus};
use crate::health::store::HealthStatusStore;
use crate::observability::metrics;

/// Outcome of a single evaluation. Never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Live verdict.
    pub healthy: bool,
    /// The record as read, even when it was stale and got replaced.
    pub record: Option<HealthRecord>,
    /// An expired unhealthy record was found during this evaluation.
    pub recovered: bool,
}

impl Evaluation {
    pub fn status(&self) -> HealthStatus {
        HealthStatus::from_healthy(self.healthy)
    }
}

/// Turns the stored record into a current verdict.
#[derive(Clone)]
pub struct HealthStateMachine {
    store: HealthStatusStore,
}

impl HealthStateMachine {
    pub fn new(store: HealthStatusStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &HealthStatusStore {
        &self.store
    }

    /// Compute the current verdict, recovering an expired unhealthy record.
    pub async fn evaluate(&self) -> Evaluation {
        let evaluation = match self.store.read().await {
            None => Evaluation {
                healthy: true,
                record: None,
                recovered: false,
            },
            Some(record) if record.is_expired(self.store.clock().now()) => {
                tracing::info!(
                    unhealthy_until = ?record.unhealthy_until(),
                    "Unhealthy window elapsed, recovering"
                );
                metrics::record_auto_recovery();
                if !self.store.write(0).await {
                    tracing::warn!("Auto-recovery not persisted; reporting healthy anyway");
                }
                Evaluation {
                    healthy: true,
                    record: Some(record),
                    recovered: true,
                }
            }
            Some(record) => Evaluation {
                healthy: record.status().is_healthy(),
                record: Some(record),
                recovered: false,
            },
        };

        metrics::record_health_evaluation(evaluation.healthy);
        evaluation
    }

    /// Report unhealthy for the next `duration_secs` seconds.
    pub async fn set_unhealthy(&self, duration_secs: u64) -> bool {
        tracing::info!(duration_secs, "Marking instance unhealthy");
        self.store.write(duration_secs).await
    }

    pub async fn set_healthy(&self) -> bool {
        tracing::info!("Marking instance healthy");
        self.store.write(0).await
    }
}
