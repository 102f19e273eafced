//! Health status subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health, POST /health/control, GET /
//!     → state.rs (evaluate / set_unhealthy / set_healthy)
//!     → store.rs (read / write the single JSON record)
//!     → storage::BlobStore (status container)
//!
//! GET /health, verdict healthy:
//!     → probe.rs (bounded container-properties call)
//! ```
//!
//! # Design Decisions
//! - Fail-open: no record, or an unreadable one, means healthy
//! - Expiry is evaluated on read; recovery is written back immediately
//! - Probe failures only affect the response they occur in
//! - Concurrent writers race; the last write wins

pub mod clock;
pub mod probe;
pub mod record;
pub mod state;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use probe::{LivenessProbe, ProbeError};
pub use record::{HealthRecord, HealthStatus, RecordState};
pub use state::{Evaluation, HealthStateMachine};
pub use store::HealthStatusStore;
