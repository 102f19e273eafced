//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse, deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via ArcSwap with the HTTP handlers
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<AppConfig>
//!     → handlers observe new durations, timeouts and region info
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so the service runs from environment alone
//! - Environment variables win over the file
//! - Storage backend and endpoint are fixed at startup; changing them
//!   needs a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load, load_config, ConfigError};
pub use schema::{
    AppConfig, HealthConfig, ListenerConfig, LogFormat, ObservabilityConfig, RegionConfig,
    StorageBackend, StorageConfig,
};
pub use watcher::ConfigWatcher;
