//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, trace span)
//!     → health.rs / files.rs / info.rs (handlers)
//!     → response.rs (health report, flash redirects)
//!     → Send to client
//! ```

pub mod files;
pub mod health;
pub mod info;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
