//! Failover file front end library.
//!
//! A small web front end over a blob store (upload, list, view text files)
//! with a persisted, externally controllable health flag that a global
//! load balancer polls to fail traffic over between regions.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod storage;

pub use config::schema::AppConfig;
pub use http::HttpServer;
pub use lifecycle::{Shutdown, ShutdownSignal};
