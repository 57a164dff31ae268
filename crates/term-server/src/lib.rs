//! Terminology Server Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Launches the terminology web service: binds the listener, serves the
//! service's routes with request tracing, and on SIGINT/SIGTERM stops
//! accepting, drains open connections and runs the service's cleanup once.

pub mod config;
pub mod launcher;
pub mod service;

pub use config::{Config, ServerConfig};
pub use launcher::launch;
pub use service::{DatabaseService, TerminologyService};
