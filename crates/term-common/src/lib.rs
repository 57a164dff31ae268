//! Terminology Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared plumbing for the terminology tools.
//!
//! # Overview
//!
//! This crate provides functionality used across all workspace members:
//!
//! - **Error Handling**: the [`TermError`] type and its [`Result`] alias
//! - **Logging**: tracing subscriber setup driven by environment variables
//! - **Configuration**: database connection settings
//! - **Shutdown**: SIGINT/SIGTERM handling as a cooperative cancellation token
//!
//! # Example
//!
//! ```no_run
//! use term_common::config::DatabaseConfig;
//! use term_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     let database = DatabaseConfig::from_env()?;
//!     tracing::info!(url = %database.redacted_url(), "Configuration loaded");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod shutdown;

// Re-export commonly used types
pub use error::{Result, TermError};
