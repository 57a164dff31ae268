//! Terminology Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Bulk tools for the terminology database.
//!
//! # Components
//!
//! - **Loader** ([`pipeline`]): reads n-grams line by line and inserts them
//!   in bounded batches, flushing the last batch on EOF or SIGINT/SIGTERM
//! - **Exporter** ([`export`]): writes terms and their source contexts as
//!   tab-separated lines
//! - **Input** ([`input`]): cancellable line input from stdin
//!
//! # Example
//!
//! ```no_run
//! use term_common::config::DatabaseConfig;
//! use term_common::shutdown::Shutdown;
//! use term_ingest::pipeline::{LoaderConfig, NGramLoader};
//! use term_ingest::session::MySqlSession;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = MySqlSession::connect(&DatabaseConfig::from_env()?).await?;
//!     let mut loader = NGramLoader::new(session, LoaderConfig::default(), std::io::stderr());
//!
//!     let shutdown = Shutdown::new();
//!     shutdown.listen_for_signals();
//!
//!     let stdin = term_ingest::input::stdin_reader();
//!     let summary = loader.run(stdin, &shutdown).await?;
//!     tracing::info!(inserted = summary.inserted, "done");
//!     Ok(())
//! }
//! ```

pub mod export;
pub mod input;
pub mod pipeline;
pub mod session;
pub mod sql;

pub use export::{export_terms, ExportConfig, ExportSummary, MySqlTermSource, TermRecord, TermSource};
pub use pipeline::{LoadSummary, LoaderConfig, NGramLoader};
pub use session::{MySqlSession, PersistenceSession};
pub use sql::InsertTarget;
