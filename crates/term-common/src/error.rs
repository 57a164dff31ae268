//! Error types for the terminology tools

use thiserror::Error;

/// Result type alias for terminology operations
pub type Result<T> = std::result::Result<T, TermError>;

/// Main error type for the terminology tools
#[derive(Error, Debug)]
pub enum TermError {
    /// The database could not be reached. Fatal at startup.
    #[error("Connection error: {0}")]
    Connection(#[source] sqlx::Error),

    /// A batch insert statement failed. Batches committed before it stay committed.
    #[error("Submission of batch {batch} failed: {source}")]
    Submission {
        batch: u64,
        #[source]
        source: sqlx::Error,
    },

    #[error("Input line {line} is not valid UTF-8")]
    Encoding { line: u64 },

    #[error("Persistence session is already closed")]
    SessionClosed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TermError {
    /// Wrap a failed batch insert.
    pub fn submission(batch: u64, source: sqlx::Error) -> Self {
        TermError::Submission { batch, source }
    }
}
