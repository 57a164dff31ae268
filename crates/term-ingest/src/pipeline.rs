//! Bounded-batch n-gram loader
//!
//! Records are buffered in memory and written as one multi-row INSERT per
//! batch. A batch is committed as soon as it is full; the final partial batch
//! is written when the input ends or a termination signal is observed.
//!
//! Guarantees:
//! - every accepted record belongs to exactly one batch
//! - a batch is handed to the session at most once, even if it fails
//! - a non-empty pending batch is submitted before the session is closed
//!
//! Progress goes to the diagnostic writer as `Inserted <count> nGrams`, once
//! per full batch and once more as the final summary.
//!
//! Submission failures are fatal and not retried. Batches committed before the
//! failure stay in the database; everything after it is lost.

use std::io::Write;
use term_common::shutdown::{Shutdown, ShutdownReason};
use term_common::{Result, TermError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::session::PersistenceSession;
use crate::sql::InsertTarget;

/// Records per INSERT statement.
pub const DEFAULT_BATCH_SIZE: usize = 25_000;

/// Loader settings
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    batch_size: usize,
    target: InsertTarget,
}

impl LoaderConfig {
    pub fn new(batch_size: usize, target: InsertTarget) -> Result<Self> {
        if batch_size == 0 {
            return Err(TermError::Config("Batch size must be greater than 0".to_string()));
        }
        Ok(Self { batch_size, target })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn target(&self) -> &InsertTarget {
        &self.target
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            target: InsertTarget::default(),
        }
    }
}

/// Outcome of a load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadSummary {
    /// Records accepted, whether or not their batch was committed
    pub inserted: u64,
    /// Batches committed
    pub batches: u64,
    /// The load stopped because of SIGINT/SIGTERM
    pub interrupted: bool,
}

/// Buffers records and writes them to a [`PersistenceSession`] in batches.
pub struct NGramLoader<S, W> {
    session: S,
    config: LoaderConfig,
    batch: Vec<String>,
    inserted: u64,
    batches: u64,
    interrupted: bool,
    closed: bool,
    diagnostics: W,
}

impl<S, W> NGramLoader<S, W>
where
    S: PersistenceSession,
    W: Write + Send,
{
    pub fn new(session: S, config: LoaderConfig, diagnostics: W) -> Self {
        Self {
            batch: Vec::with_capacity(config.batch_size),
            session,
            config,
            inserted: 0,
            batches: 0,
            interrupted: false,
            closed: false,
            diagnostics,
        }
    }

    /// Accept one record, submitting the batch if it became full.
    pub async fn ingest(&mut self, record: impl Into<String>) -> Result<()> {
        if self.closed {
            return Err(TermError::SessionClosed);
        }

        self.batch.push(record.into());
        self.inserted += 1;

        if self.batch.len() >= self.config.batch_size {
            self.submit_and_reset().await?;
            self.report()?;
        }

        Ok(())
    }

    /// Submit the pending batch, if any, and clear it.
    ///
    /// The batch is cleared whether or not the submission succeeds.
    pub async fn submit_and_reset(&mut self) -> Result<()> {
        let Some(statement) = self.config.target.build(&self.batch) else {
            return Ok(());
        };
        if self.closed {
            return Err(TermError::SessionClosed);
        }

        let number = self.batches + 1;
        let records = self.batch.len();
        self.batch.clear();

        self.session
            .execute(&statement)
            .await
            .map_err(|e| TermError::submission(number, e))?;
        self.session
            .commit()
            .await
            .map_err(|e| TermError::submission(number, e))?;

        self.batches = number;
        debug!(batch = number, records, "Batch committed");

        Ok(())
    }

    /// Flush the pending batch, close the session and write the summary.
    ///
    /// Calling it again after a successful close does nothing and returns the
    /// same summary.
    pub async fn finalize(&mut self) -> Result<LoadSummary> {
        if self.closed {
            return Ok(self.summary());
        }

        self.submit_and_reset().await?;

        self.closed = true;
        self.session.close().await?;
        self.report()?;

        let summary = self.summary();
        info!(
            inserted = summary.inserted,
            batches = summary.batches,
            interrupted = summary.interrupted,
            "Load finished"
        );

        Ok(summary)
    }

    /// [`finalize`](Self::finalize) on behalf of a termination signal.
    pub async fn on_interrupt(&mut self, reason: ShutdownReason) -> Result<LoadSummary> {
        if !self.closed {
            warn!(signal = %reason, pending = self.batch.len(), "Stopping early, flushing pending batch");
            self.interrupted = true;
        }
        self.finalize().await
    }

    /// Load every line of `input` until end of stream or shutdown.
    ///
    /// Shutdown is only observed while waiting for the next line, never in
    /// the middle of a submission. Trailing whitespace is stripped from each
    /// line; empty lines are loaded as empty strings.
    ///
    /// A read error or a line that is not UTF-8 ends the load: the records
    /// accepted before it are still submitted and the session closed before
    /// the error is returned.
    pub async fn run<R>(&mut self, mut input: R, shutdown: &Shutdown) -> Result<LoadSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        info!(
            batch_size = self.config.batch_size,
            table = self.config.target.table(),
            column = self.config.target.column(),
            "Loading n-grams"
        );

        let mut line = Vec::new();
        let mut line_number = 0u64;

        loop {
            line.clear();

            let read = tokio::select! {
                biased;
                reason = shutdown.triggered() => Err(reason),
                read = input.read_until(b'\n', &mut line) => Ok(read),
            };

            match read {
                Err(reason) => return self.on_interrupt(reason).await,
                Ok(Err(e)) => return self.abort_input(TermError::Io(e)).await,
                Ok(Ok(0)) => break,
                Ok(Ok(_)) => {
                    line_number += 1;
                    let Ok(text) = std::str::from_utf8(&line) else {
                        return self
                            .abort_input(TermError::Encoding { line: line_number })
                            .await;
                    };
                    self.ingest(text.trim_end()).await?;
                }
            }
        }

        self.finalize().await
    }

    /// Flush what was accepted so far, then fail with the input error.
    async fn abort_input(&mut self, error: TermError) -> Result<LoadSummary> {
        warn!(error = %error, pending = self.batch.len(), "Input failed, flushing pending batch");
        self.finalize().await?;
        Err(error)
    }

    fn report(&mut self) -> Result<()> {
        writeln!(self.diagnostics, "Inserted {} nGrams", self.inserted)?;
        self.diagnostics.flush()?;
        Ok(())
    }

    pub fn summary(&self) -> LoadSummary {
        LoadSummary {
            inserted: self.inserted,
            batches: self.batches,
            interrupted: self.interrupted,
        }
    }

    /// Records waiting in the current batch
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn diagnostics(&self) -> &W {
        &self.diagnostics
    }
}
