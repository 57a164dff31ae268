//! Persistence session used by the n-gram loader
//!
//! The loader only needs three things from the database: run a statement,
//! commit what has been run, and close. [`PersistenceSession`] is that
//! contract; [`MySqlSession`] implements it over a single sqlx connection.

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnection, MySqlPoolOptions, MySqlQueryResult};
use sqlx::{Executor, MySql, MySqlPool, Transaction};
use std::time::Duration;
use term_common::config::DatabaseConfig;
use term_common::{Result, TermError};
use tracing::{debug, info};

/// Connection/transaction scope the loader submits batches to.
#[async_trait]
pub trait PersistenceSession: Send {
    /// Execute one statement inside the current unit of work.
    ///
    /// Returns the number of affected rows.
    async fn execute(&mut self, statement: &str) -> std::result::Result<u64, sqlx::Error>;

    /// Make everything executed since the last commit durable.
    async fn commit(&mut self) -> std::result::Result<(), sqlx::Error>;

    /// Release the session. Uncommitted work is discarded.
    async fn close(&mut self) -> std::result::Result<(), sqlx::Error>;
}

/// MySQL session backed by a one-connection pool.
pub struct MySqlSession {
    pool: MySqlPool,
    tx: Option<Transaction<'static, MySql>>,
}

impl MySqlSession {
    /// Open the session, failing fast with [`TermError::Connection`].
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(TermError::Connection)?;

        info!(url = %config.redacted_url(), "Database session opened");

        Ok(Self { pool, tx: None })
    }
}

#[async_trait]
impl PersistenceSession for MySqlSession {
    async fn execute(&mut self, statement: &str) -> std::result::Result<u64, sqlx::Error> {
        // A failed statement drops the transaction, which rolls it back.
        let mut tx = match self.tx.take() {
            Some(tx) => tx,
            None => self.pool.begin().await?,
        };

        let conn: &mut MySqlConnection = &mut tx;
        let result: MySqlQueryResult = Executor::execute(conn, sqlx::raw_sql(statement)).await?;
        debug!(rows = result.rows_affected(), "Statement executed");
        self.tx = Some(tx);

        Ok(result.rows_affected())
    }

    async fn commit(&mut self) -> std::result::Result<(), sqlx::Error> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> std::result::Result<(), sqlx::Error> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        self.pool.close().await;
        info!("Database session closed");
        Ok(())
    }
}
