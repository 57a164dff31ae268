//! term-ingest - bulk loading and export for the terminology database

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use term_common::config::DatabaseConfig;
use term_common::logging::{init_logging, LogConfig, LogLevel};
use term_common::shutdown::Shutdown;
use term_ingest::input;
use term_ingest::export::{export_terms, ExportConfig, MySqlTermSource, DEFAULT_CONTEXT_LIMIT};
use term_ingest::pipeline::{LoaderConfig, NGramLoader, DEFAULT_BATCH_SIZE};
use term_ingest::session::MySqlSession;
use term_ingest::sql::{InsertTarget, DEFAULT_COLUMN, DEFAULT_TABLE};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "term-ingest")]
#[command(author, version, about = "Terminology database bulk tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load newline-separated n-grams from stdin
    Load {
        /// Records per INSERT statement
        #[arg(long, env = "NGRAM_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Target table
        #[arg(long, env = "NGRAM_TABLE", default_value = DEFAULT_TABLE)]
        table: String,

        /// Target column
        #[arg(long, env = "NGRAM_COLUMN", default_value = DEFAULT_COLUMN)]
        column: String,
    },

    /// Write terms and their source contexts to stdout as TSV
    Export {
        /// Job whose terms are exported (repeatable)
        #[arg(long = "job-id", env = "EXPORT_JOB_IDS", value_delimiter = ',', required = true)]
        job_ids: Vec<i64>,

        /// Maximum source contexts per term
        #[arg(long, default_value_t = DEFAULT_CONTEXT_LIMIT)]
        context_limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { LogLevel::Debug } else { LogLevel::Info };
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("term-ingest")
        .filter_directives("sqlx=warn")
        .build()
        .merge_env()?;
    let _log_guard = init_logging(&log_config)?;

    let database = DatabaseConfig::from_env()?;

    match cli.command {
        Command::Load { batch_size, table, column } => {
            let config = LoaderConfig::new(batch_size, InsertTarget::new(table, column)?)?;
            load(&database, config).await?;
        },
        Command::Export { job_ids, context_limit } => {
            let config = ExportConfig::new(job_ids, context_limit)?;
            export(&database, &config).await?;
        },
    }

    Ok(())
}

async fn load(database: &DatabaseConfig, config: LoaderConfig) -> Result<()> {
    let session = MySqlSession::connect(database)
        .await
        .context("Failed to open database session")?;

    let shutdown = Shutdown::new();
    let listener = shutdown.listen_for_signals();

    let mut loader = NGramLoader::new(session, config, std::io::stderr());
    let stdin = input::stdin_reader();
    let result = loader.run(stdin, &shutdown).await;
    listener.abort();

    let summary = result.context("Loading n-grams failed")?;
    if summary.interrupted {
        info!(inserted = summary.inserted, "Load stopped by signal after flushing");
    }
    Ok(())
}

async fn export(database: &DatabaseConfig, config: &ExportConfig) -> Result<()> {
    let source = MySqlTermSource::connect(database)
        .await
        .context("Failed to connect to terminology database")?;

    let mut stdout = tokio::io::stdout();
    let result = export_terms(&source, config, &mut stdout).await;
    source.close().await;

    result.context("Exporting terms failed")?;
    Ok(())
}
