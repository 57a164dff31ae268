//! Integration tests for the n-gram loader public API
//!
//! These run without a database: a counting session stands in for MySQL.

use async_trait::async_trait;
use std::io::{Cursor, Read};
use term_common::shutdown::Shutdown;
use term_common::TermError;
use term_ingest::input::blocking_reader;
use term_ingest::pipeline::{LoaderConfig, NGramLoader, DEFAULT_BATCH_SIZE};
use term_ingest::session::PersistenceSession;
use term_ingest::sql::{unescape_literal, InsertTarget};

/// Keeps the row count of every committed statement
#[derive(Default)]
struct CountingSession {
    pending: Vec<usize>,
    committed: Vec<usize>,
    closed: bool,
}

#[async_trait]
impl PersistenceSession for CountingSession {
    async fn execute(&mut self, statement: &str) -> Result<u64, sqlx::Error> {
        assert!(!self.closed, "execute after close");
        let rows = statement.matches("('").count();
        self.pending.push(rows);
        Ok(rows as u64)
    }

    async fn commit(&mut self) -> Result<(), sqlx::Error> {
        self.committed.append(&mut self.pending);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), sqlx::Error> {
        assert!(!self.closed, "closed twice");
        self.closed = true;
        Ok(())
    }
}

fn lines(count: usize) -> Cursor<Vec<u8>> {
    let text: String = (0..count).map(|i| format!("n-gram number {i}\n")).collect();
    Cursor::new(text.into_bytes())
}

#[tokio::test]
async fn test_default_batch_size_over_threaded_input() {
    let total = 2 * DEFAULT_BATCH_SIZE + 1;
    let mut diagnostics = Vec::new();
    let mut loader = NGramLoader::new(
        CountingSession::default(),
        LoaderConfig::default(),
        &mut diagnostics,
    );

    let summary = loader
        .run(blocking_reader(lines(total)), &Shutdown::new())
        .await
        .expect("load failed");

    assert_eq!(summary.inserted, total as u64);
    assert_eq!(summary.batches, 3);
    assert_eq!(loader.session().committed, vec![DEFAULT_BATCH_SIZE, DEFAULT_BATCH_SIZE, 1]);
    assert!(loader.session().closed);
    drop(loader);

    let diagnostics = String::from_utf8(diagnostics).unwrap();
    assert_eq!(
        diagnostics.lines().collect::<Vec<_>>(),
        vec!["Inserted 25000 nGrams", "Inserted 50000 nGrams", "Inserted 50001 nGrams"]
    );
}

#[tokio::test]
async fn test_exact_multiple_has_no_trailing_batch() {
    let config = LoaderConfig::new(100, InsertTarget::default()).unwrap();
    let mut loader = NGramLoader::new(CountingSession::default(), config, std::io::sink());

    let summary = loader
        .run(blocking_reader(lines(300)), &Shutdown::new())
        .await
        .unwrap();

    assert_eq!(summary.batches, 3);
    assert_eq!(loader.session().committed, vec![100, 100, 100]);
}

#[tokio::test]
async fn test_ingest_after_finalize_is_rejected() {
    let mut loader = NGramLoader::new(
        CountingSession::default(),
        LoaderConfig::default(),
        std::io::sink(),
    );
    loader.finalize().await.unwrap();

    let err = loader.ingest("too late").await.unwrap_err();
    assert!(matches!(err, TermError::SessionClosed));
    // second finalize must not close the session again
    loader.finalize().await.unwrap();
}

#[test]
fn test_escaped_values_read_back() {
    let target = InsertTarget::default();
    let sql = target.build(&["it's", "C:\\Program Files"]).unwrap();
    let values = sql.split_once("VALUES ").unwrap().1;

    let decoded: Vec<String> = values
        .split("), (")
        .map(|v| v.trim_matches(|c| c == '(' || c == ')'))
        .map(|v| unescape_literal(&v[1..v.len() - 1]))
        .collect();

    assert_eq!(decoded, vec!["it's".to_string(), "C:\\Program Files".to_string()]);
}

struct BrokenPipe;

impl Read for BrokenPipe {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "writer went away"))
    }
}

#[tokio::test]
async fn test_read_error_flushes_accepted_records() {
    let config = LoaderConfig::new(100, InsertTarget::default()).unwrap();
    let mut diagnostics = Vec::new();
    let mut loader = NGramLoader::new(CountingSession::default(), config, &mut diagnostics);

    let input = blocking_reader(lines(150).chain(BrokenPipe));
    let err = loader.run(input, &Shutdown::new()).await.unwrap_err();

    assert!(matches!(err, TermError::Io(ref e) if e.kind() == std::io::ErrorKind::BrokenPipe));
    assert_eq!(loader.session().committed, vec![100, 50]);
    assert!(loader.session().closed);
    drop(loader);

    let diagnostics = String::from_utf8(diagnostics).unwrap();
    assert_eq!(diagnostics.lines().last(), Some("Inserted 150 nGrams"));
}
