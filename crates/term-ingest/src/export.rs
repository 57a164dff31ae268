//! Term export as tab-separated lines
//!
//! One line per term, ordered by term text:
//!
//! ```text
//! <Term>\t \t<ContentType>\t<NewTo>[\t<SourceContext>]*\n
//! ```
//!
//! The second column is always a single space. At most `context_limit`
//! contexts are listed per term; NULL columns are written empty.

use async_trait::async_trait;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder};
use std::time::Duration;
use term_common::config::DatabaseConfig;
use term_common::{Result, TermError};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Contexts listed per term unless configured otherwise.
pub const DEFAULT_CONTEXT_LIMIT: u32 = 20;

/// A row of `TermList`
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TermRecord {
    #[sqlx(rename = "TermID")]
    pub term_id: i64,
    #[sqlx(rename = "Term")]
    pub term: Option<String>,
    #[sqlx(rename = "ContentType")]
    pub content_type: Option<String>,
    #[sqlx(rename = "NewTo")]
    pub new_to: Option<String>,
}

/// Where terms and their contexts are read from.
#[async_trait]
pub trait TermSource: Send + Sync {
    /// Terms belonging to any of `job_ids`, ordered by term.
    async fn terms(&self, job_ids: &[i64]) -> Result<Vec<TermRecord>>;

    /// Up to `limit` source contexts for a term; `None` for a NULL context.
    async fn contexts(&self, term_id: i64, limit: u32) -> Result<Vec<Option<String>>>;
}

/// Export settings
#[derive(Debug, Clone)]
pub struct ExportConfig {
    job_ids: Vec<i64>,
    context_limit: u32,
}

impl ExportConfig {
    pub fn new(job_ids: Vec<i64>, context_limit: u32) -> Result<Self> {
        if job_ids.is_empty() {
            return Err(TermError::Config("At least one job id is required".to_string()));
        }
        Ok(Self { job_ids, context_limit })
    }

    pub fn job_ids(&self) -> &[i64] {
        &self.job_ids
    }

    pub fn context_limit(&self) -> u32 {
        self.context_limit
    }
}

/// Counts of what was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportSummary {
    pub terms: u64,
    pub contexts: u64,
}

/// Write every term of the configured jobs to `out`.
pub async fn export_terms<T, W>(source: &T, config: &ExportConfig, out: &mut W) -> Result<ExportSummary>
where
    T: TermSource + ?Sized,
    W: AsyncWrite + Unpin,
{
    let terms = source.terms(config.job_ids()).await?;
    info!(job_ids = ?config.job_ids(), terms = terms.len(), "Exporting terms");

    let mut summary = ExportSummary::default();
    for term in &terms {
        let contexts = source.contexts(term.term_id, config.context_limit()).await?;
        debug!(term_id = term.term_id, contexts = contexts.len(), "Term contexts fetched");

        out.write_all(format_line(term, &contexts).as_bytes()).await?;
        summary.terms += 1;
        summary.contexts += contexts.len() as u64;
    }
    out.flush().await?;

    info!(terms = summary.terms, contexts = summary.contexts, "Export finished");
    Ok(summary)
}

/// Render one output line, newline included.
pub fn format_line(term: &TermRecord, contexts: &[Option<String>]) -> String {
    let mut line = String::new();
    line.push_str(&clean_field(term.term.as_deref().unwrap_or_default()));
    line.push_str("\t \t");
    line.push_str(&clean_field(term.content_type.as_deref().unwrap_or_default()));
    line.push('\t');
    line.push_str(&clean_field(term.new_to.as_deref().unwrap_or_default()));
    for context in contexts {
        line.push('\t');
        line.push_str(&clean_field(context.as_deref().unwrap_or_default()));
    }
    line.push('\n');
    line
}

/// Tabs and line breaks inside a value would shift columns or split the line.
fn clean_field(value: &str) -> String {
    value.replace(['\t', '\r', '\n'], " ")
}

/// [`TermSource`] over the terminology MySQL schema
pub struct MySqlTermSource {
    pool: MySqlPool,
}

impl MySqlTermSource {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(TermError::Connection)?;

        info!(url = %config.redacted_url(), "Connected to terminology database");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl TermSource for MySqlTermSource {
    async fn terms(&self, job_ids: &[i64]) -> Result<Vec<TermRecord>> {
        let mut query = QueryBuilder::<MySql>::new(
            "SELECT CAST(TermID AS SIGNED) AS TermID, Term, ContentType, NewTo FROM TermList WHERE JobID IN (",
        );
        let mut ids = query.separated(", ");
        for id in job_ids {
            ids.push_bind(*id);
        }
        query.push(") ORDER BY Term ASC");

        let terms = query
            .build_query_as::<TermRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(terms)
    }

    async fn contexts(&self, term_id: i64, limit: u32) -> Result<Vec<Option<String>>> {
        let contexts = sqlx::query_scalar::<_, Option<String>>(
            "SELECT SourceContext FROM TermContexts WHERE TermTranslationID = ? LIMIT ?",
        )
        .bind(term_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(contexts)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StaticTermSource {
        terms: Vec<(i64, TermRecord)>,
        contexts: HashMap<i64, Vec<Option<String>>>,
        limits_seen: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl TermSource for StaticTermSource {
        async fn terms(&self, job_ids: &[i64]) -> Result<Vec<TermRecord>> {
            let mut terms: Vec<_> = self
                .terms
                .iter()
                .filter(|(job, _)| job_ids.contains(job))
                .map(|(_, term)| term.clone())
                .collect();
            terms.sort_by(|a, b| a.term.cmp(&b.term));
            Ok(terms)
        }

        async fn contexts(&self, term_id: i64, limit: u32) -> Result<Vec<Option<String>>> {
            self.limits_seen.lock().unwrap().push(limit);
            let all = self.contexts.get(&term_id).cloned().unwrap_or_default();
            Ok(all.into_iter().take(limit as usize).collect())
        }
    }

    fn term(id: i64, text: &str) -> TermRecord {
        TermRecord {
            term_id: id,
            term: Some(text.to_string()),
            content_type: Some("Software".to_string()),
            new_to: Some("2014".to_string()),
        }
    }

    #[test]
    fn test_format_line_layout() {
        let contexts = [Some("Open the viewport".to_string()), Some("Close it".to_string())];
        let line = format_line(&term(1, "viewport"), &contexts);
        assert_eq!(line, "viewport\t \tSoftware\t2014\tOpen the viewport\tClose it\n");
    }

    #[test]
    fn test_format_line_without_contexts_and_nulls() {
        let record = TermRecord {
            term_id: 7,
            term: Some("layer".to_string()),
            content_type: None,
            new_to: None,
        };
        assert_eq!(format_line(&record, &[]), "layer\t \t\t\n");
    }

    #[test]
    fn test_format_line_flattens_embedded_separators() {
        let line = format_line(&term(1, "a\tb"), &[Some("line one\nline two".to_string())]);
        assert_eq!(line, "a b\t \tSoftware\t2014\tline one line two\n");
    }

    #[tokio::test]
    async fn test_export_filters_jobs_and_orders_terms() {
        let source = StaticTermSource {
            terms: vec![
                (280, term(2, "spline")),
                (292, term(3, "extrude")),
                (300, term(4, "ignored")),
            ],
            contexts: HashMap::from([(2, vec![Some("Draw a spline".to_string())])]),
            ..StaticTermSource::default()
        };
        let config = ExportConfig::new(vec![280, 292], 20).unwrap();
        let mut out = Vec::new();

        let summary = export_terms(&source, &config, &mut out).await.unwrap();

        assert_eq!(summary, ExportSummary { terms: 2, contexts: 1 });
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "extrude\t \tSoftware\t2014\nspline\t \tSoftware\t2014\tDraw a spline\n"
        );
    }

    #[tokio::test]
    async fn test_export_passes_context_limit() {
        let source = StaticTermSource {
            terms: vec![(1, term(9, "mesh"))],
            contexts: HashMap::from([(9, (0..5).map(|i| Some(format!("ctx {i}"))).collect())]),
            ..StaticTermSource::default()
        };
        let config = ExportConfig::new(vec![1], 2).unwrap();
        let mut out = Vec::new();

        let summary = export_terms(&source, &config, &mut out).await.unwrap();

        assert_eq!(summary.contexts, 2);
        assert_eq!(*source.limits_seen.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_null_term_and_context_are_written_empty() {
        let untitled = TermRecord {
            term_id: 5,
            term: None,
            content_type: None,
            new_to: Some("2016".to_string()),
        };
        let source = StaticTermSource {
            terms: vec![(280, untitled), (280, term(6, "spline"))],
            contexts: HashMap::from([
                (5, vec![None, Some("Rotate the view".to_string())]),
                (6, vec![Some("Draw a spline".to_string()), None]),
            ]),
            ..StaticTermSource::default()
        };
        let config = ExportConfig::new(vec![280], 20).unwrap();
        let mut out = Vec::new();

        let summary = export_terms(&source, &config, &mut out).await.unwrap();

        assert_eq!(summary, ExportSummary { terms: 2, contexts: 4 });
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\t \t\t2016\t\tRotate the view\nspline\t \tSoftware\t2014\tDraw a spline\t\n"
        );
    }

    #[test]
    fn test_empty_job_list_rejected() {
        assert!(matches!(ExportConfig::new(vec![], 20), Err(TermError::Config(_))));
    }
}
