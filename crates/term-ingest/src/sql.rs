//! Multi-row INSERT construction for the n-gram loader
//!
//! Values are inlined as MySQL string literals instead of bound parameters:
//! a 25,000-row batch would exceed the 65,535 placeholder limit of a
//! prepared statement. Every value therefore goes through
//! [`escape_literal`] exactly once, when the statement is built.

use regex::Regex;
use std::sync::LazyLock;
use term_common::{Result, TermError};

/// Default target table, as used by the terminology database.
pub const DEFAULT_TABLE: &str = "nGrams";

/// Default target column.
pub const DEFAULT_COLUMN: &str = "nGram";

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// Escape text for use inside a single-quoted MySQL string literal.
///
/// Quotes are doubled and backslashes are escaped, so the literal reads back
/// as the original text.
pub fn escape_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        match c {
            '\'' => escaped.push_str("''"),
            '\\' => escaped.push_str("\\\\"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Inverse of [`escape_literal`].
pub fn unescape_literal(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                unescaped.push('\'');
            }
            '\\' if chars.peek() == Some(&'\\') => {
                chars.next();
                unescaped.push('\\');
            }
            other => unescaped.push(other),
        }
    }
    unescaped
}

/// Table and column a batch is inserted into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertTarget {
    table: String,
    column: String,
}

impl InsertTarget {
    /// Both names must be plain identifiers; they are quoted, not escaped.
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Result<Self> {
        let table = table.into();
        let column = column.into();

        for name in [&table, &column] {
            if !IDENTIFIER.is_match(name) {
                return Err(TermError::Config(format!("Invalid SQL identifier: {name:?}")));
            }
        }

        Ok(Self { table, column })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Build one `INSERT ... VALUES (...), (...)` for the whole batch.
    ///
    /// Returns `None` for an empty batch, which must not be submitted.
    pub fn build<S: AsRef<str>>(&self, records: &[S]) -> Option<String> {
        if records.is_empty() {
            return None;
        }

        let values_len: usize = records.iter().map(|r| r.as_ref().len() + 6).sum();
        let mut sql = format!("INSERT INTO `{}` (`{}`) VALUES ", self.table, self.column);
        sql.reserve(values_len);

        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str("('");
            sql.push_str(&escape_literal(record.as_ref()));
            sql.push_str("')");
        }

        Some(sql)
    }
}

impl Default for InsertTarget {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            column: DEFAULT_COLUMN.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_quote_and_backslash() {
        assert_eq!(escape_literal("d'e"), "d''e");
        assert_eq!(escape_literal("f\\g"), "f\\\\g");
        assert_eq!(escape_literal("plain n-gram"), "plain n-gram");
    }

    #[test]
    fn test_escape_round_trip() {
        for original in ["it's a \\path\\", "''", "\\'", "", "naïve ümlaut's"] {
            assert_eq!(unescape_literal(&escape_literal(original)), original);
        }
    }

    #[test]
    fn test_build_multi_row_insert() {
        let target = InsertTarget::default();
        let sql = target.build(&["abc", "d'e"]).unwrap();
        assert_eq!(sql, "INSERT INTO `nGrams` (`nGram`) VALUES ('abc'), ('d''e')");
    }

    #[test]
    fn test_build_empty_batch_is_none() {
        let target = InsertTarget::default();
        assert!(target.build::<&str>(&[]).is_none());
    }

    #[test]
    fn test_custom_target() {
        let target = InsertTarget::new("nGramsCIV3D", "nGram").unwrap();
        let sql = target.build(&[String::from("x\\y")]).unwrap();
        assert_eq!(sql, "INSERT INTO `nGramsCIV3D` (`nGram`) VALUES ('x\\\\y')");
    }

    #[test]
    fn test_rejects_non_identifiers() {
        assert!(InsertTarget::new("nGrams; DROP TABLE x", "nGram").is_err());
        assert!(InsertTarget::new("nGrams", "n`Gram").is_err());
        assert!(InsertTarget::new("1table", "nGram").is_err());
    }
}
