//! Recognizes the small SQL subset the cursor supports.
//!
//! This is deliberately not a SQL parser. Statements are matched against a few ordered
//! patterns: single-row `INSERT INTO t (cols) VALUES (...)` and `SELECT cols FROM t ...`.
//! Everything else is rejected. For SELECT the full statement text is handed to the backend
//! untouched; only the column list and table name are recovered, for cursor metadata.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::SpannerDbError;
use crate::types::RowValues;

mod binder;
mod values;

pub use binder::{ParamBinder, TextualBinder};
pub use values::decode_token;
pub(crate) use values::unquote;

lazy_static! {
    // Values may hold any character, so everything up to the last ')' is taken.
    static ref INSERT_PATTERN: Regex = Regex::new(
        r"(?is)^\s*insert\s*into\s*([a-z0-9_]+)\s*\(([a-z0-9,_\s]*)\)\s*values\s*\((.*)\)"
    )
    .expect("valid regex");
    static ref SELECT_PATTERN: Regex = Regex::new(r"(?is)^\s*select.*").expect("valid regex");
    static ref SELECT_PARTS: Regex =
        Regex::new(r"(?is)^\s*select\s*([a-z0-9_,\s]*)from\s*([a-z0-9_]+)").expect("valid regex");
    static ref COLUMN_NAME: Regex = Regex::new(r"(?i)^\s*([a-z0-9_]*)").expect("valid regex");
}

/// A classified statement, produced fresh for each `execute`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedStatement {
    /// Single-row insert. `values` are the raw, trimmed value tokens (strings still quoted).
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<String>,
    },
    /// Query passed verbatim to the backend.
    Select {
        raw_query: String,
        table: String,
        columns: Vec<String>,
    },
}

impl ParsedStatement {
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            ParsedStatement::Insert { table, .. } | ParsedStatement::Select { table, .. } => table,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        match self {
            ParsedStatement::Insert { columns, .. } | ParsedStatement::Select { columns, .. } => {
                columns
            }
        }
    }
}

/// Substitute `params` with the textual binder, then classify.
///
/// # Errors
/// `ParameterError` if binding fails, `UnsupportedStatement` if the statement is neither a
/// supported INSERT nor SELECT.
pub fn parse_sql(sql: &str, params: &[RowValues]) -> Result<ParsedStatement, SpannerDbError> {
    parse_sql_with(&TextualBinder, sql, params)
}

/// Like [`parse_sql`] with a caller-chosen binder.
///
/// # Errors
/// See [`parse_sql`].
pub fn parse_sql_with(
    binder: &dyn ParamBinder,
    sql: &str,
    params: &[RowValues],
) -> Result<ParsedStatement, SpannerDbError> {
    let bound = binder.bind(sql, params)?;
    classify(&bound)
}

/// Classify an already-bound statement.
///
/// # Errors
/// Returns `SpannerDbError::UnsupportedStatement` carrying `sql` if no pattern applies.
pub fn classify(sql: &str) -> Result<ParsedStatement, SpannerDbError> {
    if let Some(caps) = INSERT_PATTERN.captures(sql) {
        let parsed = ParsedStatement::Insert {
            table: caps[1].to_string(),
            columns: split_trimmed(&caps[2]),
            values: split_trimmed(&caps[3]),
        };
        tracing::debug!(table = parsed.table(), "classified INSERT");
        return Ok(parsed);
    }

    if SELECT_PATTERN.is_match(sql) {
        let parsed = parse_select(sql)?;
        tracing::debug!(table = parsed.table(), "classified SELECT");
        return Ok(parsed);
    }

    Err(SpannerDbError::UnsupportedStatement(sql.to_string()))
}

fn parse_select(sql: &str) -> Result<ParsedStatement, SpannerDbError> {
    let caps = SELECT_PARTS.captures(sql).ok_or_else(|| {
        SpannerDbError::UnsupportedStatement(format!(
            "could not parse columns and table name from query: {sql}"
        ))
    })?;

    let mut columns = Vec::new();
    for token in caps[1].split(',') {
        let name = COLUMN_NAME
            .captures(token)
            .map(|c| c[1].to_string())
            .unwrap_or_default();
        if name.is_empty() {
            return Err(SpannerDbError::UnsupportedStatement(format!(
                "could not parse column name from {token:?} in query: {sql}"
            )));
        }
        columns.push(name);
    }

    Ok(ParsedStatement::Select {
        raw_query: sql.to_string(),
        table: caps[2].to_string(),
        columns,
    })
}

fn split_trimmed(list: &str) -> Vec<String> {
    list.split(',').map(|s| s.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<RowValues> {
        values.iter().copied().map(RowValues::Int).collect()
    }

    #[test]
    fn parses_insert_with_params() {
        let sql = "INSERT INTO EventLogs (rowid, customer_number, run_id, event_log_id, path, offset) \
                   VALUES (?, ?, ?, ?, ?, ?)";
        let mut params = ints(&[1, 2, 3, 4]);
        params.push(RowValues::Text("p".into()));
        params.push(RowValues::Int(5));

        let parsed = parse_sql(sql, &params).unwrap();
        assert_eq!(
            parsed,
            ParsedStatement::Insert {
                table: "EventLogs".into(),
                columns: ["rowid", "customer_number", "run_id", "event_log_id", "path", "offset"]
                    .map(String::from)
                    .to_vec(),
                values: ["1", "2", "3", "4", "\"p\"", "5"].map(String::from).to_vec(),
            }
        );
    }

    #[test]
    fn parses_insert_with_inline_literal() {
        let sql = "insert into EventLogs (rowid, customer_number, run_id, event_log_id, path, offset) \
                   values (?, ?, ?, 0)";
        let params = [
            RowValues::Text("a".into()),
            RowValues::Int(10),
            RowValues::Text("c".into()),
        ];
        match parse_sql(sql, &params).unwrap() {
            ParsedStatement::Insert { values, .. } => {
                assert_eq!(values, vec!["\"a\"", "10", "\"c\"", "0"]);
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[test]
    fn parses_select_and_keeps_raw_query() {
        let sql = "SELECT rowid, customer_number FROM EventLogs WHERE rowid = ? AND event_log_id = ?";
        let parsed = parse_sql(sql, &ints(&[297, 0])).unwrap();
        assert_eq!(
            parsed,
            ParsedStatement::Select {
                raw_query:
                    "SELECT rowid, customer_number FROM EventLogs WHERE rowid = 297 AND event_log_id = 0"
                        .into(),
                table: "EventLogs".into(),
                columns: vec!["rowid".into(), "customer_number".into()],
            }
        );
    }

    #[test]
    fn select_with_string_param_and_lowercase_from() {
        let sql = "SELECT rowid, offset from EventLogs WHERE run_id = ? AND path = ?";
        let parsed = parse_sql(sql, &[RowValues::Int(5), RowValues::Text("b".into())]).unwrap();
        match parsed {
            ParsedStatement::Select {
                raw_query,
                table,
                columns,
            } => {
                assert_eq!(
                    raw_query,
                    "SELECT rowid, offset from EventLogs WHERE run_id = 5 AND path = \"b\""
                );
                assert_eq!(table, "EventLogs");
                assert_eq!(columns, vec!["rowid", "offset"]);
            }
            other => panic!("expected select, got {other:?}"),
        }
    }

    #[test]
    fn multi_line_statements_classify() {
        let sql = "\n  SELECT rowid,\n         path\n  FROM EventLogs\n  WHERE rowid = 1";
        let parsed = classify(sql).unwrap();
        assert_eq!(parsed.table(), "EventLogs");
        assert_eq!(parsed.columns(), ["rowid", "path"]);
    }

    #[test]
    fn update_is_unsupported() {
        let sql = "UPDATE EventLogs SET offset = ? WHERE rowid = ?";
        let err = parse_sql(sql, &ints(&[1, 2])).unwrap_err();
        assert!(matches!(
            err,
            SpannerDbError::UnsupportedStatement(s) if s == "UPDATE EventLogs SET offset = 1 WHERE rowid = 2"
        ));
    }

    #[test]
    fn select_without_table_is_unsupported() {
        for sql in ["SELECT 1 + 1", "SELECT * FROM EventLogs", "SELECT FROM EventLogs"] {
            assert!(
                matches!(classify(sql), Err(SpannerDbError::UnsupportedStatement(_))),
                "{sql}"
            );
        }
    }

    #[test]
    fn comma_inside_value_splits_it() {
        // Known limitation: value tokens are split on every comma.
        let parsed = classify("INSERT INTO Plugins (plugin_id, name) VALUES (1, \"a,b\")").unwrap();
        match parsed {
            ParsedStatement::Insert { values, .. } => {
                assert_eq!(values, vec!["1", "\"a", "b\""]);
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }
}
