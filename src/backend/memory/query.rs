use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use super::MemoryTable;
use crate::error::SpannerDbError;
use crate::translation::unquote;
use crate::types::RowValues;

lazy_static! {
    static ref QUERY: Regex = Regex::new(
        r"(?is)^\s*select\s+(.+?)\s+from\s+([a-z0-9_]+)(?:\s+where\s+(.+?))?\s*;?\s*$"
    )
    .expect("valid regex");
    static ref PREDICATE: Regex = Regex::new(
        r#"(?is)^\s*([a-z0-9_]+)\s*=\s*("[^"]*"|'[^']*'|-?[0-9]+|true|false|null)\s*"#
    )
    .expect("valid regex");
    static ref AND: Regex = Regex::new(r"(?i)^and\s+").expect("valid regex");
}

/// Evaluate `SELECT <cols> FROM <table> [WHERE <col> = <literal> [AND ...]]`.
pub(super) fn evaluate(
    tables: &HashMap<String, MemoryTable>,
    sql: &str,
) -> Result<Vec<Vec<RowValues>>, SpannerDbError> {
    let caps = QUERY.captures(sql).ok_or_else(|| unsupported(sql))?;
    let table = find_table(tables, &caps[2])?;

    let projection = table.projection(
        &caps[1]
            .split(',')
            .map(|c| c.trim().to_string())
            .collect::<Vec<_>>(),
    )?;

    let mut predicates = Vec::new();
    if let Some(clause) = caps.get(3) {
        let mut rest = clause.as_str();
        loop {
            let pred = PREDICATE.captures(rest).ok_or_else(|| unsupported(sql))?;
            let column = table.column_position(&pred[1])?;
            predicates.push((column, literal(&pred[2])?));

            let consumed = pred.get(0).map_or(rest.len(), |m| m.end());
            rest = &rest[consumed..];
            if rest.trim().is_empty() {
                break;
            }
            let and = AND.find(rest).ok_or_else(|| unsupported(sql))?;
            rest = &rest[and.end()..];
        }
    }

    Ok(table
        .rows
        .values()
        .filter(|row| predicates.iter().all(|(idx, want)| matches(&row[*idx], want)))
        .map(|row| projection.iter().map(|&i| row[i].clone()).collect())
        .collect())
}

/// Table lookup is case-insensitive, like the backend's.
pub(super) fn find_table<'a>(
    tables: &'a HashMap<String, MemoryTable>,
    name: &str,
) -> Result<&'a MemoryTable, SpannerDbError> {
    tables
        .get(name)
        .or_else(|| {
            tables
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, t)| t)
        })
        .ok_or_else(|| SpannerDbError::NotFound(format!("table {name}")))
}

fn literal(token: &str) -> Result<RowValues, SpannerDbError> {
    if let Some(s) = unquote(token) {
        return Ok(RowValues::Text(s.to_string()));
    }
    if token.eq_ignore_ascii_case("true") {
        return Ok(RowValues::Bool(true));
    }
    if token.eq_ignore_ascii_case("false") {
        return Ok(RowValues::Bool(false));
    }
    if token.eq_ignore_ascii_case("null") {
        return Ok(RowValues::Null);
    }
    token
        .parse()
        .map(RowValues::Int)
        .map_err(|_| SpannerDbError::BackendError(format!("bad literal {token}")))
}

// `col = NULL` is never true.
fn matches(stored: &RowValues, want: &RowValues) -> bool {
    match (stored, want) {
        (_, RowValues::Null) | (RowValues::Null, _) => false,
        (RowValues::Blob(b), RowValues::Text(s)) => b.as_slice() == s.as_bytes(),
        (a, b) => a == b,
    }
}

fn unsupported(sql: &str) -> SpannerDbError {
    SpannerDbError::BackendError(format!("in-memory backend can not evaluate query: {sql}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> HashMap<String, MemoryTable> {
        let mut tables = HashMap::new();
        super::super::ddl::apply(
            &mut tables,
            "CREATE TABLE T (id INT64, name STRING(MAX), ok BOOL) PRIMARY KEY (id)",
        )
        .unwrap();
        let t = tables.get_mut("T").unwrap();
        for (id, name, ok) in [(2, "b", false), (1, "a", true), (3, "a", true)] {
            t.insert_row(vec![
                RowValues::Int(id),
                RowValues::Text(name.into()),
                RowValues::Bool(ok),
            ])
            .unwrap();
        }
        tables
    }

    #[test]
    fn filters_and_projects_in_key_order() {
        let rows = evaluate(&tables(), "SELECT id FROM T WHERE name = \"a\" AND ok = true").unwrap();
        assert_eq!(rows, vec![vec![RowValues::Int(1)], vec![RowValues::Int(3)]]);

        let all = evaluate(&tables(), "select name, id from t").unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], vec![RowValues::Text("a".into()), RowValues::Int(1)]);
    }

    #[test]
    fn null_literal_matches_nothing() {
        let rows = evaluate(&tables(), "SELECT id FROM T WHERE name = NULL").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn unknown_names_and_shapes_fail() {
        let t = tables();
        assert!(matches!(
            evaluate(&t, "SELECT id FROM Nope"),
            Err(SpannerDbError::NotFound(_))
        ));
        assert!(matches!(
            evaluate(&t, "SELECT ghost FROM T"),
            Err(SpannerDbError::NotFound(_))
        ));
        assert!(evaluate(&t, "SELECT id FROM T WHERE id > 1").is_err());
        assert!(evaluate(&t, "SELECT id FROM T WHERE id = 1 OR id = 2").is_err());
    }
}
