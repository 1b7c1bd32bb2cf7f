use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use super::MemoryTable;
use crate::error::SpannerDbError;
use crate::schema::{ColumnSchema, ColumnType, IndexSchema, TableSchema};

lazy_static! {
    static ref CREATE_TABLE: Regex = Regex::new(
        r"(?is)^\s*create\s+table\s+([a-z0-9_]+)\s*\((.*)\)\s*primary\s+key\s*\(([^)]*)\)\s*;?\s*$"
    )
    .expect("valid regex");
    static ref CREATE_INDEX: Regex = Regex::new(
        r"(?is)^\s*create\s+(unique\s+)?index\s+([a-z0-9_]+)\s+on\s+([a-z0-9_]+)\s*\(([^)]*)\)\s*;?\s*$"
    )
    .expect("valid regex");
    static ref COLUMN_DEF: Regex =
        Regex::new(r"(?is)^\s*([a-z0-9_]+)\s+(.+?)(\s+not\s+null)?\s*$").expect("valid regex");
}

/// Apply one `CREATE TABLE` or `CREATE [UNIQUE] INDEX` statement.
pub(super) fn apply(
    tables: &mut HashMap<String, MemoryTable>,
    statement: &str,
) -> Result<(), SpannerDbError> {
    if let Some(caps) = CREATE_TABLE.captures(statement) {
        let name = caps[1].to_string();
        if tables.contains_key(&name) {
            return Err(SpannerDbError::BackendError(format!("duplicate table name {name}")));
        }
        let mut columns = Vec::new();
        for def in caps[2].split(',') {
            columns.push(parse_column(def)?);
        }
        let keys: Vec<&str> = caps[3].split(',').map(str::trim).collect();
        let schema = TableSchema::new(name.clone(), columns, &keys);
        schema.validate()?;
        tables.insert(name, MemoryTable::new(schema)?);
        return Ok(());
    }

    if let Some(caps) = CREATE_INDEX.captures(statement) {
        let unique = caps.get(1).is_some();
        let table_name = &caps[3];
        let table = tables.get_mut(table_name).ok_or_else(|| {
            SpannerDbError::BackendError(format!("index target table {table_name} not found"))
        })?;
        let columns: Vec<&str> = caps[4].split(',').map(str::trim).collect();
        table.add_index(IndexSchema::new(&caps[2], table_name, &columns), unique)?;
        return Ok(());
    }

    Err(SpannerDbError::BackendError(format!(
        "unsupported DDL statement: {statement}"
    )))
}

fn parse_column(def: &str) -> Result<ColumnSchema, SpannerDbError> {
    let caps = COLUMN_DEF
        .captures(def)
        .ok_or_else(|| SpannerDbError::BackendError(format!("malformed column definition: {def}")))?;
    let column_type: ColumnType = caps[2].parse()?;
    if caps.get(3).is_some() {
        Ok(ColumnSchema::not_null(&caps[1], column_type))
    } else {
        Ok(ColumnSchema::new(&caps[1], column_type))
    }
}
