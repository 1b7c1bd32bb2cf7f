//! Backend-independent description of the database schema.
//!
//! Tables and indexes are declared once as code (see [`catalog`]) and never mutated; the DDL
//! generator and the cursor only ever read them.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::SpannerDbError;

pub mod catalog;

pub use catalog::{Catalog, catalog, get_index, get_table};

/// Storage domain of a column.
///
/// `max_length` of `None` means the maximum the backend allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Bool,
    Bytes { max_length: Option<u32> },
    Int64,
    String { max_length: Option<u32> },
}

impl ColumnType {
    #[must_use]
    pub const fn bytes(max_length: u32) -> Self {
        ColumnType::Bytes {
            max_length: Some(max_length),
        }
    }

    #[must_use]
    pub const fn bytes_max() -> Self {
        ColumnType::Bytes { max_length: None }
    }

    #[must_use]
    pub const fn string(max_length: u32) -> Self {
        ColumnType::String {
            max_length: Some(max_length),
        }
    }

    #[must_use]
    pub const fn string_max() -> Self {
        ColumnType::String { max_length: None }
    }
}

/// Renders the backend type name, e.g. `STRING(1023)` or `BYTES(MAX)`.
impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Bool => f.write_str("BOOL"),
            ColumnType::Bytes { max_length } => sized(f, "BYTES", max_length),
            ColumnType::Int64 => f.write_str("INT64"),
            ColumnType::String { max_length } => sized(f, "STRING", max_length),
        }
    }
}

fn sized(f: &mut fmt::Formatter<'_>, name: &str, max_length: &Option<u32>) -> fmt::Result {
    match max_length {
        Some(n) => write!(f, "{name}({n})"),
        None => write!(f, "{name}(MAX)"),
    }
}

lazy_static! {
    static ref SIZED_TYPE: Regex =
        Regex::new(r"(?i)^(STRING|BYTES)\s*\(\s*(MAX|[0-9]+)\s*\)$").expect("valid regex");
}

impl FromStr for ColumnType {
    type Err = SpannerDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("BOOL") {
            return Ok(ColumnType::Bool);
        }
        if s.eq_ignore_ascii_case("INT64") {
            return Ok(ColumnType::Int64);
        }
        let caps = SIZED_TYPE
            .captures(s)
            .ok_or_else(|| SpannerDbError::UnsupportedColumnType(s.to_string()))?;
        let max_length = if caps[2].eq_ignore_ascii_case("MAX") {
            None
        } else {
            let n: u32 = caps[2]
                .parse()
                .map_err(|_| SpannerDbError::UnsupportedColumnType(s.to_string()))?;
            if n == 0 {
                return Err(SpannerDbError::UnsupportedColumnType(s.to_string()));
            }
            Some(n)
        };
        if caps[1].eq_ignore_ascii_case("STRING") {
            Ok(ColumnType::String { max_length })
        } else {
            Ok(ColumnType::Bytes { max_length })
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl ColumnSchema {
    /// A nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
        }
    }

    /// A column that must always hold a value.
    #[must_use]
    pub fn not_null(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            nullable: false,
            ..Self::new(name, column_type)
        }
    }
}

/// A table: ordered columns plus the ordered composite primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub key_columns: Vec<String>,
}

impl TableSchema {
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSchema>, key_columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns,
            key_columns: key_columns.iter().map(|k| (*k).to_string()).collect(),
        }
    }

    /// Look up a column by name.
    ///
    /// # Errors
    /// Returns `SpannerDbError::NotFound` if the table has no such column.
    pub fn get_column(&self, name: &str) -> Result<&ColumnSchema, SpannerDbError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| SpannerDbError::NotFound(format!("column {}.{name}", self.name)))
    }

    /// Position of a column in declaration order.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Positions of the key columns, in key order.
    ///
    /// # Errors
    /// Returns `SpannerDbError::SchemaError` if a key column is not declared.
    pub fn key_indices(&self) -> Result<Vec<usize>, SpannerDbError> {
        self.key_columns
            .iter()
            .map(|k| {
                self.column_index(k).ok_or_else(|| {
                    SpannerDbError::SchemaError(format!(
                        "key column {k} is not a column of {}",
                        self.name
                    ))
                })
            })
            .collect()
    }

    /// Check that column names are unique and every key column exists.
    ///
    /// # Errors
    /// Returns `SpannerDbError::SchemaError` describing the first violation.
    pub fn validate(&self) -> Result<(), SpannerDbError> {
        let mut seen = HashSet::new();
        for c in &self.columns {
            if !seen.insert(c.name.as_str()) {
                return Err(SpannerDbError::SchemaError(format!(
                    "duplicate column {} in {}",
                    c.name, self.name
                )));
            }
        }
        if self.key_columns.is_empty() {
            return Err(SpannerDbError::SchemaError(format!(
                "table {} has no key columns",
                self.name
            )));
        }
        self.key_indices().map(|_| ())
    }
}

/// A unique secondary index over columns of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    pub name: String,
    pub table_name: String,
    pub columns: Vec<String>,
}

impl IndexSchema {
    #[must_use]
    pub fn new(name: impl Into<String>, table_name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            table_name: table_name.into(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}
