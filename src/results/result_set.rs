use std::collections::HashMap;
use std::sync::Arc;

use super::row::{SpannerRow, index_columns};
use crate::types::RowValues;

/// Describes one result column.
///
/// Only `name` is populated. The remaining fields mirror the conventional seven-field column
/// descriptor and are always `None`: the backend does not report them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    pub name: String,
    pub type_code: Option<String>,
    pub display_size: Option<usize>,
    pub internal_size: Option<usize>,
    pub precision: Option<usize>,
    pub scale: Option<usize>,
    pub null_ok: Option<bool>,
}

impl ColumnDescription {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_code: None,
            display_size: None,
            internal_size: None,
            precision: None,
            scale: None,
            null_ok: None,
        }
    }
}

/// A fully materialized query result.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<SpannerRow>,
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// An empty result set whose rows will carry `column_names`.
    #[must_use]
    pub fn with_columns(column_names: Vec<String>, capacity: usize) -> Self {
        let column_index = Arc::new(index_columns(&column_names));
        Self {
            results: Vec::with_capacity(capacity),
            column_names: Arc::new(column_names),
            column_index,
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Append a row. Values are expected in column order.
    pub fn add_row_values(&mut self, values: Vec<RowValues>) {
        self.results.push(SpannerRow::with_index(
            Arc::clone(&self.column_names),
            Arc::clone(&self.column_index),
            values,
        ));
    }

    /// One description per column, in column order.
    #[must_use]
    pub fn description(&self) -> Vec<ColumnDescription> {
        self.column_names
            .iter()
            .map(ColumnDescription::named)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
