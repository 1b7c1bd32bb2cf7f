use std::collections::HashMap;
use std::sync::LazyLock;

use super::{ColumnSchema, ColumnType, IndexSchema, TableSchema};
use crate::error::SpannerDbError;

static CATALOG: LazyLock<Catalog> = LazyLock::new(|| Catalog::new(tables(), indexes()));

/// The process-wide schema registry.
#[must_use]
pub fn catalog() -> &'static Catalog {
    &CATALOG
}

/// Schema of a registered table.
///
/// # Errors
/// Returns `SpannerDbError::NotFound` if no table with that name is registered.
pub fn get_table(name: &str) -> Result<&'static TableSchema, SpannerDbError> {
    catalog().get_table(name)
}

/// Schema of a registered index.
///
/// # Errors
/// Returns `SpannerDbError::NotFound` if no index with that name is registered.
pub fn get_index(name: &str) -> Result<&'static IndexSchema, SpannerDbError> {
    catalog().get_index(name)
}

/// Immutable set of tables and indexes, with lookup by name.
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: Vec<TableSchema>,
    indexes: Vec<IndexSchema>,
    table_by_name: HashMap<String, usize>,
}

impl Catalog {
    #[must_use]
    pub fn new(tables: Vec<TableSchema>, indexes: Vec<IndexSchema>) -> Self {
        let table_by_name = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        Self {
            tables,
            indexes,
            table_by_name,
        }
    }

    /// Tables in registration order.
    #[must_use]
    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    /// Indexes in registration order.
    #[must_use]
    pub fn indexes(&self) -> &[IndexSchema] {
        &self.indexes
    }

    /// # Errors
    /// Returns `SpannerDbError::NotFound` if the table is not registered.
    pub fn get_table(&self, name: &str) -> Result<&TableSchema, SpannerDbError> {
        self.table_by_name
            .get(name)
            .map(|&i| &self.tables[i])
            .ok_or_else(|| SpannerDbError::NotFound(format!("table {name}")))
    }

    /// # Errors
    /// Returns `SpannerDbError::NotFound` if the index is not registered.
    pub fn get_index(&self, name: &str) -> Result<&IndexSchema, SpannerDbError> {
        self.indexes
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| SpannerDbError::NotFound(format!("index {name}")))
    }

    /// Check every table, and that every index targets declared columns of a declared table.
    ///
    /// # Errors
    /// Returns `SpannerDbError::SchemaError` for the first violation found.
    pub fn validate(&self) -> Result<(), SpannerDbError> {
        for t in &self.tables {
            t.validate()?;
        }
        for index in &self.indexes {
            let table = self.get_table(&index.table_name).map_err(|_| {
                SpannerDbError::SchemaError(format!(
                    "index {} targets unknown table {}",
                    index.name, index.table_name
                ))
            })?;
            for c in &index.columns {
                table.get_column(c).map_err(|_| {
                    SpannerDbError::SchemaError(format!(
                        "index {} uses unknown column {}.{c}",
                        index.name, index.table_name
                    ))
                })?;
            }
        }
        Ok(())
    }
}

fn tables() -> Vec<TableSchema> {
    use ColumnSchema as C;
    use ColumnType::Int64;

    vec![
        TableSchema::new(
            "BigTensors",
            vec![
                C::new("rowid", Int64),
                C::new("customer_number", Int64),
                C::not_null("tag_id", Int64),
                C::not_null("step_count", Int64),
                C::new("tensor", ColumnType::bytes_max()),
            ],
            &["rowid", "customer_number", "tag_id", "step_count"],
        ),
        // Progress of event log files being loaded into the database. `offset` is the byte
        // offset after the last committed record; rowid packs run_id over event_log_id.
        TableSchema::new(
            "EventLogs",
            vec![
                C::new("rowid", Int64),
                C::new("customer_number", Int64),
                C::not_null("run_id", Int64),
                C::new("event_log_id", Int64),
                C::not_null("path", ColumnType::string(1023)),
                C::not_null("offset", Int64),
            ],
            &["rowid", "customer_number", "run_id", "event_log_id"],
        ),
        TableSchema::new(
            "Experiments",
            vec![
                C::new("customer_number", Int64),
                C::new("experiment_id", Int64),
                C::not_null("name", ColumnType::string(500)),
                C::not_null("description", ColumnType::string(65535)),
            ],
            &["customer_number", "experiment_id"],
        ),
        TableSchema::new(
            "Plugins",
            vec![
                C::new("plugin_id", Int64),
                C::not_null("name", ColumnType::string(255)),
            ],
            &["plugin_id"],
        ),
        // rowid packs experiment_id over run_id.
        TableSchema::new(
            "Runs",
            vec![
                C::new("rowid", Int64),
                C::new("customer_number", Int64),
                C::not_null("experiment_id", Int64),
                C::not_null("run_id", Int64),
                C::not_null("name", ColumnType::string(1900)),
            ],
            &["rowid", "customer_number", "experiment_id", "run_id"],
        ),
        TableSchema::new(
            "Tags",
            vec![
                C::new("rowid", Int64),
                C::new("customer_number", Int64),
                C::not_null("run_id", Int64),
                C::not_null("tag_id", Int64),
                C::not_null("plugin_id", Int64),
                C::new("name", ColumnType::string(500)),
                C::new("display_name", ColumnType::string(500)),
                C::new("summary_description", ColumnType::string(65535)),
            ],
            &["rowid", "customer_number", "run_id", "tag_id"],
        ),
        TableSchema::new(
            "Tensors",
            vec![
                C::new("rowid", Int64),
                C::new("customer_number", Int64),
                C::not_null("tag_id", Int64),
                C::not_null("step_count", Int64),
                C::not_null("encoding", Int64),
                C::not_null("is_big", ColumnType::Bool),
                C::not_null("tensor", ColumnType::bytes_max()),
            ],
            &["rowid", "customer_number", "tag_id", "step_count"],
        ),
    ]
}

fn indexes() -> Vec<IndexSchema> {
    vec![
        IndexSchema::new("ExperimentsNameIndex", "Experiments", &["customer_number", "name"]),
        IndexSchema::new(
            "EventLogsPathIndex",
            "EventLogs",
            &["customer_number", "run_id", "path"],
        ),
        IndexSchema::new("PluginsNameIndex", "Plugins", &["name"]),
        IndexSchema::new("RunsIdIndex", "Runs", &["customer_number", "run_id"]),
        IndexSchema::new(
            "RunsNameIndex",
            "Runs",
            &["customer_number", "experiment_id", "name"],
        ),
        IndexSchema::new("TagsIdIndex", "Tags", &["customer_number", "tag_id"]),
        IndexSchema::new("TagsNameIndex", "Tags", &["customer_number", "run_id", "name"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_consistent() {
        catalog().validate().unwrap();
    }

    #[test]
    fn registry_contents() {
        let names: Vec<&str> = catalog().tables().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "BigTensors",
                "EventLogs",
                "Experiments",
                "Plugins",
                "Runs",
                "Tags",
                "Tensors"
            ]
        );
        assert_eq!(catalog().indexes().len(), 7);

        let event_logs = get_table("EventLogs").unwrap();
        assert_eq!(
            event_logs.key_columns,
            vec!["rowid", "customer_number", "run_id", "event_log_id"]
        );
        assert_eq!(
            event_logs.get_column("path").unwrap().column_type,
            ColumnType::string(1023)
        );
        assert!(!event_logs.get_column("offset").unwrap().nullable);
        assert!(event_logs.get_column("event_log_id").unwrap().nullable);
    }

    #[test]
    fn unknown_names_are_not_found() {
        assert!(matches!(get_table("Nope"), Err(SpannerDbError::NotFound(_))));
        assert!(matches!(get_index("NopeIndex"), Err(SpannerDbError::NotFound(_))));
        assert_eq!(get_index("RunsIdIndex").unwrap().table_name, "Runs");
    }

    #[test]
    fn validate_catches_dangling_index() {
        let bad = Catalog::new(
            catalog().tables().to_vec(),
            vec![IndexSchema::new("Dangling", "Ghosts", &["id"])],
        );
        assert!(matches!(bad.validate(), Err(SpannerDbError::SchemaError(_))));
    }
}
