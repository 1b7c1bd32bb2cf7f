use crate::backend::Instance;
use crate::error::SpannerDbError;
use crate::schema::{ColumnType, IndexSchema, TableSchema, catalog};

/// Backend type name for a column type.
///
/// The match is exhaustive on purpose: a new `ColumnType` variant does not compile until it
/// is mapped here.
#[must_use]
pub fn to_backend_type(column_type: &ColumnType) -> String {
    match column_type {
        ColumnType::Bool => "BOOL".to_string(),
        ColumnType::Bytes {
            max_length: Some(n),
        } => format!("BYTES({n})"),
        ColumnType::Bytes { max_length: None } => "BYTES(MAX)".to_string(),
        ColumnType::Int64 => "INT64".to_string(),
        ColumnType::String {
            max_length: Some(n),
        } => format!("STRING({n})"),
        ColumnType::String { max_length: None } => "STRING(MAX)".to_string(),
    }
}

/// `CREATE TABLE` statement, keeping column and key order as declared.
#[must_use]
pub fn table_to_ddl(table: &TableSchema) -> String {
    let columns = table
        .columns
        .iter()
        .map(|c| format!("{} {}", c.name, to_backend_type(&c.column_type)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE {} ({columns}) PRIMARY KEY ({})",
        table.name,
        table.key_columns.join(", ")
    )
}

/// `CREATE UNIQUE INDEX` statement.
#[must_use]
pub fn index_to_ddl(index: &IndexSchema) -> String {
    format!(
        "CREATE UNIQUE INDEX {} ON {} ({})",
        index.name,
        index.table_name,
        index.columns.join(", ")
    )
}

/// DDL for the whole registry: every table, then every index.
#[must_use]
pub fn database_ddl() -> Vec<String> {
    let registry = catalog();
    registry
        .tables()
        .iter()
        .map(table_to_ddl)
        .chain(registry.indexes().iter().map(index_to_ddl))
        .collect()
}

/// Provision `database_id` on `instance` with the registry's tables and indexes.
///
/// Failures are logged and returned as-is; retrying is left to the backend client.
///
/// # Errors
/// Returns whatever error the instance reports while creating the database.
pub async fn create_database(
    instance: &dyn Instance,
    database_id: &str,
) -> Result<(), SpannerDbError> {
    let ddl = database_ddl();
    tracing::info!(database = database_id, statements = ddl.len(), "creating database");
    match instance.create_database(database_id, &ddl).await {
        Ok(()) => {
            tracing::info!(database = database_id, "database created");
            Ok(())
        }
        Err(err) => {
            tracing::error!(database = database_id, error = %err, "there was a problem creating the database");
            Err(err)
        }
    }
}
