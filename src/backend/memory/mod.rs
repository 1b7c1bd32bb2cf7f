//! In-process backend.
//!
//! Implements every capability trait on top of ordered in-memory maps. Databases are created
//! from the same DDL text a real backend would receive, rows are kept in primary-key order,
//! and reads see a consistent snapshot because they are evaluated under the database lock.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{
    BackendClient, BatchWriter, Database, Instance, KeySet, ReadSession, RowStream, SnapshotReader,
};
use crate::error::SpannerDbError;
use crate::schema::{ColumnType, IndexSchema, TableSchema};
use crate::types::RowValues;

mod ddl;
mod query;

type Tables = HashMap<String, MemoryTable>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        // a panicking test must not wedge every other handle
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Client over in-memory instances. Instances spring into existence on first lookup.
#[derive(Debug)]
pub struct MemoryClient {
    project: String,
    instances: Mutex<HashMap<String, Arc<MemoryInstance>>>,
    instance_lookups: AtomicUsize,
}

impl MemoryClient {
    #[must_use]
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            instances: Mutex::new(HashMap::new()),
            instance_lookups: AtomicUsize::new(0),
        }
    }

    /// Concrete handle to an instance, creating it if needed.
    #[must_use]
    pub fn memory_instance(&self, instance_id: &str) -> Arc<MemoryInstance> {
        let mut instances = lock(&self.instances);
        Arc::clone(
            instances
                .entry(instance_id.to_string())
                .or_insert_with(|| Arc::new(MemoryInstance::new(instance_id))),
        )
    }

    /// Number of `instance` calls served so far.
    #[must_use]
    pub fn instance_lookups(&self) -> usize {
        self.instance_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendClient for MemoryClient {
    fn project(&self) -> &str {
        &self.project
    }

    async fn instance(&self, instance_id: &str) -> Result<Arc<dyn Instance>, SpannerDbError> {
        self.instance_lookups.fetch_add(1, Ordering::SeqCst);
        let instance: Arc<dyn Instance> = self.memory_instance(instance_id);
        Ok(instance)
    }
}

#[derive(Debug)]
pub struct MemoryInstance {
    id: String,
    databases: Mutex<HashMap<String, Arc<MemoryDatabase>>>,
    database_lookups: AtomicUsize,
}

impl MemoryInstance {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            databases: Mutex::new(HashMap::new()),
            database_lookups: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Concrete handle to a created database.
    #[must_use]
    pub fn memory_database(&self, database_id: &str) -> Option<Arc<MemoryDatabase>> {
        lock(&self.databases).get(database_id).cloned()
    }

    /// Number of `database` calls served so far.
    #[must_use]
    pub fn database_lookups(&self) -> usize {
        self.database_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Instance for MemoryInstance {
    async fn database(&self, database_id: &str) -> Result<Arc<dyn Database>, SpannerDbError> {
        self.database_lookups.fetch_add(1, Ordering::SeqCst);
        let database: Arc<dyn Database> = self.memory_database(database_id).ok_or_else(|| {
            SpannerDbError::NotFound(format!("database {database_id} in instance {}", self.id))
        })?;
        Ok(database)
    }

    async fn create_database(
        &self,
        database_id: &str,
        ddl: &[String],
    ) -> Result<(), SpannerDbError> {
        let mut databases = lock(&self.databases);
        if databases.contains_key(database_id) {
            return Err(SpannerDbError::BackendError(format!(
                "database {database_id} already exists"
            )));
        }
        let mut tables = Tables::new();
        for statement in ddl {
            ddl::apply(&mut tables, statement)?;
        }
        databases.insert(
            database_id.to_string(),
            Arc::new(MemoryDatabase::from_tables(tables)),
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<Tables>>,
    open_sessions: Arc<AtomicUsize>,
}

impl MemoryDatabase {
    fn from_tables(tables: Tables) -> Self {
        Self {
            tables: Arc::new(Mutex::new(tables)),
            open_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sessions opened and not yet closed or dropped.
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    /// Names of all tables, sorted.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.tables).keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl BatchWriter for MemoryDatabase {
    async fn batch_insert(
        &self,
        table: &str,
        columns: &[String],
        rows: Vec<Vec<RowValues>>,
    ) -> Result<(), SpannerDbError> {
        let mut tables = lock(&self.tables);
        let name = query::find_table(&tables, table)?.schema.name.clone();
        let target = tables
            .get_mut(&name)
            .ok_or_else(|| SpannerDbError::NotFound(format!("table {table}")))?;

        let positions = target.projection(columns)?;
        let mut full_rows = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() != positions.len() {
                return Err(SpannerDbError::BackendError(format!(
                    "{} values supplied for {} columns",
                    row.len(),
                    positions.len()
                )));
            }
            let mut full = vec![RowValues::Null; target.schema.columns.len()];
            for (pos, value) in positions.iter().zip(row) {
                full[*pos] = value;
            }
            full_rows.push(full);
        }
        target.insert_rows(full_rows)
    }
}

#[async_trait]
impl SnapshotReader for MemoryDatabase {
    async fn session(&self) -> Result<Box<dyn ReadSession>, SpannerDbError> {
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            tables: Arc::clone(&self.tables),
            open_sessions: Arc::clone(&self.open_sessions),
            closed: false,
        }))
    }
}

struct MemorySession {
    tables: Arc<Mutex<Tables>>,
    open_sessions: Arc<AtomicUsize>,
    closed: bool,
}

impl MemorySession {
    fn ensure_open(&self) -> Result<(), SpannerDbError> {
        if self.closed {
            Err(SpannerDbError::BackendError("session is closed".to_string()))
        } else {
            Ok(())
        }
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open_sessions.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.release();
    }
}

#[async_trait]
impl ReadSession for MemorySession {
    async fn execute_sql(&mut self, sql: &str) -> Result<Box<dyn RowStream>, SpannerDbError> {
        self.ensure_open()?;
        let rows = query::evaluate(&lock(&self.tables), sql)?;
        Ok(Box::new(MemoryRowStream {
            rows: rows.into_iter(),
        }))
    }

    async fn read(
        &mut self,
        table: &str,
        columns: &[String],
        keys: KeySet,
    ) -> Result<Box<dyn RowStream>, SpannerDbError> {
        self.ensure_open()?;
        let tables = lock(&self.tables);
        let target = query::find_table(&tables, table)?;
        let projection = target.projection(columns)?;
        let project = |row: &Vec<RowValues>| -> Vec<RowValues> {
            projection.iter().map(|&i| row[i].clone()).collect()
        };

        let rows: Vec<Vec<RowValues>> = match keys {
            KeySet::All => target.rows.values().map(project).collect(),
            KeySet::Keys(keys) => {
                let wanted: HashSet<Vec<RowValues>> = keys.into_iter().collect();
                target
                    .rows
                    .iter()
                    .filter(|(key, _)| wanted.contains(*key))
                    .map(|(_, row)| project(row))
                    .collect()
            }
        };
        Ok(Box::new(MemoryRowStream {
            rows: rows.into_iter(),
        }))
    }

    async fn close(&mut self) -> Result<(), SpannerDbError> {
        self.release();
        Ok(())
    }
}

struct MemoryRowStream {
    rows: std::vec::IntoIter<Vec<RowValues>>,
}

#[async_trait]
impl RowStream for MemoryRowStream {
    async fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, SpannerDbError> {
        Ok(self.rows.next())
    }
}

#[derive(Debug)]
struct MemoryIndex {
    schema: IndexSchema,
    positions: Vec<usize>,
    unique: bool,
}

/// A table's schema and rows, keyed and ordered by primary key.
#[derive(Debug)]
pub(crate) struct MemoryTable {
    schema: TableSchema,
    key_positions: Vec<usize>,
    indexes: Vec<MemoryIndex>,
    rows: BTreeMap<Vec<RowValues>, Vec<RowValues>>,
}

impl MemoryTable {
    fn new(schema: TableSchema) -> Result<Self, SpannerDbError> {
        let key_positions = schema.key_indices()?;
        Ok(Self {
            schema,
            key_positions,
            indexes: Vec::new(),
            rows: BTreeMap::new(),
        })
    }

    fn add_index(&mut self, schema: IndexSchema, unique: bool) -> Result<(), SpannerDbError> {
        let positions = self.projection(&schema.columns)?;
        self.indexes.push(MemoryIndex {
            schema,
            positions,
            unique,
        });
        Ok(())
    }

    /// Column name lookup is case-insensitive.
    fn column_position(&self, name: &str) -> Result<usize, SpannerDbError> {
        self.schema
            .columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| SpannerDbError::NotFound(format!("column {}.{name}", self.schema.name)))
    }

    /// Positions of `columns`; `*` expands to every column.
    fn projection(&self, columns: &[String]) -> Result<Vec<usize>, SpannerDbError> {
        if columns.len() == 1 && columns[0] == "*" {
            return Ok((0..self.schema.columns.len()).collect());
        }
        columns.iter().map(|c| self.column_position(c)).collect()
    }

    fn check_row(&self, row: &[RowValues]) -> Result<(), SpannerDbError> {
        for (column, value) in self.schema.columns.iter().zip(row) {
            let fits = match (&column.column_type, value) {
                (_, RowValues::Null) => column.nullable,
                (ColumnType::Bool, RowValues::Bool(_)) | (ColumnType::Int64, RowValues::Int(_)) => {
                    true
                }
                (ColumnType::String { max_length }, RowValues::Text(s)) => {
                    max_length.is_none_or(|n| s.chars().count() <= n as usize)
                }
                (ColumnType::Bytes { max_length }, RowValues::Blob(b)) => {
                    max_length.is_none_or(|n| b.len() <= n as usize)
                }
                _ => false,
            };
            if !fits {
                return Err(SpannerDbError::BackendError(format!(
                    "{} value does not fit column {}.{} of type {}",
                    value.kind(),
                    self.schema.name,
                    column.name,
                    column.column_type
                )));
            }
        }
        Ok(())
    }

    fn pick(row: &[RowValues], positions: &[usize]) -> Vec<RowValues> {
        positions.iter().map(|&i| row[i].clone()).collect()
    }

    /// Insert all rows or none.
    fn insert_rows(&mut self, rows: Vec<Vec<RowValues>>) -> Result<(), SpannerDbError> {
        let mut staged: BTreeMap<Vec<RowValues>, Vec<RowValues>> = BTreeMap::new();
        for row in rows {
            self.check_row(&row)?;
            let key = Self::pick(&row, &self.key_positions);
            if self.rows.contains_key(&key) || staged.contains_key(&key) {
                return Err(SpannerDbError::BackendError(format!(
                    "row {key:?} already exists in {}",
                    self.schema.name
                )));
            }
            for index in self.indexes.iter().filter(|i| i.unique) {
                let entry = Self::pick(&row, &index.positions);
                if entry.iter().any(RowValues::is_null) {
                    continue;
                }
                let collides = self
                    .rows
                    .values()
                    .chain(staged.values())
                    .any(|other| Self::pick(other, &index.positions) == entry);
                if collides {
                    return Err(SpannerDbError::BackendError(format!(
                        "unique index {} violated by {entry:?}",
                        index.schema.name
                    )));
                }
            }
            staged.insert(key, row);
        }
        self.rows.extend(staged);
        Ok(())
    }

    #[cfg(test)]
    fn insert_row(&mut self, row: Vec<RowValues>) -> Result<(), SpannerDbError> {
        self.insert_rows(vec![row])
    }
}
