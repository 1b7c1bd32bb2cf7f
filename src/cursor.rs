//! Cursor over a backend database.
//!
//! A cursor owns its buffered result set and read position exclusively. INSERT statements
//! become a one-row atomic batch; SELECT statements run against a fresh read session and the
//! entire result is pulled into memory before `execute` returns.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::{Database, ReadSession};
use crate::config::DEFAULT_ARRAYSIZE;
use crate::error::SpannerDbError;
use crate::results::{ColumnDescription, ResultSet, SpannerRow};
use crate::schema::get_table;
use crate::translation::{
    ParamBinder, ParsedStatement, TextualBinder, decode_token, parse_sql_with,
};
use crate::types::RowValues;

pub struct Cursor {
    database: Arc<dyn Database>,
    binder: Arc<dyn ParamBinder>,
    results: ResultSet,
    position: usize,
    description: Vec<ColumnDescription>,
    session: Option<Box<dyn ReadSession>>,
    arraysize: usize,
    closed: bool,
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("rows", &self.results.len())
            .field("position", &self.position)
            .field("arraysize", &self.arraysize)
            .field("has_session", &self.session.is_some())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Cursor {
    /// A cursor using the textual parameter binder and the default array size.
    #[must_use]
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self {
            database,
            binder: Arc::new(TextualBinder),
            results: ResultSet::default(),
            position: 0,
            description: Vec::new(),
            session: None,
            arraysize: DEFAULT_ARRAYSIZE,
            closed: false,
        }
    }

    /// Replace the parameter binder.
    #[must_use]
    pub fn with_binder(mut self, binder: Arc<dyn ParamBinder>) -> Self {
        self.binder = binder;
        self
    }

    #[must_use]
    pub fn with_arraysize(mut self, arraysize: usize) -> Self {
        self.arraysize = arraysize;
        self
    }

    /// Rows returned by `fetch_many(None)`.
    #[must_use]
    pub fn arraysize(&self) -> usize {
        self.arraysize
    }

    pub fn set_arraysize(&mut self, arraysize: usize) {
        self.arraysize = arraysize;
    }

    fn ensure_open(&self) -> Result<(), SpannerDbError> {
        if self.closed {
            Err(SpannerDbError::CursorError("cursor is closed".to_string()))
        } else {
            Ok(())
        }
    }

    /// Execute one statement with positional `?` parameters.
    ///
    /// An INSERT leaves the cursor with no readable rows; a SELECT replaces the buffer with its
    /// full result and rewinds the read position.
    ///
    /// # Errors
    /// * `UnsupportedStatement` for anything but single-row INSERT or column-list SELECT; the
    ///   cursor state is left untouched.
    /// * `ParameterError` if parameters cannot be bound or values do not fit their columns.
    /// * `NotFound` if an INSERT names an unregistered table or column.
    /// * Backend failures as reported by the backend.
    pub async fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<(), SpannerDbError> {
        self.ensure_open()?;

        let parsed = match parse_sql_with(self.binder.as_ref(), sql, params) {
            Ok(parsed) => parsed,
            Err(err @ SpannerDbError::UnsupportedStatement(_)) => {
                warn!(error = %err, "rejected statement");
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        match parsed {
            ParsedStatement::Insert {
                table,
                columns,
                values,
            } => self.insert(&table, columns, &values).await,
            ParsedStatement::Select {
                raw_query,
                table,
                columns,
            } => self.select(&raw_query, &table, columns).await,
        }
    }

    async fn insert(
        &mut self,
        table: &str,
        columns: Vec<String>,
        values: &[String],
    ) -> Result<(), SpannerDbError> {
        let schema = get_table(table)?;
        if columns.len() != values.len() {
            return Err(SpannerDbError::ParameterError(format!(
                "{} columns but {} values for {table}",
                columns.len(),
                values.len()
            )));
        }
        let mut row = Vec::with_capacity(values.len());
        for (column, token) in columns.iter().zip(values) {
            let column = schema.get_column(column)?;
            row.push(decode_token(token, &column.column_type)?);
        }

        self.database
            .batch_insert(&schema.name, &columns, vec![row])
            .await?;
        debug!(table, columns = columns.len(), "inserted row");

        self.results = ResultSet::default();
        self.position = 0;
        self.description.clear();
        Ok(())
    }

    async fn select(
        &mut self,
        raw_query: &str,
        table: &str,
        columns: Vec<String>,
    ) -> Result<(), SpannerDbError> {
        if let Some(mut previous) = self.session.take() {
            previous.close().await?;
        }
        let mut session = self.database.session().await?;
        let mut stream = session.execute_sql(raw_query).await?;
        let rows = stream.consume_all().await?;
        self.session = Some(session);

        let mut results = ResultSet::with_columns(columns, rows.len());
        for row in rows {
            results.add_row_values(row);
        }
        debug!(table, rows = results.len(), "buffered query result");

        self.description = results.description();
        self.results = results;
        self.position = 0;
        Ok(())
    }

    /// Execute `sql` once per parameter set, in order, stopping at the first failure.
    ///
    /// # Errors
    /// The first error returned by [`Cursor::execute`].
    pub async fn execute_many(
        &mut self,
        sql: &str,
        param_sets: &[Vec<RowValues>],
    ) -> Result<(), SpannerDbError> {
        for params in param_sets {
            self.execute(sql, params).await?;
        }
        Ok(())
    }

    /// Next row, or `None` once the buffer is exhausted.
    ///
    /// # Errors
    /// Returns `SpannerDbError::CursorError` if the cursor is closed.
    pub fn fetch_one(&mut self) -> Result<Option<&SpannerRow>, SpannerDbError> {
        self.ensure_open()?;
        let row = self.results.results.get(self.position);
        if row.is_some() {
            self.position += 1;
        }
        Ok(row)
    }

    /// Up to `size` rows (or `arraysize` when `None`) from the current position.
    ///
    /// # Errors
    /// Returns `SpannerDbError::CursorError` if the cursor is closed.
    pub fn fetch_many(&mut self, size: Option<usize>) -> Result<&[SpannerRow], SpannerDbError> {
        self.ensure_open()?;
        let start = self.position;
        let end = start
            .saturating_add(size.unwrap_or(self.arraysize))
            .min(self.results.len());
        self.position = end;
        Ok(&self.results.results[start..end])
    }

    /// Every remaining row; leaves the cursor at the end.
    ///
    /// # Errors
    /// Returns `SpannerDbError::CursorError` if the cursor is closed.
    pub fn fetch_all(&mut self) -> Result<&[SpannerRow], SpannerDbError> {
        self.ensure_open()?;
        let start = self.position;
        self.position = self.results.len();
        Ok(&self.results.results[start..])
    }

    /// Iterate the remaining rows. Iteration and the `fetch_*` calls share one read position.
    ///
    /// # Errors
    /// Returns `SpannerDbError::CursorError` if the cursor is closed.
    pub fn rows(&mut self) -> Result<Rows<'_>, SpannerDbError> {
        self.ensure_open()?;
        Ok(Rows {
            rows: &self.results.results,
            position: &mut self.position,
        })
    }

    /// Number of rows buffered by the last SELECT; 0 after an INSERT.
    #[must_use]
    pub fn rowcount(&self) -> usize {
        self.results.len()
    }

    /// Column descriptions of the last SELECT.
    #[must_use]
    pub fn description(&self) -> &[ColumnDescription] {
        &self.description
    }

    /// Always `None`: the backend has no auto-assigned row ids.
    #[must_use]
    pub fn lastrowid(&self) -> Option<i64> {
        None
    }

    /// Release the open read session, if any. Further calls do nothing.
    ///
    /// # Errors
    /// Propagates a failure to close the backend session.
    pub async fn close(&mut self) -> Result<(), SpannerDbError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.results = ResultSet::default();
        self.position = 0;
        if let Some(mut session) = self.session.take() {
            session.close().await?;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// # Errors
    /// Always `NotImplemented`.
    pub fn execute_script(&mut self, _sql: &str) -> Result<(), SpannerDbError> {
        Err(not_implemented("execute_script"))
    }

    /// # Errors
    /// Always `NotImplemented`.
    pub fn call_proc(&mut self, _name: &str, _params: &[RowValues]) -> Result<(), SpannerDbError> {
        Err(not_implemented("call_proc"))
    }

    /// # Errors
    /// Always `NotImplemented`.
    pub fn next_set(&mut self) -> Result<(), SpannerDbError> {
        Err(not_implemented("next_set"))
    }

    /// # Errors
    /// Always `NotImplemented`.
    pub fn set_input_sizes(&mut self, _sizes: &[usize]) -> Result<(), SpannerDbError> {
        Err(not_implemented("set_input_sizes"))
    }

    /// # Errors
    /// Always `NotImplemented`.
    pub fn set_output_size(
        &mut self,
        _size: usize,
        _column: Option<usize>,
    ) -> Result<(), SpannerDbError> {
        Err(not_implemented("set_output_size"))
    }
}

fn not_implemented(operation: &str) -> SpannerDbError {
    SpannerDbError::NotImplemented(format!("{operation} is not supported by this backend"))
}

/// Iterator returned by [`Cursor::rows`]; advances the cursor's read position.
#[derive(Debug)]
pub struct Rows<'a> {
    rows: &'a [SpannerRow],
    position: &'a mut usize,
}

impl<'a> Iterator for Rows<'a> {
    type Item = &'a SpannerRow;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.get(*self.position)?;
        *self.position += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.rows.len().saturating_sub(*self.position);
        (left, Some(left))
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::backend::Instance;
    use crate::backend::memory::{MemoryDatabase, MemoryInstance};
    use crate::ddl::database_ddl;

    const INSERT_PLUGIN: &str = "INSERT INTO Plugins (plugin_id, name) VALUES (?, ?)";
    const SELECT_PLUGINS: &str = "SELECT plugin_id, name FROM Plugins";

    async fn database() -> Arc<MemoryDatabase> {
        let instance = MemoryInstance::new("inst");
        instance.create_database("db", &database_ddl()).await.unwrap();
        instance.memory_database("db").unwrap()
    }

    async fn seeded(n: i64) -> (Arc<MemoryDatabase>, Cursor) {
        let db = database().await;
        let mut cursor = Cursor::new(db.clone());
        for id in 1..=n {
            cursor
                .execute(INSERT_PLUGIN, &[RowValues::Int(id), format!("p{id}").into()])
                .await
                .unwrap();
        }
        (db, cursor)
    }

    #[tokio::test]
    async fn insert_leaves_nothing_to_fetch() {
        let (_db, mut cursor) = seeded(1).await;
        assert_eq!(cursor.rowcount(), 0);
        assert!(cursor.fetch_one().unwrap().is_none());
        assert!(cursor.description().is_empty());
    }

    #[tokio::test]
    async fn fetch_many_defaults_to_arraysize_and_clamps() {
        let (_db, cursor) = seeded(5).await;
        let mut cursor = cursor.with_arraysize(2);
        cursor.execute(SELECT_PLUGINS, &[]).await.unwrap();

        assert_eq!(cursor.fetch_many(None).unwrap().len(), 2);
        assert_eq!(cursor.fetch_many(Some(10)).unwrap().len(), 3);
        assert!(cursor.fetch_many(Some(1)).unwrap().is_empty());
        assert!(cursor.fetch_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn iteration_shares_the_fetch_position() {
        let (_db, mut cursor) = seeded(3).await;
        cursor.execute(SELECT_PLUGINS, &[]).await.unwrap();

        let first = cursor.fetch_one().unwrap().cloned().unwrap();
        assert_eq!(first.get("plugin_id"), Some(&RowValues::Int(1)));

        let rest: Vec<i64> = cursor
            .rows()
            .unwrap()
            .filter_map(|r| r.get("plugin_id").and_then(RowValues::as_int).copied())
            .collect();
        assert_eq!(rest, vec![2, 3]);
        assert!(cursor.fetch_one().unwrap().is_none());

        // a new execute rewinds
        cursor.execute(SELECT_PLUGINS, &[]).await.unwrap();
        assert_eq!(cursor.rows().unwrap().count(), 3);
    }

    #[tokio::test]
    async fn unsupported_statement_keeps_buffer() {
        let (_db, mut cursor) = seeded(2).await;
        cursor.execute(SELECT_PLUGINS, &[]).await.unwrap();
        cursor.fetch_one().unwrap();

        let err = cursor
            .execute("DELETE FROM Plugins WHERE plugin_id = ?", &[RowValues::Int(1)])
            .await
            .unwrap_err();
        assert!(matches!(err, SpannerDbError::UnsupportedStatement(_)));
        assert_eq!(cursor.rowcount(), 2);
        assert_eq!(cursor.fetch_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn insert_checks_catalog_names() {
        let (_db, mut cursor) = seeded(0).await;
        let missing_table = cursor
            .execute("INSERT INTO Nope (a) VALUES (?)", &[RowValues::Int(1)])
            .await;
        assert!(matches!(missing_table, Err(SpannerDbError::NotFound(_))));

        let missing_column = cursor
            .execute(
                "INSERT INTO Plugins (plugin_id, nope) VALUES (?, ?)",
                &[RowValues::Int(1), RowValues::Int(2)],
            )
            .await;
        assert!(matches!(missing_column, Err(SpannerDbError::NotFound(_))));

        let wrong_type = cursor
            .execute(INSERT_PLUGIN, &["one".into(), "p".into()])
            .await;
        assert!(matches!(wrong_type, Err(SpannerDbError::ParameterError(_))));
    }

    #[tokio::test]
    async fn execute_many_stops_at_first_error() {
        let (db, mut cursor) = seeded(0).await;
        let sets = vec![
            vec![RowValues::Int(1), "a".into()],
            vec![RowValues::Int(1), "dup".into()],
            vec![RowValues::Int(2), "b".into()],
        ];
        assert!(cursor.execute_many(INSERT_PLUGIN, &sets).await.is_err());

        let mut reader = Cursor::new(db);
        reader.execute(SELECT_PLUGINS, &[]).await.unwrap();
        assert_eq!(reader.rowcount(), 1);
    }

    #[tokio::test]
    async fn one_session_per_select_and_close_releases_it() {
        let (db, mut cursor) = seeded(1).await;
        cursor.execute(SELECT_PLUGINS, &[]).await.unwrap();
        cursor.execute(SELECT_PLUGINS, &[]).await.unwrap();
        assert_eq!(db.open_sessions(), 1);

        cursor.close().await.unwrap();
        assert_eq!(db.open_sessions(), 0);
        cursor.close().await.unwrap();

        assert!(matches!(
            cursor.fetch_one(),
            Err(SpannerDbError::CursorError(_))
        ));
        assert!(matches!(
            cursor.execute(SELECT_PLUGINS, &[]).await,
            Err(SpannerDbError::CursorError(_))
        ));
    }

    #[tokio::test]
    async fn unsupported_operations() {
        let (_db, mut cursor) = seeded(0).await;
        assert!(matches!(
            cursor.execute_script("SELECT 1; SELECT 2"),
            Err(SpannerDbError::NotImplemented(_))
        ));
        assert!(cursor.call_proc("p", &[]).is_err());
        assert!(cursor.next_set().is_err());
        assert!(cursor.set_input_sizes(&[1]).is_err());
        assert!(cursor.set_output_size(1, None).is_err());
        assert_eq!(cursor.lastrowid(), None);
    }
}
