//! Narrow capability traits over the storage backend.
//!
//! The cursor and connection depend only on these traits, never on a concrete SDK client. A
//! production client wraps the vendor SDK; [`memory`] provides an in-process implementation
//! used by the tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SpannerDbError;
use crate::types::RowValues;

#[cfg(feature = "memory")]
pub mod memory;

/// Resolves instances by id.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Project the client is scoped to.
    fn project(&self) -> &str;

    /// Handle to an instance.
    async fn instance(&self, instance_id: &str) -> Result<Arc<dyn Instance>, SpannerDbError>;
}

/// An instance hosts databases and can provision new ones.
#[async_trait]
pub trait Instance: Send + Sync {
    /// Handle to an existing database.
    async fn database(&self, database_id: &str) -> Result<Arc<dyn Database>, SpannerDbError>;

    /// Create a database and apply `ddl` in order, waiting for the operation to finish.
    async fn create_database(&self, database_id: &str, ddl: &[String])
    -> Result<(), SpannerDbError>;
}

/// Can insert rows atomically.
#[async_trait]
pub trait BatchWriter: Send + Sync {
    /// Insert every row in one atomic batch. Each row lists values in `columns` order.
    async fn batch_insert(
        &self,
        table: &str,
        columns: &[String],
        rows: Vec<Vec<RowValues>>,
    ) -> Result<(), SpannerDbError>;
}

/// Can open sessions for point-in-time reads.
#[async_trait]
pub trait SnapshotReader: Send + Sync {
    async fn session(&self) -> Result<Box<dyn ReadSession>, SpannerDbError>;
}

/// A database handle: everything the cursor needs.
pub trait Database: BatchWriter + SnapshotReader {}

impl<T: BatchWriter + SnapshotReader + ?Sized> Database for T {}

/// Which rows a key-based read returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySet {
    All,
    /// Full primary keys, values in key-column order.
    Keys(Vec<Vec<RowValues>>),
}

/// A backend session. Owned by one cursor at a time.
#[async_trait]
pub trait ReadSession: Send {
    /// Run a query against a consistent snapshot.
    async fn execute_sql(&mut self, sql: &str) -> Result<Box<dyn RowStream>, SpannerDbError>;

    /// Read `columns` of the rows selected by `keys`, in primary-key order.
    async fn read(
        &mut self,
        table: &str,
        columns: &[String],
        keys: KeySet,
    ) -> Result<Box<dyn RowStream>, SpannerDbError>;

    /// Release backend resources. Calling it more than once is harmless.
    async fn close(&mut self) -> Result<(), SpannerDbError>;
}

/// Rows produced by a query, pulled one at a time.
#[async_trait]
pub trait RowStream: Send {
    async fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, SpannerDbError>;

    /// Drain the stream into memory.
    async fn consume_all(&mut self) -> Result<Vec<Vec<RowValues>>, SpannerDbError> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row().await? {
            rows.push(row);
        }
        Ok(rows)
    }
}
