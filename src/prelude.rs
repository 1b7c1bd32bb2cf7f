//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::backend::{
    BackendClient, BatchWriter, Database, Instance, KeySet, ReadSession, RowStream,
    SnapshotReader,
};
#[cfg(feature = "memory")]
pub use crate::backend::memory::MemoryClient;
pub use crate::config::{SpannerOptions, SpannerOptionsBuilder};
pub use crate::connection::SpannerConnection;
pub use crate::cursor::Cursor;
pub use crate::ddl::{create_database, database_ddl};
pub use crate::error::SpannerDbError;
pub use crate::results::{ColumnDescription, ResultSet, SpannerRow};
pub use crate::schema::{ColumnSchema, ColumnType, IndexSchema, TableSchema, catalog};
pub use crate::translation::{ParamBinder, ParsedStatement, TextualBinder, parse_sql};
pub use crate::types::RowValues;
