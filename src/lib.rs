//! SQL-subset cursor layer over a distributed relational backend.
//!
//! Callers talk to a [`SpannerConnection`] and its [`Cursor`]s using a small statement subset
//! (single-row `INSERT` and column-list `SELECT` with `?` placeholders). The schema the
//! statements run against is declared once in [`schema::catalog`] and provisioned with
//! [`ddl::create_database`]. The backend itself is reached only through the capability traits
//! in [`backend`].

pub mod backend;
pub mod config;
pub mod connection;
pub mod cursor;
pub mod ddl;
pub mod error;
pub mod ids;
pub mod prelude;
pub mod results;
pub mod schema;
pub mod translation;
pub mod types;

pub use config::{SpannerOptions, SpannerOptionsBuilder};
pub use connection::SpannerConnection;
pub use cursor::Cursor;
pub use error::SpannerDbError;
pub use results::{ColumnDescription, ResultSet, SpannerRow};
pub use translation::{ParsedStatement, parse_sql};
pub use types::RowValues;
