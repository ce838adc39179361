//! Blocking statement execution over `rusqlite`.
//!
//! [`StatementExecutor`] offers four operations on top of a [`DataSource`]:
//!
//! - [`StatementExecutor::update`] for inserts, updates and deletes;
//! - [`StatementExecutor::query_for_object`] for queries that must return exactly one row,
//!   built into a [`FromColumns`] type after a column-signature check;
//! - [`StatementExecutor::query`] for zero or more rows through a [`RowMapper`];
//! - [`StatementExecutor::execute`], the primitive the other three are built on.
//!
//! Every failure comes back as a [`DataAccessError`].

pub mod column_types;
pub mod datasource;
pub mod error;
pub mod executor;
pub mod mapping;
pub mod prelude;
pub mod sqlite;
pub mod statement;
pub mod types;

pub use column_types::{SqlType, ValueKind};
pub use datasource::{DataSource, SingleConnectionDataSource, SqliteDataSource};
pub use error::{DataAccessError, ErrorKind, ResultSize};
pub use executor::StatementExecutor;
pub use mapping::{ColumnsRowMapper, FromColumns, FromValue, RowMapper, construct, row_mapper};
pub use sqlite::{JournalMode, SqliteOptions, SqliteOptionsBuilder};
pub use statement::{ColumnMeta, Cursor, PreparedStatement, Row};
pub use types::RowValues;
