//! Convenient imports for common functionality.

pub use crate::column_types::{SqlType, ValueKind};
pub use crate::datasource::{DataSource, SingleConnectionDataSource, SqliteDataSource};
pub use crate::error::{DataAccessError, ErrorKind, ResultSize};
pub use crate::executor::StatementExecutor;
pub use crate::impl_from_columns;
pub use crate::mapping::{ColumnsRowMapper, FromColumns, FromValue, RowMapper, row_mapper};
pub use crate::sqlite::{JournalMode, SqliteOptions};
pub use crate::statement::{PreparedStatement, Row};
pub use crate::types::RowValues;
