// SQLite module - driver plumbing underneath the executor
//
// - config: connection options and opening
// - params: argument conversion and positional binding
// - query: column value extraction

pub mod config;
pub mod params;
pub mod query;

pub use config::{JournalMode, SqliteOptions, SqliteOptionsBuilder};
pub use params::{bind, row_value_to_sqlite_value};
pub use query::{sqlite_extract_raw, sqlite_extract_value};
