//! Connection providers.
//!
//! The executor acquires one connection per call through [`DataSource::with_connection`] and
//! never keeps it past that call. Pooling, if any, is the provider's business.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::error::{DataAccessError, ErrorKind};
use crate::sqlite::SqliteOptions;

/// Hands out a connection for the duration of one closure call.
pub trait DataSource: Send + Sync {
    /// Run `func` with a connection.
    ///
    /// # Errors
    ///
    /// Returns an [`crate::ErrorKind::Connection`] error if no connection can be obtained, or
    /// whatever `func` returns.
    fn with_connection<R, F>(&self, func: F) -> Result<R, DataAccessError>
    where
        F: FnOnce(&mut Connection) -> Result<R, DataAccessError>;
}

impl<D: DataSource> DataSource for Arc<D> {
    fn with_connection<R, F>(&self, func: F) -> Result<R, DataAccessError>
    where
        F: FnOnce(&mut Connection) -> Result<R, DataAccessError>,
    {
        self.as_ref().with_connection(func)
    }
}

impl<D: DataSource> DataSource for &D {
    fn with_connection<R, F>(&self, func: F) -> Result<R, DataAccessError>
    where
        F: FnOnce(&mut Connection) -> Result<R, DataAccessError>,
    {
        (**self).with_connection(func)
    }
}

/// Opens a fresh connection from [`SqliteOptions`] on every call and closes it afterwards.
#[derive(Debug, Clone)]
pub struct SqliteDataSource {
    options: SqliteOptions,
}

impl SqliteDataSource {
    #[must_use]
    pub fn new(options: SqliteOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &SqliteOptions {
        &self.options
    }
}

impl DataSource for SqliteDataSource {
    fn with_connection<R, F>(&self, func: F) -> Result<R, DataAccessError>
    where
        F: FnOnce(&mut Connection) -> Result<R, DataAccessError>,
    {
        let mut conn = self.options.open()?;
        tracing::trace!(db_path = %self.options.db_path, "opened connection");
        func(&mut conn)
    }
}

/// One long-lived connection shared by every call, serialized by a mutex.
///
/// Suits `:memory:` databases, which vanish when their only connection closes.
#[derive(Debug)]
pub struct SingleConnectionDataSource {
    conn: Mutex<Connection>,
}

impl SingleConnectionDataSource {
    #[must_use]
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open a connection with `options` and keep it.
    ///
    /// # Errors
    ///
    /// Returns an [`crate::ErrorKind::Connection`] error if the connection cannot be opened.
    pub fn open(options: &SqliteOptions) -> Result<Self, DataAccessError> {
        Ok(Self::new(options.open()?))
    }

    /// A private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an [`crate::ErrorKind::Connection`] error if `SQLite` cannot allocate it.
    pub fn in_memory() -> Result<Self, DataAccessError> {
        Self::open(&SqliteOptions::new(":memory:"))
    }
}

impl DataSource for SingleConnectionDataSource {
    fn with_connection<R, F>(&self, func: F) -> Result<R, DataAccessError>
    where
        F: FnOnce(&mut Connection) -> Result<R, DataAccessError>,
    {
        let mut guard = match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // cursors were reset while unwinding; a transaction the caller opened was not
                tracing::warn!("shared connection mutex poisoned; recovering");
                let conn = poisoned.into_inner();
                if !conn.is_autocommit() {
                    tracing::warn!("rolling back transaction left open by a panicked caller");
                    conn.execute_batch("ROLLBACK;").map_err(|e| {
                        DataAccessError::wrap_with(
                            ErrorKind::Connection,
                            "rollback after poisoned lock",
                            e,
                        )
                    })?;
                }
                self.conn.clear_poison();
                conn
            }
        };
        func(&mut *guard)
    }
}
