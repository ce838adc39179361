use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};

use crate::error::{DataAccessError, ErrorKind};

/// `PRAGMA journal_mode` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    #[default]
    Delete,
    Wal,
    Memory,
    Truncate,
    Persist,
    Off,
}

impl JournalMode {
    #[must_use]
    pub fn as_pragma(self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Wal => "WAL",
            JournalMode::Memory => "MEMORY",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Off => "OFF",
        }
    }
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

/// Options for opening `SQLite` connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteOptions {
    pub db_path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default)]
    pub journal_mode: JournalMode,
    #[serde(default = "default_true")]
    pub foreign_keys: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default = "default_true")]
    pub create_if_missing: bool,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: JournalMode::default(),
            foreign_keys: true,
            read_only: false,
            create_if_missing: true,
        }
    }

    #[must_use]
    pub fn builder(db_path: impl Into<String>) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Parse options from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::Configuration`] error if the document does not describe options.
    pub fn from_json_str(json: &str) -> Result<Self, DataAccessError> {
        serde_json::from_str(json).map_err(|e| {
            DataAccessError::wrap_with(ErrorKind::Configuration, "invalid SQLite options", e)
        })
    }

    /// Read options from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::Configuration`] error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DataAccessError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DataAccessError::wrap_with(
                ErrorKind::Configuration,
                &format!("cannot read {}", path.display()),
                e,
            )
        })?;
        Self::from_json_str(&text)
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    fn open_flags(&self) -> OpenFlags {
        let mut flags = if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        if self.create_if_missing && !self.read_only {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        flags | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX
    }

    /// Open and configure one connection.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::Connection`] error if the database cannot be opened or a pragma
    /// is rejected.
    pub fn open(&self) -> Result<Connection, DataAccessError> {
        let conn = Connection::open_with_flags(&self.db_path, self.open_flags()).map_err(|e| {
            DataAccessError::wrap_with(
                ErrorKind::Connection,
                &format!("failed to open SQLite database '{}'", self.db_path),
                e,
            )
        })?;
        self.apply(&conn)?;
        Ok(conn)
    }

    fn apply(&self, conn: &Connection) -> Result<(), DataAccessError> {
        let configure = |e: rusqlite::Error| {
            DataAccessError::wrap_with(ErrorKind::Connection, "failed to configure connection", e)
        };
        conn.busy_timeout(self.busy_timeout()).map_err(configure)?;
        if !self.read_only && self.journal_mode != JournalMode::Delete {
            // journal_mode answers with the mode actually in effect
            let _mode: String = conn
                .query_row(
                    &format!("PRAGMA journal_mode = {}", self.journal_mode.as_pragma()),
                    [],
                    |row| row.get(0),
                )
                .map_err(configure)?;
        }
        let fk = if self.foreign_keys { "ON" } else { "OFF" };
        conn.execute_batch(&format!("PRAGMA foreign_keys = {fk};"))
            .map_err(configure)?;
        Ok(())
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.opts.journal_mode = mode;
        self
    }

    #[must_use]
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.opts.foreign_keys = enabled;
        self
    }

    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.opts.read_only = read_only;
        self
    }

    #[must_use]
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.opts.create_if_missing = create;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }
}
