use std::fmt;

use thiserror::Error;

type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// What an [`DataAccessError::Access`] failure was doing when it happened.
///
/// The driver error stays reachable through `source()`, but only the kind is meant to be
/// matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Opening or configuring a connection failed.
    Connection,
    /// The driver rejected the SQL text.
    Preparation,
    /// A positional argument could not be bound, or the count did not match.
    Binding,
    /// Running the statement or advancing the cursor failed.
    Execution,
    /// A column type had no entry in the mapping table, or a value could not be coerced.
    ColumnMapping,
    /// No factory on the target type matched the row, or the factory itself failed.
    Construction,
    /// Invalid options (unreadable config file, bad values).
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Connection => "Connection error",
            ErrorKind::Preparation => "Statement preparation error",
            ErrorKind::Binding => "Parameter binding error",
            ErrorKind::Execution => "SQL execution error",
            ErrorKind::ColumnMapping => "Column mapping error",
            ErrorKind::Construction => "Object construction error",
            ErrorKind::Configuration => "Configuration error",
        };
        f.write_str(label)
    }
}

/// How a single-object query missed its exactly-one-row expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSize {
    /// The cursor produced no rows.
    Empty,
    /// The cursor produced a second row. Traversal stops there, so the real count is unknown.
    Multiple,
}

impl fmt::Display for ResultSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultSize::Empty => f.write_str("got none"),
            ResultSize::Multiple => f.write_str("got more than one"),
        }
    }
}

/// The one failure type every executor operation returns.
#[derive(Debug, Error)]
pub enum DataAccessError {
    #[error("Incorrect result size: expected {expected} row, {actual}")]
    IncorrectResultSize { expected: usize, actual: ResultSize },

    #[error("{kind}: {message}")]
    Access {
        kind: ErrorKind,
        message: String,
        #[source]
        source: Option<BoxedCause>,
    },
}

impl DataAccessError {
    /// Build an access error with no underlying cause.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        DataAccessError::Access {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a lower-level error, keeping its message and the error itself as the cause.
    pub fn wrap<E>(kind: ErrorKind, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DataAccessError::Access {
            kind,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Like [`DataAccessError::wrap`], with a context prefix on the message.
    pub fn wrap_with<E>(kind: ErrorKind, context: &str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DataAccessError::Access {
            kind,
            message: format!("{context}: {err}"),
            source: Some(Box::new(err)),
        }
    }

    pub(crate) fn incorrect_result_size(actual: ResultSize) -> Self {
        DataAccessError::IncorrectResultSize {
            expected: 1,
            actual,
        }
    }

    /// The access kind, or `None` for the result-cardinality error.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DataAccessError::Access { kind, .. } => Some(*kind),
            DataAccessError::IncorrectResultSize { .. } => None,
        }
    }

    #[must_use]
    pub fn is_incorrect_result_size(&self) -> bool {
        matches!(self, DataAccessError::IncorrectResultSize { .. })
    }

    /// Replace the kind of an access error; cardinality errors pass through untouched.
    #[must_use]
    pub(crate) fn with_kind(self, new_kind: ErrorKind) -> Self {
        match self {
            DataAccessError::Access {
                message, source, ..
            } => DataAccessError::Access {
                kind: new_kind,
                message,
                source,
            },
            other => other,
        }
    }
}

impl From<rusqlite::Error> for DataAccessError {
    fn from(err: rusqlite::Error) -> Self {
        DataAccessError::wrap(ErrorKind::Execution, err)
    }
}
