//! Fixed mapping from declared SQL column types to the value kinds rows are built from.
//!
//! SQLite accepts any declared type name, so only the names listed in [`SqlType`] are
//! considered mapped. Columns with no declared type (expressions, aggregates) fall back to
//! the storage class of the value the cursor produced.

use std::fmt;

use rusqlite::types::ValueRef;

use crate::error::{DataAccessError, ErrorKind};

/// Declared column types this crate knows how to map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Integer,
    Int,
    BigInt,
    SmallInt,
    TinyInt,
    Real,
    Double,
    Float,
    Numeric,
    Decimal,
    Char,
    Varchar,
    Text,
    Clob,
    Boolean,
    Date,
    DateTime,
    Timestamp,
    Blob,
    Json,
}

impl SqlType {
    /// Parse a declared type such as `VARCHAR(40)` or `decimal(10, 2)`.
    ///
    /// Returns `None` for names outside the table.
    #[must_use]
    pub fn from_declared(decl: &str) -> Option<SqlType> {
        let base = decl.split('(').next().unwrap_or(decl).trim();
        let ty = match base.to_ascii_uppercase().as_str() {
            "INTEGER" => SqlType::Integer,
            "INT" => SqlType::Int,
            "BIGINT" => SqlType::BigInt,
            "SMALLINT" => SqlType::SmallInt,
            "TINYINT" => SqlType::TinyInt,
            "REAL" => SqlType::Real,
            "DOUBLE" => SqlType::Double,
            "FLOAT" => SqlType::Float,
            "NUMERIC" => SqlType::Numeric,
            "DECIMAL" => SqlType::Decimal,
            "CHAR" | "CHARACTER" => SqlType::Char,
            "VARCHAR" => SqlType::Varchar,
            "TEXT" => SqlType::Text,
            "CLOB" => SqlType::Clob,
            "BOOLEAN" | "BOOL" => SqlType::Boolean,
            "DATE" => SqlType::Date,
            "DATETIME" => SqlType::DateTime,
            "TIMESTAMP" => SqlType::Timestamp,
            "BLOB" => SqlType::Blob,
            "JSON" => SqlType::Json,
            _ => return None,
        };
        Some(ty)
    }

    /// The mapping table.
    #[must_use]
    pub fn value_kind(self) -> ValueKind {
        match self {
            SqlType::Integer
            | SqlType::Int
            | SqlType::BigInt
            | SqlType::SmallInt
            | SqlType::TinyInt => ValueKind::Int,
            SqlType::Real | SqlType::Double | SqlType::Float => ValueKind::Float,
            SqlType::Numeric | SqlType::Decimal => ValueKind::Decimal,
            SqlType::Char | SqlType::Varchar | SqlType::Text | SqlType::Clob => ValueKind::Text,
            SqlType::Boolean => ValueKind::Bool,
            SqlType::Date | SqlType::DateTime | SqlType::Timestamp => ValueKind::Timestamp,
            SqlType::Blob => ValueKind::Blob,
            SqlType::Json => ValueKind::Json,
        }
    }
}

/// The Rust-side type a column value is read as, and that a target factory declares per
/// parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Float,
    Decimal,
    Text,
    Bool,
    Timestamp,
    Json,
    Blob,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Int => "Int",
            ValueKind::Float => "Float",
            ValueKind::Decimal => "Decimal",
            ValueKind::Text => "Text",
            ValueKind::Bool => "Bool",
            ValueKind::Timestamp => "Timestamp",
            ValueKind::Json => "Json",
            ValueKind::Blob => "Blob",
        };
        f.write_str(name)
    }
}

/// Kind for a column with a declared type.
///
/// # Errors
///
/// Returns an [`ErrorKind::ColumnMapping`] error when the declared type is not in the table.
pub fn kind_for_declared(column: &str, decl: &str) -> Result<ValueKind, DataAccessError> {
    SqlType::from_declared(decl)
        .map(SqlType::value_kind)
        .ok_or_else(|| {
            DataAccessError::new(
                ErrorKind::ColumnMapping,
                format!("column '{column}' has unmapped SQL type '{decl}'"),
            )
        })
}

/// Kind for a column without a declared type, from the storage class of its value.
///
/// `None` for a NULL value: nothing can be derived and any parameter type is accepted.
#[must_use]
pub fn kind_for_storage(value: ValueRef<'_>) -> Option<ValueKind> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(_) => Some(ValueKind::Int),
        ValueRef::Real(_) => Some(ValueKind::Float),
        ValueRef::Text(_) => Some(ValueKind::Text),
        ValueRef::Blob(_) => Some(ValueKind::Blob),
    }
}

/// Render a derived column signature, e.g. `(Int, Text, ?)`.
pub(crate) fn format_signature(kinds: &[Option<ValueKind>]) -> String {
    let parts: Vec<String> = kinds
        .iter()
        .map(|k| k.map_or_else(|| "?".to_string(), |k| k.to_string()))
        .collect();
    format!("({})", parts.join(", "))
}
