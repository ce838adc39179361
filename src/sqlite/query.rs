use std::str::FromStr;

use chrono::DateTime;
use rust_decimal::Decimal;
use rusqlite::types::ValueRef;

use crate::column_types::ValueKind;
use crate::error::{DataAccessError, ErrorKind};
use crate::types::{RowValues, parse_timestamp};

/// Extract a `RowValues` from a raw `SQLite` value without any coercion.
///
/// # Errors
///
/// Returns an [`ErrorKind::ColumnMapping`] error if a text value is not valid UTF-8.
pub fn sqlite_extract_raw(value: ValueRef<'_>) -> Result<RowValues, DataAccessError> {
    Ok(match value {
        ValueRef::Null => RowValues::Null,
        ValueRef::Integer(i) => RowValues::Int(i),
        ValueRef::Real(f) => RowValues::Float(f),
        ValueRef::Text(bytes) => RowValues::Text(utf8(bytes)?),
        ValueRef::Blob(b) => RowValues::Blob(b.to_vec()),
    })
}

/// Extract a `RowValues` from a raw `SQLite` value, coerced to the column's mapped kind.
///
/// SQLite stores booleans as integers and timestamps, decimals and JSON as text or numbers;
/// this puts them back into the variant the declared column type promises.
///
/// # Errors
///
/// Returns an [`ErrorKind::ColumnMapping`] error if the stored value cannot be read as `kind`.
pub fn sqlite_extract_value(
    column: &str,
    value: ValueRef<'_>,
    kind: ValueKind,
) -> Result<RowValues, DataAccessError> {
    let mismatch = |found: &str| {
        DataAccessError::new(
            ErrorKind::ColumnMapping,
            format!("column '{column}' declared as {kind} holds {found}"),
        )
    };

    let out = match (kind, value) {
        (_, ValueRef::Null) => RowValues::Null,

        (ValueKind::Int, ValueRef::Integer(i)) => RowValues::Int(i),
        // INTEGER affinity keeps non-integral reals as reals
        #[allow(clippy::cast_possible_truncation)]
        (ValueKind::Int, ValueRef::Real(f)) if f.fract() == 0.0 && f.is_finite() => {
            RowValues::Int(f as i64)
        }
        (ValueKind::Int, ValueRef::Text(bytes)) => {
            let text = utf8(bytes)?;
            RowValues::Int(text.trim().parse().map_err(|_| mismatch("non-integer text"))?)
        }

        (ValueKind::Float, ValueRef::Real(f)) => RowValues::Float(f),
        #[allow(clippy::cast_precision_loss)]
        (ValueKind::Float, ValueRef::Integer(i)) => RowValues::Float(i as f64),

        (ValueKind::Decimal, ValueRef::Integer(i)) => RowValues::Decimal(Decimal::from(i)),
        (ValueKind::Decimal, ValueRef::Real(f)) => RowValues::Decimal(
            Decimal::try_from(f).map_err(|e| DataAccessError::wrap(ErrorKind::ColumnMapping, e))?,
        ),
        (ValueKind::Decimal, ValueRef::Text(bytes)) => {
            let text = utf8(bytes)?;
            RowValues::Decimal(
                Decimal::from_str(text.trim())
                    .map_err(|e| DataAccessError::wrap(ErrorKind::ColumnMapping, e))?,
            )
        }

        (ValueKind::Text, ValueRef::Text(bytes)) => RowValues::Text(utf8(bytes)?),
        (ValueKind::Text, ValueRef::Integer(i)) => RowValues::Text(i.to_string()),
        (ValueKind::Text, ValueRef::Real(f)) => RowValues::Text(f.to_string()),

        (ValueKind::Bool, ValueRef::Integer(i)) => match i {
            0 => RowValues::Bool(false),
            1 => RowValues::Bool(true),
            _ => return Err(mismatch("an integer other than 0 or 1")),
        },
        (ValueKind::Bool, ValueRef::Text(bytes)) => match utf8(bytes)?.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => RowValues::Bool(true),
            "false" | "f" | "0" => RowValues::Bool(false),
            _ => return Err(mismatch("non-boolean text")),
        },

        (ValueKind::Timestamp, ValueRef::Text(bytes)) => {
            let text = utf8(bytes)?;
            RowValues::Timestamp(parse_timestamp(&text).ok_or_else(|| mismatch("unparseable text"))?)
        }
        (ValueKind::Timestamp, ValueRef::Integer(secs)) => RowValues::Timestamp(
            DateTime::from_timestamp(secs, 0)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| mismatch("an out-of-range unix time"))?,
        ),

        (ValueKind::Json, ValueRef::Text(bytes)) => RowValues::JSON(
            serde_json::from_slice(bytes)
                .map_err(|e| DataAccessError::wrap_with(ErrorKind::ColumnMapping, column, e))?,
        ),
        (ValueKind::Json, ValueRef::Integer(i)) => RowValues::JSON(serde_json::Value::from(i)),
        (ValueKind::Json, ValueRef::Real(f)) => RowValues::JSON(serde_json::Value::from(f)),

        (ValueKind::Blob, ValueRef::Blob(b)) => RowValues::Blob(b.to_vec()),
        (ValueKind::Blob, ValueRef::Text(bytes)) => RowValues::Blob(bytes.to_vec()),

        (_, other) => return Err(mismatch(storage_name(other))),
    };
    Ok(out)
}

fn storage_name(value: ValueRef<'_>) -> &'static str {
    match value {
        ValueRef::Null => "NULL",
        ValueRef::Integer(_) => "an INTEGER",
        ValueRef::Real(_) => "a REAL",
        ValueRef::Text(_) => "TEXT",
        ValueRef::Blob(_) => "a BLOB",
    }
}

fn utf8(bytes: &[u8]) -> Result<String, DataAccessError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| DataAccessError::wrap(ErrorKind::ColumnMapping, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn booleans_come_back_from_integers() {
        assert_eq!(
            sqlite_extract_value("flag", ValueRef::Integer(1), ValueKind::Bool).unwrap(),
            RowValues::Bool(true)
        );
        let err = sqlite_extract_value("flag", ValueRef::Integer(7), ValueKind::Bool).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ColumnMapping));
    }

    #[test]
    fn timestamps_from_text_and_unix_seconds() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(8, 0, 1))
            .unwrap();
        assert_eq!(
            sqlite_extract_value("c", ValueRef::Text(b"2024-01-01 08:00:01"), ValueKind::Timestamp)
                .unwrap(),
            RowValues::Timestamp(expected)
        );
        assert_eq!(
            sqlite_extract_value("c", ValueRef::Integer(0), ValueKind::Timestamp).unwrap(),
            RowValues::Timestamp(DateTime::from_timestamp(0, 0).unwrap().naive_utc())
        );
    }

    #[test]
    fn decimals_keep_text_precision() {
        assert_eq!(
            sqlite_extract_value("price", ValueRef::Text(b"10.50"), ValueKind::Decimal).unwrap(),
            RowValues::Decimal(Decimal::from_str("10.50").unwrap())
        );
        assert_eq!(
            sqlite_extract_value("price", ValueRef::Integer(3), ValueKind::Decimal).unwrap(),
            RowValues::Decimal(Decimal::from(3))
        );
    }

    #[test]
    fn null_passes_through_every_kind() {
        for kind in [ValueKind::Int, ValueKind::Json, ValueKind::Timestamp] {
            assert_eq!(
                sqlite_extract_value("x", ValueRef::Null, kind).unwrap(),
                RowValues::Null
            );
        }
    }

    #[test]
    fn blob_in_int_column_is_rejected() {
        let err = sqlite_extract_value("id", ValueRef::Blob(b"\x00"), ValueKind::Int).unwrap_err();
        assert!(err.to_string().contains("a BLOB"));
    }
}
