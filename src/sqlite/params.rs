use rusqlite::Statement;
use rusqlite::types::Value;

use crate::error::{DataAccessError, ErrorKind};
use crate::types::RowValues;

/// Convert a single `RowValue` to a rusqlite `Value`.
#[must_use]
pub fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        // text keeps every digit of the scale
        RowValues::Decimal(d) => Value::Text(d.to_string()),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Bind `args` to positions `1..=args.len()` of a prepared statement.
///
/// The driver decides the storage class from the converted value. After binding, the number of
/// arguments must equal the statement's placeholder count.
///
/// # Errors
///
/// Returns an [`ErrorKind::Binding`] error if the driver rejects a value or the counts differ.
pub fn bind(stmt: &mut Statement<'_>, args: &[RowValues]) -> Result<(), DataAccessError> {
    for (i, arg) in args.iter().enumerate() {
        stmt.raw_bind_parameter(i + 1, row_value_to_sqlite_value(arg))
            .map_err(|e| {
                DataAccessError::wrap_with(
                    ErrorKind::Binding,
                    &format!("cannot bind {} at position {}", arg.type_name(), i + 1),
                    e,
                )
            })?;
    }
    let expected = stmt.parameter_count();
    if expected != args.len() {
        return Err(DataAccessError::new(
            ErrorKind::Binding,
            format!(
                "statement expects {expected} parameter(s), {} supplied",
                args.len()
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn converts_values_to_storage_classes() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(8, 0, 1))
            .unwrap();
        assert_eq!(
            row_value_to_sqlite_value(&RowValues::Timestamp(ts)),
            Value::Text("2024-01-01 08:00:01".into())
        );
        assert_eq!(
            row_value_to_sqlite_value(&RowValues::Bool(true)),
            Value::Integer(1)
        );
        assert_eq!(
            row_value_to_sqlite_value(&RowValues::Decimal(Decimal::from_str("10.50").unwrap())),
            Value::Text("10.50".into())
        );
        assert_eq!(
            row_value_to_sqlite_value(&RowValues::JSON(serde_json::json!({"a": 1}))),
            Value::Text(r#"{"a":1}"#.into())
        );
    }

    #[test]
    fn rejects_argument_count_mismatch() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("SELECT ?1, ?2").unwrap();
        let err = bind(&mut stmt, &[RowValues::Int(1)]).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Binding));

        let err = bind(
            &mut stmt,
            &[RowValues::Int(1), RowValues::Int(2), RowValues::Int(3)],
        )
        .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Binding));

        bind(&mut stmt, &[RowValues::Int(1), RowValues::Null]).unwrap();
    }
}
