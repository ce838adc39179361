//! Turning rows into caller types.
//!
//! A target type declares, through [`FromColumns`], the value kinds its factory takes in
//! column order. The single-object path derives the kinds of the row's columns from the
//! mapping table and only calls the factory when the two signatures agree.

use std::any::type_name;
use std::marker::PhantomData;

use chrono::NaiveDateTime;
use rusqlite::types::{Value, ValueRef};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use crate::column_types::{ValueKind, format_signature, kind_for_declared, kind_for_storage};
use crate::error::{DataAccessError, ErrorKind};
use crate::sqlite::sqlite_extract_value;
use crate::statement::{ColumnMeta, Row};
use crate::types::RowValues;

/// Conversion of one column value into one factory parameter.
pub trait FromValue: Sized {
    /// The kind a column must map to for this parameter.
    const KIND: ValueKind;

    /// # Errors
    ///
    /// Returns an [`ErrorKind::Construction`] error if `value` is not of [`Self::KIND`].
    fn from_value(value: RowValues) -> Result<Self, DataAccessError>;
}

fn wrong_value<T>(value: &RowValues) -> DataAccessError {
    if value.is_null() {
        DataAccessError::new(
            ErrorKind::Construction,
            format!("NULL for non-optional {} parameter", type_name::<T>()),
        )
    } else {
        DataAccessError::new(
            ErrorKind::Construction,
            format!("cannot build {} from {}", type_name::<T>(), value.type_name()),
        )
    }
}

macro_rules! impl_from_value {
    ($ty:ty, $kind:ident, $variant:ident) => {
        impl FromValue for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn from_value(value: RowValues) -> Result<Self, DataAccessError> {
                match value {
                    RowValues::$variant(v) => Ok(v),
                    other => Err(wrong_value::<$ty>(&other)),
                }
            }
        }
    };
}

impl_from_value!(i64, Int, Int);
impl_from_value!(f64, Float, Float);
impl_from_value!(Decimal, Decimal, Decimal);
impl_from_value!(String, Text, Text);
impl_from_value!(bool, Bool, Bool);
impl_from_value!(NaiveDateTime, Timestamp, Timestamp);
impl_from_value!(JsonValue, Json, JSON);
impl_from_value!(Vec<u8>, Blob, Blob);

impl FromValue for i32 {
    const KIND: ValueKind = ValueKind::Int;

    fn from_value(value: RowValues) -> Result<Self, DataAccessError> {
        match value {
            RowValues::Int(v) => i32::try_from(v)
                .map_err(|e| DataAccessError::wrap_with(ErrorKind::Construction, "i32 parameter", e)),
            other => Err(wrong_value::<i32>(&other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn from_value(value: RowValues) -> Result<Self, DataAccessError> {
        match value {
            RowValues::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// A target type buildable from a whole row.
///
/// Implement it with [`impl_from_columns!`](crate::impl_from_columns) for structs; scalars,
/// `Option`s of scalars and tuples up to six elements already implement it.
pub trait FromColumns: Sized {
    /// Parameter kinds of the factory, in column order.
    fn signature() -> Vec<ValueKind>;

    /// Build the value. `values` has exactly one entry per signature element.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::Construction`] error if a value does not convert.
    fn from_columns(values: Vec<RowValues>) -> Result<Self, DataAccessError>;
}

/// Pull the next value off a row for the field `field` of `target`. Used by
/// [`impl_from_columns!`](crate::impl_from_columns).
///
/// # Errors
///
/// Returns an [`ErrorKind::Construction`] error if the row is exhausted or the value does
/// not convert.
#[doc(hidden)]
pub fn next_field<T: FromValue>(
    values: &mut std::vec::IntoIter<RowValues>,
    target: &str,
    field: &str,
) -> Result<T, DataAccessError> {
    let value = values.next().ok_or_else(|| {
        DataAccessError::new(
            ErrorKind::Construction,
            format!("{target}.{field}: row has fewer columns than the factory"),
        )
    })?;
    T::from_value(value).map_err(|e| match e {
        DataAccessError::Access {
            kind,
            message,
            source,
        } => DataAccessError::Access {
            kind,
            message: format!("{target}.{field}: {message}"),
            source,
        },
        other => other,
    })
}

/// Generate [`FromColumns`] for a struct from its field list, in column order.
///
/// ```rust
/// use sql_template::impl_from_columns;
///
/// #[derive(Debug, PartialEq)]
/// struct Person {
///     id: i64,
///     name: String,
///     nickname: Option<String>,
/// }
///
/// impl_from_columns!(Person { id: i64, name: String, nickname: Option<String> });
///
/// #[derive(Debug, PartialEq)]
/// struct Score(i64, f64);
///
/// impl_from_columns!(Score(i64, f64));
/// ```
#[macro_export]
macro_rules! impl_from_columns {
    ($target:ident { $($field:ident : $ty:ty),+ $(,)? }) => {
        impl $crate::mapping::FromColumns for $target {
            fn signature() -> ::std::vec::Vec<$crate::column_types::ValueKind> {
                ::std::vec![$(<$ty as $crate::mapping::FromValue>::KIND),+]
            }

            fn from_columns(
                values: ::std::vec::Vec<$crate::types::RowValues>,
            ) -> ::std::result::Result<Self, $crate::error::DataAccessError> {
                let mut values = values.into_iter();
                ::std::result::Result::Ok($target {
                    $($field: $crate::mapping::next_field::<$ty>(
                        &mut values,
                        ::std::stringify!($target),
                        ::std::stringify!($field),
                    )?,)+
                })
            }
        }
    };
    ($target:ident ( $($ty:ty),+ $(,)? )) => {
        impl $crate::mapping::FromColumns for $target {
            fn signature() -> ::std::vec::Vec<$crate::column_types::ValueKind> {
                ::std::vec![$(<$ty as $crate::mapping::FromValue>::KIND),+]
            }

            fn from_columns(
                values: ::std::vec::Vec<$crate::types::RowValues>,
            ) -> ::std::result::Result<Self, $crate::error::DataAccessError> {
                let mut values = values.into_iter();
                ::std::result::Result::Ok($target(
                    $($crate::mapping::next_field::<$ty>(
                        &mut values,
                        ::std::stringify!($target),
                        ::std::stringify!($ty),
                    )?,)+
                ))
            }
        }
    };
}

macro_rules! scalar_from_columns {
    ($($ty:ty),+) => {
        $(
            impl FromColumns for $ty {
                fn signature() -> Vec<ValueKind> {
                    vec![<$ty as FromValue>::KIND]
                }

                fn from_columns(values: Vec<RowValues>) -> Result<Self, DataAccessError> {
                    next_field::<$ty>(&mut values.into_iter(), type_name::<$ty>(), "0")
                }
            }
        )+
    };
}

scalar_from_columns!(i64, i32, f64, Decimal, String, bool, NaiveDateTime, JsonValue, Vec<u8>);

impl<T: FromValue> FromColumns for Option<T> {
    fn signature() -> Vec<ValueKind> {
        vec![T::KIND]
    }

    fn from_columns(values: Vec<RowValues>) -> Result<Self, DataAccessError> {
        next_field::<Option<T>>(&mut values.into_iter(), type_name::<Self>(), "0")
    }
}

macro_rules! tuple_from_columns {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: FromValue),+> FromColumns for ($($name,)+) {
            fn signature() -> Vec<ValueKind> {
                vec![$($name::KIND),+]
            }

            fn from_columns(values: Vec<RowValues>) -> Result<Self, DataAccessError> {
                let mut values = values.into_iter();
                Ok(($(next_field::<$name>(&mut values, "tuple", stringify!($idx))?,)+))
            }
        }
    };
}

tuple_from_columns!(A: 0, B: 1);
tuple_from_columns!(A: 0, B: 1, C: 2);
tuple_from_columns!(A: 0, B: 1, C: 2, D: 3);
tuple_from_columns!(A: 0, B: 1, C: 2, D: 3, E: 4);
tuple_from_columns!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

/// One row copied out of its cursor as stored. Nothing is typed yet, so reading it cannot
/// fail on the mapping table.
#[derive(Debug, Clone)]
pub(crate) struct RawRow {
    columns: Vec<ColumnMeta>,
    values: Vec<Value>,
}

impl RawRow {
    pub(crate) fn read(row: &Row<'_, '_>) -> Result<Self, DataAccessError> {
        let values = (0..row.column_count())
            .map(|i| {
                row.raw()
                    .get_ref(i)
                    .map(Value::from)
                    .map_err(|e| DataAccessError::wrap(ErrorKind::ColumnMapping, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            columns: row.columns().to_vec(),
            values,
        })
    }

    /// Derive each column's kind and coerce its value.
    pub(crate) fn snapshot(self) -> Result<RowSnapshot, DataAccessError> {
        let mut values = Vec::with_capacity(self.values.len());
        let mut kinds = Vec::with_capacity(self.values.len());
        for (meta, stored) in self.columns.iter().zip(&self.values) {
            let stored = ValueRef::from(stored);
            let kind = match meta.decl_type.as_deref() {
                Some(decl) => Some(kind_for_declared(&meta.name, decl)?),
                None => kind_for_storage(stored),
            };
            values.push(match kind {
                Some(kind) => sqlite_extract_value(&meta.name, stored, kind)?,
                None => RowValues::Null,
            });
            kinds.push(kind);
        }
        Ok(RowSnapshot { values, kinds })
    }
}

/// Values and derived column kinds of one row.
#[derive(Debug, Clone)]
pub(crate) struct RowSnapshot {
    pub(crate) values: Vec<RowValues>,
    pub(crate) kinds: Vec<Option<ValueKind>>,
}

impl RowSnapshot {
    pub(crate) fn read(row: &Row<'_, '_>) -> Result<Self, DataAccessError> {
        RawRow::read(row)?.snapshot()
    }

    /// Check the derived signature against `T`'s factory and build it.
    pub(crate) fn instantiate<T: FromColumns>(self) -> Result<T, DataAccessError> {
        let declared = T::signature();
        if !signature_matches(&self.kinds, &declared) {
            let declared: Vec<Option<ValueKind>> = declared.into_iter().map(Some).collect();
            return Err(DataAccessError::new(
                ErrorKind::Construction,
                format!(
                    "no factory on {} accepts {}; it declares {}",
                    type_name::<T>(),
                    format_signature(&self.kinds),
                    format_signature(&declared)
                ),
            ));
        }
        T::from_columns(self.values).map_err(|e| e.with_kind(ErrorKind::Construction))
    }
}

/// Same length, and every derived kind equal to the declared one. Underivable kinds (NULL
/// expression values) match anything.
#[must_use]
pub fn signature_matches(derived: &[Option<ValueKind>], declared: &[ValueKind]) -> bool {
    derived.len() == declared.len()
        && derived
            .iter()
            .zip(declared)
            .all(|(d, k)| d.is_none_or(|d| d == *k))
}

/// Build a `T` from a row through the signature check.
///
/// # Errors
///
/// Returns an [`ErrorKind::ColumnMapping`] error for unmapped columns and an
/// [`ErrorKind::Construction`] error when no factory matches or the factory fails.
pub fn construct<T: FromColumns>(row: &Row<'_, '_>) -> Result<T, DataAccessError> {
    RowSnapshot::read(row)?.instantiate()
}

/// Maps one row, plus its 0-based position in the cursor, to a value.
pub trait RowMapper<T> {
    /// # Errors
    ///
    /// Whatever the mapper decides; the executor hands it back unchanged.
    fn map_row(&self, row: &Row<'_, '_>, row_num: usize) -> Result<T, DataAccessError>;
}

impl<T, F> RowMapper<T> for F
where
    F: Fn(&Row<'_, '_>, usize) -> Result<T, DataAccessError>,
{
    fn map_row(&self, row: &Row<'_, '_>, row_num: usize) -> Result<T, DataAccessError> {
        self(row, row_num)
    }
}

/// Pins a closure to the row-mapper shape so its argument types are inferred.
///
/// ```rust
/// use sql_template::prelude::*;
///
/// let names = row_mapper(|row, _| Ok(row.get(0)?.as_text().unwrap_or_default().to_string()));
/// # let _ = names;
/// ```
pub fn row_mapper<T, F>(func: F) -> F
where
    F: Fn(&Row<'_, '_>, usize) -> Result<T, DataAccessError>,
{
    func
}

/// Row mapper that builds every row through [`FromColumns`], with the same signature check
/// as the single-object path.
pub struct ColumnsRowMapper<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> ColumnsRowMapper<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _target: PhantomData,
        }
    }
}

impl<T> Default for ColumnsRowMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FromColumns> RowMapper<T> for ColumnsRowMapper<T> {
    fn map_row(&self, row: &Row<'_, '_>, _row_num: usize) -> Result<T, DataAccessError> {
        construct(row)
    }
}
