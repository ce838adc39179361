//! Prepared statement, cursor and row wrappers around `rusqlite`.
//!
//! A [`Cursor`] owns the driver's row iterator; dropping it resets the statement, so every
//! exit path out of a query (normal return, `?`, panic) releases it. A [`Row`] borrows the
//! cursor and cannot be kept once the cursor moves on.

use std::sync::Arc;

use crate::column_types::{ValueKind, kind_for_declared, kind_for_storage};
use crate::error::{DataAccessError, ErrorKind};
use crate::sqlite::{bind, sqlite_extract_raw, sqlite_extract_value};
use crate::types::RowValues;

/// Name and declared type of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub decl_type: Option<String>,
}

/// A statement prepared on a connection for the length of one executor call.
pub struct PreparedStatement<'conn> {
    stmt: rusqlite::Statement<'conn>,
    sql: &'conn str,
}

impl<'conn> PreparedStatement<'conn> {
    pub(crate) fn new(stmt: rusqlite::Statement<'conn>, sql: &'conn str) -> Self {
        Self { stmt, sql }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        self.sql
    }

    /// Placeholder count reported by the driver.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.stmt.parameter_count()
    }

    /// Result column metadata, in column order. Empty for statements that return no rows.
    #[must_use]
    pub fn columns(&self) -> Vec<ColumnMeta> {
        self.stmt
            .columns()
            .iter()
            .map(|c| ColumnMeta {
                name: c.name().to_string(),
                decl_type: c.decl_type().map(str::to_string),
            })
            .collect()
    }

    /// Bind positional arguments, 1-based.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::Binding`] error if a value is rejected or the count is wrong.
    pub fn bind(&mut self, args: &[RowValues]) -> Result<(), DataAccessError> {
        bind(&mut self.stmt, args)
    }

    /// Run as a data-modification statement and return the affected-row count.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::Execution`] error if the driver fails or the statement returns
    /// rows.
    pub fn execute_update(&mut self) -> Result<usize, DataAccessError> {
        Ok(self.stmt.raw_execute()?)
    }

    /// Run as a query and open a cursor over its rows.
    pub fn execute_query(&mut self) -> Cursor<'_> {
        let columns: Arc<[ColumnMeta]> = self.columns().into();
        Cursor {
            rows: self.stmt.raw_query(),
            columns,
            position: 0,
        }
    }

    /// The underlying driver statement, for capabilities this wrapper does not expose.
    pub fn raw(&mut self) -> &mut rusqlite::Statement<'conn> {
        &mut self.stmt
    }
}

/// Forward-only cursor over a query's rows.
pub struct Cursor<'stmt> {
    rows: rusqlite::Rows<'stmt>,
    columns: Arc<[ColumnMeta]>,
    position: usize,
}

impl<'stmt> Cursor<'stmt> {
    /// Advance to the next row. The returned row carries its 0-based position.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::Execution`] error if stepping the statement fails.
    pub fn next_row(&mut self) -> Result<Option<Row<'_, 'stmt>>, DataAccessError> {
        let columns = &self.columns;
        match self.rows.next()? {
            Some(inner) => {
                let index = self.position;
                self.position += 1;
                Ok(Some(Row {
                    inner,
                    columns,
                    index,
                }))
            }
            None => Ok(None),
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    /// Number of rows handed out so far.
    #[must_use]
    pub fn rows_read(&self) -> usize {
        self.position
    }
}

/// One row of an open cursor.
pub struct Row<'r, 'stmt> {
    inner: &'r rusqlite::Row<'stmt>,
    columns: &'r [ColumnMeta],
    index: usize,
}

impl<'r, 'stmt> Row<'r, 'stmt> {
    /// 0-based position of this row in the cursor.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn column_name(&self, idx: usize) -> Option<&str> {
        self.columns.get(idx).map(|c| c.name.as_str())
    }

    #[must_use]
    pub fn column_decl_type(&self, idx: usize) -> Option<&str> {
        self.columns.get(idx).and_then(|c| c.decl_type.as_deref())
    }

    #[must_use]
    pub fn columns(&self) -> &'r [ColumnMeta] {
        self.columns
    }

    fn meta(&self, idx: usize) -> Result<&ColumnMeta, DataAccessError> {
        self.columns.get(idx).ok_or_else(|| {
            DataAccessError::new(
                ErrorKind::ColumnMapping,
                format!(
                    "column index {idx} out of range for {} column(s)",
                    self.columns.len()
                ),
            )
        })
    }

    fn value_ref(&self, idx: usize) -> Result<rusqlite::types::ValueRef<'_>, DataAccessError> {
        self.inner
            .get_ref(idx)
            .map_err(|e| DataAccessError::wrap(ErrorKind::ColumnMapping, e))
    }

    /// Target kind of column `idx` from the mapping table.
    ///
    /// Columns without a declared type are typed by the stored value; `Ok(None)` means the
    /// value is NULL and no type can be derived.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::ColumnMapping`] error for an unmapped declared type.
    pub fn column_kind(&self, idx: usize) -> Result<Option<ValueKind>, DataAccessError> {
        let meta = self.meta(idx)?;
        match meta.decl_type.as_deref() {
            Some(decl) => kind_for_declared(&meta.name, decl).map(Some),
            None => Ok(kind_for_storage(self.value_ref(idx)?)),
        }
    }

    /// Read column `idx`, coerced to its mapped kind.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::ColumnMapping`] error if the column is out of range, its declared
    /// type is unmapped, or the stored value cannot be coerced.
    pub fn get(&self, idx: usize) -> Result<RowValues, DataAccessError> {
        let value = self.value_ref(idx)?;
        match self.column_kind(idx)? {
            Some(kind) => sqlite_extract_value(&self.meta(idx)?.name, value, kind),
            None => Ok(RowValues::Null),
        }
    }

    /// Read column `idx` as stored, without consulting the mapping table.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::ColumnMapping`] error if the column is out of range.
    pub fn get_raw(&self, idx: usize) -> Result<RowValues, DataAccessError> {
        self.meta(idx)?;
        sqlite_extract_raw(self.value_ref(idx)?)
    }

    /// Read a column by name, coerced like [`Row::get`].
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::ColumnMapping`] error if no column has that name.
    pub fn get_by_name(&self, name: &str) -> Result<RowValues, DataAccessError> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| {
                DataAccessError::new(ErrorKind::ColumnMapping, format!("no column named '{name}'"))
            })?;
        self.get(idx)
    }

    /// Every column in order, coerced like [`Row::get`].
    ///
    /// # Errors
    ///
    /// Returns the first column's read error.
    pub fn values(&self) -> Result<Vec<RowValues>, DataAccessError> {
        (0..self.column_count()).map(|i| self.get(i)).collect()
    }

    /// The driver row, for typed `FromSql` access.
    #[must_use]
    pub fn raw(&self) -> &'r rusqlite::Row<'stmt> {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::*;

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO t VALUES (1, 'Ann'), (2, 'Bo'), (3, 'Cy');",
        )
        .unwrap();
        conn
    }

    fn first_then_fail(stmt: &mut PreparedStatement<'_>) -> Result<(), DataAccessError> {
        let mut cursor = stmt.execute_query();
        let row = cursor.next_row()?.map(|r| r.get(1)).transpose()?;
        assert_eq!(row, Some(RowValues::Text("Ann".into())));
        Err(DataAccessError::new(ErrorKind::ColumnMapping, "stop"))
    }

    #[test]
    fn dropping_the_cursor_resets_the_live_statement() {
        let conn = seeded();
        let sql = "SELECT id, name FROM t ORDER BY id";
        let mut stmt = PreparedStatement::new(conn.prepare(sql).unwrap(), sql);

        let mut cursor = stmt.execute_query();
        assert!(cursor.next_row().unwrap().is_some());
        assert!(conn.is_busy());
        drop(cursor);
        assert!(!conn.is_busy());

        // the statement itself is still prepared here
        assert!(first_then_fail(&mut stmt).is_err());
        assert!(!conn.is_busy());
        conn.execute_batch("DROP TABLE t;").unwrap();
        drop(stmt);
    }

    #[test]
    fn cursor_positions_and_metadata() {
        let conn = seeded();
        let sql = "SELECT id, name, id * 2 FROM t WHERE id > ?1 ORDER BY id";
        let mut stmt = PreparedStatement::new(conn.prepare(sql).unwrap(), sql);
        assert_eq!(stmt.parameter_count(), 1);
        stmt.bind(&[RowValues::Int(1)]).unwrap();

        let mut cursor = stmt.execute_query();
        assert_eq!(cursor.columns()[1].decl_type.as_deref(), Some("TEXT"));
        assert_eq!(cursor.columns()[2].decl_type, None);
        let mut seen = Vec::new();
        while let Some(row) = cursor.next_row().unwrap() {
            seen.push((row.index(), row.get(0).unwrap(), row.get(2).unwrap()));
        }
        assert_eq!(
            seen,
            vec![
                (0, RowValues::Int(2), RowValues::Int(4)),
                (1, RowValues::Int(3), RowValues::Int(6)),
            ]
        );
        assert_eq!(cursor.rows_read(), 2);
    }
}
