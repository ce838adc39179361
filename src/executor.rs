use tracing::{debug, error};

use crate::datasource::DataSource;
use crate::error::{DataAccessError, ErrorKind, ResultSize};
use crate::mapping::{ColumnsRowMapper, FromColumns, RawRow, RowMapper};
use crate::statement::PreparedStatement;
use crate::types::RowValues;

/// Runs parameterized statements against a [`DataSource`] and maps their results.
///
/// Every call acquires a connection, prepares `sql`, does its work and releases everything
/// before returning. The executor itself holds nothing but the data source, so it can be
/// shared across threads whenever the data source can.
///
/// ```rust,no_run
/// use sql_template::prelude::*;
///
/// # fn demo() -> Result<(), DataAccessError> {
/// let executor = StatementExecutor::new(SingleConnectionDataSource::in_memory()?);
/// executor.execute_batch("CREATE TABLE t (id INTEGER, name TEXT);")?;
/// executor.update("INSERT INTO t VALUES (?1, ?2)", &[1.into(), "Ann".into()])?;
/// let name: String = executor.query_for_object("SELECT name FROM t WHERE id = ?1", &[1.into()])?;
/// # let _ = name;
/// # Ok(()) }
/// ```
#[derive(Debug, Clone)]
pub struct StatementExecutor<D> {
    data_source: D,
}

impl<D: DataSource> StatementExecutor<D> {
    #[must_use]
    pub fn new(data_source: D) -> Self {
        Self { data_source }
    }

    #[must_use]
    pub fn data_source(&self) -> &D {
        &self.data_source
    }

    /// Prepare `sql` on a fresh connection and hand the statement to `operation`.
    ///
    /// Failures from any stage (connection, preparation, the operation) are logged here and
    /// returned unchanged. Nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Preparation`] if the driver rejects `sql`, otherwise whatever the
    /// data source or `operation` returns.
    pub fn execute<T, F>(&self, sql: &str, operation: F) -> Result<T, DataAccessError>
    where
        F: FnOnce(&mut PreparedStatement<'_>) -> Result<T, DataAccessError>,
    {
        let result = self.data_source.with_connection(|conn| {
            let stmt = conn
                .prepare(sql)
                .map_err(|e| DataAccessError::wrap(ErrorKind::Preparation, e))?;
            let mut stmt = PreparedStatement::new(stmt, sql);
            operation(&mut stmt)
        });
        if let Err(err) = &result {
            error!(sql, error = %err, "statement failed");
        }
        result
    }

    /// Run a data-modification statement and return the affected-row count.
    ///
    /// # Errors
    ///
    /// Returns a [`DataAccessError`] if binding or execution fails, including when `sql`
    /// produces rows.
    pub fn update(&self, sql: &str, args: &[RowValues]) -> Result<usize, DataAccessError> {
        debug!(sql, args = args.len(), "update");
        self.execute(sql, |stmt| {
            stmt.bind(args)?;
            let affected = stmt.execute_update()?;
            debug!(affected, "update done");
            Ok(affected)
        })
    }

    /// Run a query that must produce exactly one row and build a `T` from it.
    ///
    /// The row's column kinds, derived through the mapping table, must equal
    /// `T::signature()` position by position.
    ///
    /// # Errors
    ///
    /// Returns [`DataAccessError::IncorrectResultSize`] for zero rows or more than one row,
    /// [`ErrorKind::ColumnMapping`] for unmapped column types and [`ErrorKind::Construction`]
    /// when `T` has no matching factory.
    pub fn query_for_object<T: FromColumns>(
        &self,
        sql: &str,
        args: &[RowValues],
    ) -> Result<T, DataAccessError> {
        debug!(sql, args = args.len(), target_type = std::any::type_name::<T>(), "query_for_object");
        self.execute(sql, |stmt| {
            stmt.bind(args)?;
            let mut cursor = stmt.execute_query();
            // the row count is settled before any column is typed
            let first = match cursor.next_row()? {
                Some(row) => RawRow::read(&row)?,
                None => return Err(DataAccessError::incorrect_result_size(ResultSize::Empty)),
            };
            if cursor.next_row()?.is_some() {
                return Err(DataAccessError::incorrect_result_size(ResultSize::Multiple));
            }
            first.snapshot()?.instantiate()
        })
    }

    /// Run a query and map each row, in cursor order, through `mapper`.
    ///
    /// Zero rows yield an empty vector.
    ///
    /// # Errors
    ///
    /// Returns a [`DataAccessError`] if binding or execution fails, or the first error the
    /// mapper returns.
    pub fn query<T, M>(
        &self,
        sql: &str,
        mapper: M,
        args: &[RowValues],
    ) -> Result<Vec<T>, DataAccessError>
    where
        M: RowMapper<T>,
    {
        debug!(sql, args = args.len(), "query");
        self.execute(sql, |stmt| {
            stmt.bind(args)?;
            let mut cursor = stmt.execute_query();
            let mut results = Vec::new();
            while let Some(row) = cursor.next_row()? {
                let row_num = row.index();
                results.push(mapper.map_row(&row, row_num)?);
            }
            debug!(rows = results.len(), "query done");
            Ok(results)
        })
    }

    /// [`StatementExecutor::query`] with every row built through [`FromColumns`].
    ///
    /// # Errors
    ///
    /// As for [`StatementExecutor::query`], plus the construction errors of
    /// [`StatementExecutor::query_for_object`].
    pub fn query_for_list<T: FromColumns>(
        &self,
        sql: &str,
        args: &[RowValues],
    ) -> Result<Vec<T>, DataAccessError> {
        self.query(sql, ColumnsRowMapper::<T>::new(), args)
    }

    /// Run a script of one or more statements without arguments (schema setup and the like).
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Execution`] if any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<(), DataAccessError> {
        debug!(sql, "execute_batch");
        let result = self
            .data_source
            .with_connection(|conn| Ok(conn.execute_batch(sql)?));
        if let Err(err) = &result {
            error!(sql, error = %err, "batch failed");
        }
        result
    }
}
