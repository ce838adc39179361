use sql_template::prelude::*;

fn seeded() -> Result<SingleConnectionDataSource, DataAccessError> {
    let ds = SingleConnectionDataSource::in_memory()?;
    StatementExecutor::new(&ds).execute_batch(
        "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         INSERT INTO t VALUES (1, 'Ann'), (2, 'Bo'), (3, 'Cy');",
    )?;
    Ok(ds)
}

/// Fails if the call left a statement running on the connection.
fn assert_released(ds: &SingleConnectionDataSource) -> Result<(), DataAccessError> {
    let busy = ds.with_connection(|conn| Ok(conn.is_busy()))?;
    assert!(!busy, "a statement is still active");
    // DROP TABLE fails with SQLITE_LOCKED while a cursor on t is open
    ds.with_connection(|conn| Ok(conn.execute_batch("DROP TABLE t;")?))
}

#[test]
fn unreachable_database_is_a_connection_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing").join("db.sqlite");
    let ds = SqliteDataSource::new(SqliteOptions::new(path.to_string_lossy().into_owned()));
    let err = StatementExecutor::new(ds)
        .update("CREATE TABLE t (id INTEGER)", &[])
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Connection));
}

#[test]
fn malformed_sql_is_a_preparation_error() -> Result<(), Box<dyn std::error::Error>> {
    let ds = seeded()?;
    let executor = StatementExecutor::new(&ds);
    let err = executor.update("UPDAT t SET name = ?1", &[RowValues::Text("x".into())]).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Preparation));

    let err = executor.query_for_list::<i64>("SELECT nope FROM t", &[]).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Preparation));
    assert_released(&ds)?;
    Ok(())
}

#[test]
fn argument_count_mismatch_is_a_binding_error() -> Result<(), Box<dyn std::error::Error>> {
    let ds = seeded()?;
    let executor = StatementExecutor::new(&ds);
    let err = executor
        .update("UPDATE t SET name = ?1 WHERE id = ?2", &[RowValues::Text("x".into())])
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Binding));

    let err = executor
        .query_for_object::<String>(
            "SELECT name FROM t WHERE id = ?1",
            &[RowValues::Int(1), RowValues::Int(2)],
        )
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Binding));

    // nothing was written
    let names: Vec<String> = executor.query_for_list("SELECT name FROM t ORDER BY id", &[])?;
    assert_eq!(names, vec!["Ann", "Bo", "Cy"]);
    assert_released(&ds)?;
    Ok(())
}

#[test]
fn mapper_failure_mid_iteration_releases_the_cursor() -> Result<(), Box<dyn std::error::Error>> {
    let ds = seeded()?;
    let executor = StatementExecutor::new(&ds);
    let mapper = row_mapper(|row, row_num| {
        if row_num == 1 {
            return Err(DataAccessError::new(ErrorKind::ColumnMapping, "boom"));
        }
        row.get(1)
    });
    assert!(executor.query("SELECT id, name FROM t ORDER BY id", mapper, &[]).is_err());
    assert_released(&ds)?;
    Ok(())
}

#[test]
fn cardinality_failure_releases_the_cursor() -> Result<(), Box<dyn std::error::Error>> {
    let ds = seeded()?;
    let executor = StatementExecutor::new(&ds);
    let err = executor.query_for_object::<i64>("SELECT id FROM t", &[]).unwrap_err();
    assert!(err.is_incorrect_result_size());
    assert_released(&ds)?;
    Ok(())
}

#[test]
fn construction_failure_releases_the_cursor() -> Result<(), Box<dyn std::error::Error>> {
    let ds = seeded()?;
    let executor = StatementExecutor::new(&ds);
    let err = executor
        .query_for_object::<(String, i64)>("SELECT id, name FROM t WHERE id = 1", &[])
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Construction));
    assert_released(&ds)?;
    Ok(())
}

#[test]
fn operation_error_after_partial_reads_releases_the_cursor() -> Result<(), Box<dyn std::error::Error>> {
    let ds = seeded()?;
    let executor = StatementExecutor::new(&ds);
    let err = executor
        .execute("SELECT id FROM t", |stmt| {
            let mut cursor = stmt.execute_query();
            let _first = cursor.next_row()?;
            Err::<(), _>(DataAccessError::new(ErrorKind::Execution, "gave up"))
        })
        .unwrap_err();
    assert_eq!(err.to_string(), "SQL execution error: gave up");
    assert_released(&ds)?;
    Ok(())
}
