use sql_template::prelude::*;

fn numbers(count: i64) -> Result<StatementExecutor<SingleConnectionDataSource>, DataAccessError> {
    let executor = StatementExecutor::new(SingleConnectionDataSource::in_memory()?);
    executor.execute_batch("CREATE TABLE n (v INTEGER NOT NULL, label TEXT);")?;
    for v in 0..count {
        executor.update(
            "INSERT INTO n (v, label) VALUES (?1, ?2)",
            &[RowValues::Int(v), RowValues::Text(format!("n{v}"))],
        )?;
    }
    Ok(executor)
}

fn label_of(row: &Row<'_, '_>, _row_num: usize) -> Result<String, DataAccessError> {
    row.get_by_name("label")?
        .as_text()
        .map(str::to_string)
        .ok_or_else(|| DataAccessError::new(ErrorKind::ColumnMapping, "label is NULL"))
}

#[test]
fn empty_result_is_an_empty_vec() -> Result<(), Box<dyn std::error::Error>> {
    let executor = numbers(0)?;
    let rows = executor.query("SELECT v, label FROM n", label_of, &[])?;
    assert!(rows.is_empty());
    Ok(())
}

#[test]
fn rows_arrive_in_cursor_order_with_their_index() -> Result<(), Box<dyn std::error::Error>> {
    let executor = numbers(5)?;
    let mapper = row_mapper(|row, row_num| {
        let v = row.get(0)?.as_int().copied().unwrap_or_default();
        Ok((row_num, v))
    });
    let rows = executor.query("SELECT v FROM n ORDER BY v DESC", mapper, &[])?;
    assert_eq!(rows, vec![(0, 4), (1, 3), (2, 2), (3, 1), (4, 0)]);
    Ok(())
}

#[test]
fn arguments_filter_the_rows() -> Result<(), Box<dyn std::error::Error>> {
    let executor = numbers(10)?;
    let labels = executor.query(
        "SELECT v, label FROM n WHERE v >= ?1 AND v < ?2 ORDER BY v",
        label_of,
        &[RowValues::Int(3), RowValues::Int(6)],
    )?;
    assert_eq!(labels, vec!["n3", "n4", "n5"]);
    Ok(())
}

#[test]
fn mapper_error_stops_the_query() -> Result<(), Box<dyn std::error::Error>> {
    let executor = numbers(5)?;
    let mapper = row_mapper(|row, row_num| {
        if row_num == 2 {
            return Err(DataAccessError::new(ErrorKind::ColumnMapping, "stop at 2"));
        }
        row.get(0)
    });
    let err = executor
        .query("SELECT v FROM n ORDER BY v", mapper, &[])
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::ColumnMapping));
    assert!(err.to_string().contains("stop at 2"), "{err}");
    Ok(())
}

#[test]
fn query_for_list_builds_every_row() -> Result<(), Box<dyn std::error::Error>> {
    let executor = numbers(3)?;
    let rows: Vec<(i64, String)> =
        executor.query_for_list("SELECT v, label FROM n ORDER BY v", &[])?;
    assert_eq!(
        rows,
        vec![
            (0, "n0".to_string()),
            (1, "n1".to_string()),
            (2, "n2".to_string())
        ]
    );
    Ok(())
}

#[test]
fn rows_expose_column_metadata() -> Result<(), Box<dyn std::error::Error>> {
    let executor = numbers(1)?;
    let mapper = row_mapper(|row, _| {
        Ok((
            row.column_count(),
            row.column_name(1).map(str::to_string),
            row.column_decl_type(0).map(str::to_string),
            row.column_decl_type(2).is_none(),
            row.column_kind(1)?,
        ))
    });
    let rows = executor.query("SELECT v, label AS tag, v + 1 FROM n", mapper, &[])?;
    assert_eq!(
        rows,
        vec![(
            3,
            Some("tag".to_string()),
            Some("INTEGER".to_string()),
            true,
            Some(ValueKind::Text)
        )]
    );
    Ok(())
}

#[test]
fn missing_column_name_is_a_mapping_error() -> Result<(), Box<dyn std::error::Error>> {
    let executor = numbers(1)?;
    let err = executor
        .query(
            "SELECT v FROM n",
            row_mapper(|row, _| row.get_by_name("nope")),
            &[],
        )
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::ColumnMapping));
    Ok(())
}
