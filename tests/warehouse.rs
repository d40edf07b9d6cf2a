use anyhow::Result;
use arrow::datatypes::{DataType, Field, Schema};
use churnflow::io::SaveMode;
use churnflow::{
    Row, SaveOutcome, SessionBuilder, TableFormat, TableIdent, Value, Warehouse, WarehouseError,
};
use std::sync::Arc;

fn schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, true),
        Field::new("score", DataType::Float64, true),
        Field::new("visits", DataType::Int64, true),
    ]))
}

fn rows(range: std::ops::Range<i64>) -> Vec<Row> {
    range
        .map(|i| {
            vec![
                Value::Str(format!("c{i}")),
                if i % 4 == 0 { Value::Null } else { Value::Double(i as f64 / 2.0) },
                Value::Long(i),
            ]
        })
        .collect()
}

fn is_warehouse_error(err: &anyhow::Error, f: impl Fn(&WarehouseError) -> bool) -> bool {
    err.chain()
        .filter_map(|e| e.downcast_ref::<WarehouseError>())
        .any(f)
}

#[test]
fn databases_are_created_once() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let wh = Warehouse::open(tmp.path())?;
    assert_eq!(wh.list_databases()?, vec!["default"]);

    assert!(wh.create_database("Sales", false)?);
    assert!(!wh.create_database("sales", true)?);
    let err = wh.create_database("sales", false).unwrap_err();
    assert!(is_warehouse_error(&err, |e| matches!(
        e,
        WarehouseError::DatabaseAlreadyExists(_)
    )));
    assert_eq!(wh.list_databases()?, vec!["default", "sales"]);
    Ok(())
}

#[test]
fn save_modes_on_tables() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let wh = Warehouse::open(tmp.path())?;
    wh.create_database("demo", true)?;
    let ident = TableIdent::parse("demo.visits")?;
    let schema = schema();

    let created = wh.save_as_table(
        &ident,
        &schema,
        &[rows(0..3), rows(3..5)],
        TableFormat::Parquet,
        SaveMode::ErrorIfExists,
    )?;
    assert_eq!(created, SaveOutcome::Created);
    assert_eq!(wh.list_tables("demo")?, vec!["visits"]);
    assert_eq!(wh.table_row_count(&ident)?, 5);

    let err = wh
        .save_as_table(
            &ident,
            &schema,
            &[rows(0..1)],
            TableFormat::Parquet,
            SaveMode::ErrorIfExists,
        )
        .unwrap_err();
    assert!(is_warehouse_error(&err, |e| matches!(
        e,
        WarehouseError::TableAlreadyExists { .. }
    )));

    let ignored =
        wh.save_as_table(&ident, &schema, &[rows(0..1)], TableFormat::Parquet, SaveMode::Ignore)?;
    assert_eq!(ignored, SaveOutcome::Skipped);
    assert_eq!(wh.table_row_count(&ident)?, 5);

    let appended =
        wh.save_as_table(&ident, &schema, &[rows(5..7)], TableFormat::Parquet, SaveMode::Append)?;
    assert_eq!(appended, SaveOutcome::Appended);
    let (_, all) = wh.read_table(&ident)?;
    assert_eq!(all, rows(0..7));

    let replaced = wh.save_as_table(
        &ident,
        &schema,
        &[rows(10..12)],
        TableFormat::Parquet,
        SaveMode::Overwrite,
    )?;
    assert_eq!(replaced, SaveOutcome::Replaced);
    assert_eq!(wh.read_table(&ident)?.1, rows(10..12));
    Ok(())
}

#[test]
fn append_with_a_different_schema_is_rejected() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let wh = Warehouse::open(tmp.path())?;
    let ident = TableIdent::parse("visits")?;
    wh.save_as_table(&ident, &schema(), &[rows(0..2)], TableFormat::Parquet, SaveMode::Overwrite)?;

    let narrow = Arc::new(Schema::new(vec![Field::new("id", DataType::Utf8, true)]));
    let err = wh
        .save_as_table(
            &ident,
            &narrow,
            &[vec![vec![Value::Str("x".into())]]],
            TableFormat::Parquet,
            SaveMode::Append,
        )
        .unwrap_err();
    assert!(is_warehouse_error(&err, |e| matches!(
        e,
        WarehouseError::SchemaMismatch { .. }
    )));
    assert_eq!(wh.table_row_count(&ident)?, 2);
    Ok(())
}

#[test]
fn csv_tables_round_trip() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let wh = Warehouse::open(tmp.path())?;
    let ident = TableIdent::parse("default.visits_csv")?;
    wh.save_as_table(&ident, &schema(), &[rows(0..6)], TableFormat::Csv, SaveMode::ErrorIfExists)?;

    assert_eq!(wh.table_metadata(&ident)?.format, TableFormat::Csv);
    assert_eq!(wh.read_table(&ident)?.1, rows(0..6));
    assert_eq!(wh.table_row_count(&ident)?, 6);
    Ok(())
}

#[test]
fn missing_database_and_table_errors() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let wh = Warehouse::open(tmp.path())?;

    let err = wh.list_tables("nope").unwrap_err();
    assert!(is_warehouse_error(&err, |e| matches!(e, WarehouseError::DatabaseNotFound(_))));

    let ident = TableIdent::parse("nope.t")?;
    let err = wh
        .save_as_table(&ident, &schema(), &[], TableFormat::Parquet, SaveMode::Overwrite)
        .unwrap_err();
    assert!(is_warehouse_error(&err, |e| matches!(e, WarehouseError::DatabaseNotFound(_))));

    let ident = TableIdent::parse("default.t")?;
    assert!(!wh.drop_table(&ident, true)?);
    let err = wh.drop_table(&ident, false).unwrap_err();
    assert!(is_warehouse_error(&err, |e| matches!(e, WarehouseError::TableNotFound { .. })));
    Ok(())
}

#[test]
fn sql_surface_over_a_session() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let session = SessionBuilder::new()
        .master("local[2]")
        .warehouse_dir(tmp.path())
        .build()?;

    session.sql("CREATE DATABASE IF NOT EXISTS rvh_churn_demo")?;
    let dbs = session.sql("show databases;")?;
    assert_eq!(dbs.columns(), vec!["namespace"]);
    assert_eq!(
        dbs.column_values("namespace")?,
        vec![Value::Str("default".into()), Value::Str("rvh_churn_demo".into())]
    );

    let tables = session.sql("SHOW TABLES IN rvh_churn_demo")?;
    assert_eq!(tables.columns(), vec!["namespace", "tableName", "isTemporary"]);
    assert_eq!(tables.count()?, 0);

    let df = churnflow::DataFrame::from_rows(&session, schema(), rows(0..8));
    df.write().save_as_table("rvh_churn_demo.visits")?;

    let tables = session.sql("SHOW TABLES IN rvh_churn_demo")?;
    assert_eq!(tables.column_values("tableName")?, vec![Value::Str("visits".into())]);

    let all = session.sql("SELECT * FROM rvh_churn_demo.visits")?;
    assert_eq!(all.collect()?, rows(0..8));
    let limited = session.sql("select * from rvh_churn_demo.visits limit 3")?;
    assert_eq!(limited.count()?, 3);

    let described = session.sql("DESCRIBE rvh_churn_demo.visits")?.collect()?;
    assert_eq!(described.len(), 3);
    assert_eq!(described[1][0], Value::Str("score".into()));
    assert_eq!(described[1][1], Value::Str("double".into()));

    let formatted = session.sql("DESCRIBE FORMATTED rvh_churn_demo.visits")?.collect()?;
    let lookup = |key: &str| {
        formatted
            .iter()
            .find(|r| r[0] == Value::Str(key.into()))
            .map(|r| r[1].clone())
    };
    assert!(lookup("# Detailed Table Information").is_some());
    assert_eq!(lookup("Type"), Some(Value::Str("MANAGED".into())));
    assert_eq!(lookup("Provider"), Some(Value::Str("parquet".into())));
    assert_eq!(lookup("Num Rows"), Some(Value::Str("8".into())));

    session.sql("DROP TABLE rvh_churn_demo.visits")?;
    assert_eq!(session.sql("SHOW TABLES IN rvh_churn_demo")?.count()?, 0);

    let err = session.sql("UPDATE visits SET score = 1").unwrap_err();
    assert!(is_warehouse_error(&err, |e| matches!(
        e,
        WarehouseError::UnsupportedStatement(_)
    )));
    Ok(())
}
