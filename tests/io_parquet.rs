use anyhow::Result;
use arrow::datatypes::{DataType, Field, Schema};
use churnflow::io::SaveMode;
use churnflow::io::parquet::*;
use churnflow::{Row, Value};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Visit {
    id: Option<String>,
    score: Option<f64>,
    visits: Option<i64>,
}

fn schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, true),
        Field::new("score", DataType::Float64, true),
        Field::new("visits", DataType::Int64, true),
    ]))
}

fn sample() -> Vec<Row> {
    vec![
        vec![Value::Str("a".into()), Value::Double(1.5), Value::Long(3)],
        vec![Value::Null, Value::Null, Value::Null],
        vec![Value::Str("c".into()), Value::Double(-2.0), Value::Long(0)],
    ]
}

#[test]
fn rows_survive_a_parquet_file() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("visits.parquet");

    let n = write_parquet_rows(&path, &schema(), &sample())?;
    assert_eq!(n, 3);
    assert_eq!(parquet_row_count(&path)?, 3);

    let (read_schema, rows) = read_parquet_rows(&path)?;
    assert_eq!(read_schema.fields().len(), 3);
    assert_eq!(read_schema.field(1).data_type(), &DataType::Float64);
    assert_eq!(rows, sample());
    Ok(())
}

#[test]
fn typed_reads_through_serde_arrow() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("visits.parquet");
    write_parquet_rows(&path, &schema(), &sample())?;

    let visits: Vec<Visit> = read_parquet_vec(&path)?;
    assert_eq!(
        visits[0],
        Visit {
            id: Some("a".into()),
            score: Some(1.5),
            visits: Some(3)
        }
    );
    assert_eq!(
        visits[1],
        Visit {
            id: None,
            score: None,
            visits: None
        }
    );
    Ok(())
}

#[test]
fn width_and_type_mismatches_are_rejected() {
    let short = vec![vec![Value::Str("a".into())]];
    assert!(rows_to_batch(&schema(), &short).is_err());

    let wrong = vec![vec![
        Value::Str("a".into()),
        Value::Str("not a number".into()),
        Value::Long(1),
    ]];
    assert!(rows_to_batch(&schema(), &wrong).is_err());
}

#[test]
fn directory_write_keeps_partition_order() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let dir = tmp.path().join("table");
    let rows = sample();
    let parts = vec![rows[..2].to_vec(), rows[2..].to_vec()];

    let files = write_parquet_dir(&dir, &schema(), &parts, SaveMode::Overwrite)?
        .expect("overwrite always writes");
    assert_eq!(
        files,
        vec![dir.join(shard_name(0)), dir.join(shard_name(1))]
    );
    let mut back = Vec::new();
    for f in &files {
        back.extend(read_parquet_rows(f)?.1);
    }
    assert_eq!(back, rows);

    assert!(write_parquet_dir(&dir, &schema(), &parts, SaveMode::Ignore)?.is_none());
    Ok(())
}

#[test]
fn empty_input_still_writes_a_readable_shard() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let dir = tmp.path().join("empty");
    let files = write_parquet_dir(&dir, &schema(), &[], SaveMode::ErrorIfExists)?
        .expect("fresh directory");
    assert_eq!(files.len(), 1);
    let (s, rows) = read_parquet_rows(&files[0])?;
    assert_eq!(s.fields().len(), 3);
    assert!(rows.is_empty());
    Ok(())
}
