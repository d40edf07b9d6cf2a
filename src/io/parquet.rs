//! Parquet I/O for schema-typed rows.
//!
//! - [`rows_to_batch`] / [`batch_to_rows`] convert between [`Row`]s and Arrow
//!   `RecordBatch`es for the column types in [`crate::schema`].
//! - [`write_parquet_rows`] and [`read_parquet_rows`] move one file at a time;
//!   [`write_parquet_dir`] writes one `part-NNNNN.parquet` per partition.
//! - [`read_parquet_vec`] deserializes a file straight into user structs through
//!   `serde_arrow`, for consumers that prefer typed records.
//! - [`parquet_row_count`] reads the row count from the footer only.

use crate::io::{SaveMode, prepare_output_dir, write_success_marker};
use crate::schema::{Row, Value, type_name};
use anyhow::{Context, Result, anyhow, bail};
use arrow::array::{
    Array, ArrayRef, Float64Array, Float64Builder, Int64Array, Int64Builder, StringArray,
    StringBuilder,
};
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use serde::de::DeserializeOwned;
use serde_arrow::from_record_batch;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Build a `RecordBatch` from rows aligned with `schema`.
///
/// # Errors
/// Fails if a row has the wrong width or a value does not fit its column type.
pub fn rows_to_batch(schema: &SchemaRef, rows: &[Row]) -> Result<RecordBatch> {
    let width = schema.fields().len();
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        bail!("row #{} has {} values, schema has {width}", i + 1, row.len());
    }

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(width);
    for (c, field) in schema.fields().iter().enumerate() {
        let column: ArrayRef = match field.data_type() {
            DataType::Utf8 => {
                let mut b = StringBuilder::with_capacity(rows.len(), rows.len() * 8);
                for row in rows {
                    match &row[c] {
                        Value::Null => b.append_null(),
                        Value::Str(s) => b.append_value(s),
                        other => b.append_value(other.to_string()),
                    }
                }
                Arc::new(b.finish())
            }
            DataType::Float64 => {
                let mut b = Float64Builder::with_capacity(rows.len());
                for row in rows {
                    match &row[c] {
                        Value::Null => b.append_null(),
                        v => b.append_value(v.as_f64().ok_or_else(|| {
                            anyhow!("column {} expects a double, got '{v}'", field.name())
                        })?),
                    }
                }
                Arc::new(b.finish())
            }
            DataType::Int64 => {
                let mut b = Int64Builder::with_capacity(rows.len());
                for row in rows {
                    match &row[c] {
                        Value::Null => b.append_null(),
                        Value::Long(l) => b.append_value(*l),
                        v => bail!("column {} expects a bigint, got '{v}'", field.name()),
                    }
                }
                Arc::new(b.finish())
            }
            other => bail!("column {} has unsupported type {other}", field.name()),
        };
        columns.push(column);
    }
    RecordBatch::try_new(Arc::clone(schema), columns).context("assemble RecordBatch")
}

/// Convert a `RecordBatch` back into rows.
///
/// # Errors
/// Fails on column types outside [`crate::schema::is_supported`].
pub fn batch_to_rows(batch: &RecordBatch) -> Result<Vec<Row>> {
    let mut rows: Vec<Row> = vec![Vec::with_capacity(batch.num_columns()); batch.num_rows()];
    for (c, field) in batch.schema().fields().iter().enumerate() {
        let col = batch.column(c);
        macro_rules! push_column {
            ($array:ty, $make:expr) => {{
                let arr = col
                    .as_any()
                    .downcast_ref::<$array>()
                    .ok_or_else(|| {
                        anyhow!("column {} is not {}", field.name(), type_name(field.data_type()))
                    })?;
                for (r, row) in rows.iter_mut().enumerate() {
                    row.push(if arr.is_null(r) {
                        Value::Null
                    } else {
                        $make(arr.value(r))
                    });
                }
            }};
        }
        match field.data_type() {
            DataType::Utf8 => push_column!(StringArray, |s: &str| Value::Str(s.to_string())),
            DataType::Float64 => push_column!(Float64Array, Value::Double),
            DataType::Int64 => push_column!(Int64Array, Value::Long),
            other => bail!("column {} has unsupported type {other}", field.name()),
        }
    }
    Ok(rows)
}

/// Write rows to a single Parquet file.
///
/// A zero-row file is still written so the schema survives.
///
/// # Returns
/// Number of rows written.
///
/// # Errors
/// An error is returned if conversion, file creation, or writing fails.
pub fn write_parquet_rows(
    path: impl AsRef<Path>,
    schema: &SchemaRef,
    rows: &[Row],
) -> Result<usize> {
    let path = path.as_ref();
    let batch = rows_to_batch(schema, rows)?;

    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let props = WriterProperties::builder().build();
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), Some(props)).context("create ArrowWriter")?;
    writer.write(&batch).context("write batch to parquet")?;
    writer.close().context("close ArrowWriter")?;
    Ok(rows.len())
}

/// Shard file name for partition `index`.
pub fn shard_name(index: usize) -> String {
    format!("part-{index:05}.parquet")
}

/// Write one Parquet shard per partition into `dir`.
///
/// With no partitions at all a single empty shard is written so the schema is
/// still readable. Returns `None` when `mode` is [`SaveMode::Ignore`] and `dir`
/// already exists.
///
/// # Errors
/// Fails on conversion or filesystem errors; shards already written stay.
pub fn write_parquet_dir(
    dir: impl AsRef<Path>,
    schema: &SchemaRef,
    partitions: &[Vec<Row>],
    mode: SaveMode,
) -> Result<Option<Vec<PathBuf>>> {
    let dir = dir.as_ref();
    let Some(start) = prepare_output_dir(dir, mode)? else {
        info!("{} exists; skipping write", dir.display());
        return Ok(None);
    };
    let empty: [Vec<Row>; 1] = [Vec::new()];
    let partitions = if partitions.is_empty() { &empty[..] } else { partitions };

    let mut files = Vec::with_capacity(partitions.len());
    let mut rows = 0usize;
    for (i, part) in partitions.iter().enumerate() {
        let path = dir.join(shard_name(start + i));
        rows += write_parquet_rows(&path, schema, part)?;
        files.push(path);
    }
    write_success_marker(dir)?;
    info!(
        "wrote {rows} row(s) in {} parquet shard(s) to {}",
        files.len(),
        dir.display()
    );
    Ok(Some(files))
}

/// Read a whole Parquet file into its schema and rows.
///
/// # Errors
/// Returns an error if the file cannot be opened or decoded.
pub fn read_parquet_rows(path: impl AsRef<Path>) -> Result<(SchemaRef, Vec<Row>)> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("open ParquetRecordBatchReader")?;
    let schema = Arc::clone(builder.schema());
    let reader = builder
        .with_batch_size(64 * 1024)
        .build()
        .context("build ParquetRecordBatchReader")?;

    let mut out: Vec<Row> = Vec::new();
    for batch in reader {
        let batch = batch.context("read next batch")?;
        out.extend(batch_to_rows(&batch)?);
    }
    Ok((schema, out))
}

/// Read a Parquet file into a typed `Vec<T>` via `serde_arrow`.
///
/// Field names of `T` must match the column names; nullable columns map to
/// `Option` fields.
///
/// # Errors
/// Returns an error if the file cannot be read or a batch does not fit `T`.
pub fn read_parquet_vec<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("open ParquetRecordBatchReader")?
        .build()
        .context("build ParquetRecordBatchReader")?;

    let mut out: Vec<T> = Vec::new();
    for batch in reader {
        let batch = batch.context("read next batch")?;
        let mut rows: Vec<T> =
            from_record_batch(&batch).context("deserialize RecordBatch rows to T")?;
        out.append(&mut rows);
    }
    Ok(out)
}

/// Total row count from the file footer, without decoding any pages.
///
/// # Errors
/// Returns an error if the file or its metadata cannot be read.
pub fn parquet_row_count(path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = SerializedFileReader::new(f).context("open SerializedFileReader")?;
    let meta = reader.metadata();
    Ok((0..meta.num_row_groups())
        .map(|i| meta.row_group(i).num_rows().cast_unsigned())
        .sum())
}
