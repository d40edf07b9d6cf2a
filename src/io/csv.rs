//! Delimited-text I/O for schema-typed rows.
//!
//! - [`read_raw_records`] pulls every record as text; typing happens later in a
//!   pipeline stage so it runs per partition.
//! - [`write_csv_shard`] writes one file; [`write_csv_dir`] writes one
//!   `part-NNNNN.csv` per partition plus a `_SUCCESS` marker, honouring a
//!   [`SaveMode`].
//!
//! Output is deterministic: shards are numbered by partition index, nulls are
//! empty fields and doubles use a fixed rendering.

use crate::io::{SaveMode, prepare_output_dir, write_success_marker};
use crate::schema::Row;
use anyhow::{Context, Result};
use arrow::datatypes::Schema;
use csv::{ByteRecord, ReaderBuilder, WriterBuilder};
use log::{debug, info};
use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};

/// Reader/writer knobs shared by both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    pub has_headers: bool,
    pub delimiter: u8,
    /// Field text that reads as null.
    pub null_value: Option<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_headers: false,
            delimiter: b',',
            null_value: None,
        }
    }
}

/// Outcome of a directory write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvWriteSummary {
    pub files: Vec<PathBuf>,
    pub rows: usize,
    /// `true` when [`SaveMode::Ignore`] found an existing destination.
    pub skipped: bool,
}

/// Read every record of a delimited stream as raw text fields.
///
/// Records may have any number of fields; invalid UTF-8 is replaced rather than
/// rejected. When `has_headers` is set the first record is skipped.
///
/// # Errors
/// Returns an error if the underlying reader fails mid-stream.
pub fn read_raw_records<R: Read>(reader: R, opts: &CsvOptions) -> Result<Vec<Vec<String>>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(opts.has_headers)
        .delimiter(opts.delimiter)
        .flexible(true)
        .from_reader(reader);
    let mut out = Vec::new();
    let mut rec = ByteRecord::new();
    let mut i = 0usize;
    while rdr
        .read_byte_record(&mut rec)
        .with_context(|| format!("parse CSV record #{}", i + 1))?
    {
        out.push(
            rec.iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect(),
        );
        i += 1;
    }
    debug!("read {} raw record(s)", out.len());
    Ok(out)
}

/// Write `rows` to a single delimited file, creating parent directories.
///
/// # Returns
/// The number of data rows written (header excluded).
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn write_csv_shard(
    path: impl AsRef<Path>,
    schema: &Schema,
    rows: &[Row],
    opts: &CsvOptions,
) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .delimiter(opts.delimiter)
        .from_writer(BufWriter::new(f));
    if opts.has_headers {
        wtr.write_record(schema.fields().iter().map(|f| f.name().as_str()))
            .with_context(|| format!("write header to {}", path.display()))?;
    }
    for (i, row) in rows.iter().enumerate() {
        wtr.write_record(row.iter().map(|v| v.to_field()))
            .with_context(|| format!("serialize CSV row #{}", i + 1))?;
    }
    wtr.flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(rows.len())
}

/// Shard file name for partition `index`.
pub fn shard_name(index: usize) -> String {
    format!("part-{index:05}.csv")
}

/// Write one shard per partition into `dir`, then drop a `_SUCCESS` marker.
///
/// # Errors
/// Fails on any filesystem error, or with
/// [`StorageError::AlreadyExists`](crate::error::StorageError::AlreadyExists) under
/// [`SaveMode::ErrorIfExists`]. Partially written shards are left in place.
pub fn write_csv_dir(
    dir: impl AsRef<Path>,
    schema: &Schema,
    partitions: &[Vec<Row>],
    opts: &CsvOptions,
    mode: SaveMode,
) -> Result<CsvWriteSummary> {
    let dir = dir.as_ref();
    let Some(start) = prepare_output_dir(dir, mode)? else {
        info!("{} exists; skipping write", dir.display());
        return Ok(CsvWriteSummary {
            skipped: true,
            ..Default::default()
        });
    };

    let mut summary = CsvWriteSummary::default();
    for (i, rows) in partitions.iter().enumerate() {
        let path = dir.join(shard_name(start + i));
        summary.rows += write_csv_shard(&path, schema, rows, opts)?;
        summary.files.push(path);
    }
    write_success_marker(dir)?;
    info!(
        "wrote {} row(s) in {} shard(s) to {}",
        summary.rows,
        summary.files.len(),
        dir.display()
    );
    Ok(summary)
}
