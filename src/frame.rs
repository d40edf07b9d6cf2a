//! Schema-carrying frames over deferred pipelines.
//!
//! A [`DataFrame`] pairs an Arrow schema with a lazy [`PCollection`] of rows.
//! Each read or query starts its own [`Pipeline`], so dropping the last frame of
//! a lineage releases its source rows.
//! Nothing executes until a terminal call (`collect`, `count`, `show`, a write)
//! runs the plan on the session's runner.

use crate::collection::{PCollection, from_vec};
use crate::io::SaveMode;
use crate::io::csv::{CsvOptions, CsvWriteSummary, read_raw_records, write_csv_dir};
use crate::io::parquet::write_parquet_dir;
use crate::io::storage::{local_path, open_input};
use crate::pipeline::Pipeline;
use crate::schema::{Row, Value, coerce_record, is_supported, type_name};
use crate::session::Session;
use crate::warehouse::{SaveOutcome, TableFormat, TableIdent};
use anyhow::{Context, Result, anyhow, bail};
use arrow::datatypes::SchemaRef;
use log::{debug, info};
use std::fmt::Write as _;
use std::path::PathBuf;

const SHOW_TRUNCATE: usize = 20;

#[derive(Clone)]
pub struct DataFrame {
    session: Session,
    schema: SchemaRef,
    rows: PCollection<Row>,
}

impl std::fmt::Debug for DataFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFrame")
            .field("columns", &self.columns())
            .finish_non_exhaustive()
    }
}

impl DataFrame {
    /// Wrap in-memory rows as a frame executed by `session`.
    pub fn from_rows(session: &Session, schema: SchemaRef, rows: Vec<Row>) -> Self {
        let rows = from_vec(&Pipeline::default(), rows);
        Self {
            session: session.clone(),
            schema,
            rows,
        }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn columns(&self) -> Vec<String> {
        self.schema.fields().iter().map(|f| f.name().clone()).collect()
    }

    pub fn collect(&self) -> Result<Vec<Row>> {
        self.rows.collect_with(self.session.runner())
    }

    /// Evaluate and keep the partition layout.
    pub fn partitions(&self) -> Result<Vec<Vec<Row>>> {
        self.rows.collect_partitions(self.session.runner())
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.partitions()?.iter().map(Vec::len).sum())
    }

    /// Redistribute rows into `n` partitions.
    pub fn repartition(&self, n: usize) -> Self {
        Self {
            session: self.session.clone(),
            schema: self.schema.clone(),
            rows: self.rows.clone().repartition(n),
        }
    }

    /// Reduce to at most `n` partitions. `coalesce(1)` yields a single shard on
    /// write.
    pub fn coalesce(&self, n: usize) -> Self {
        self.repartition(n)
    }

    /// All values of one column, in row order.
    ///
    /// # Errors
    /// Fails if `name` is not a column of this frame.
    pub fn column_values(&self, name: &str) -> Result<Vec<Value>> {
        let idx = self
            .schema
            .index_of(name)
            .map_err(|_| anyhow!("no column named '{name}' in {:?}", self.columns()))?;
        self.rows
            .clone()
            .map(move |row: &Row| row.get(idx).cloned().unwrap_or(Value::Null))
            .collect_with(self.session.runner())
    }

    /// Render the first `n` rows as a bordered text table.
    ///
    /// Cells longer than 20 characters are cut to 17 plus `...`; a footer notes
    /// when more rows exist.
    pub fn show_string(&self, n: usize) -> Result<String> {
        let rows = self.collect()?;
        let more = rows.len() > n;
        let cells: Vec<Vec<String>> = rows
            .iter()
            .take(n)
            .map(|row| row.iter().map(|v| truncate_cell(&v.to_string())).collect())
            .collect();
        let header = self.columns();

        let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count().max(3)).collect();
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let border: String = widths.iter().fold(String::from("+"), |mut s, w| {
            s.push_str(&"-".repeat(*w));
            s.push('+');
            s
        });
        let line = |values: &[String]| {
            let mut s = String::from("|");
            for (v, w) in values.iter().zip(&widths) {
                let pad = w.saturating_sub(v.chars().count());
                s.push_str(&" ".repeat(pad));
                s.push_str(v);
                s.push('|');
            }
            s
        };

        let mut out = String::new();
        writeln!(out, "{border}")?;
        writeln!(out, "{}", line(header.as_slice()))?;
        writeln!(out, "{border}")?;
        for row in &cells {
            writeln!(out, "{}", line(row.as_slice()))?;
        }
        writeln!(out, "{border}")?;
        if more {
            let noun = if n == 1 { "row" } else { "rows" };
            writeln!(out, "only showing top {n} {noun}")?;
        }
        Ok(out)
    }

    /// Log the first `n` rows at info level.
    pub fn show(&self, n: usize) -> Result<()> {
        info!("\n{}", self.show_string(n)?);
        Ok(())
    }

    /// Schema as an indented tree.
    pub fn schema_tree(&self) -> String {
        let mut out = String::from("root\n");
        for f in self.schema.fields() {
            out.push_str(&format!(
                " |-- {}: {} (nullable = {})\n",
                f.name(),
                type_name(f.data_type()),
                f.is_nullable()
            ));
        }
        out
    }

    pub fn print_schema(&self) {
        info!("\n{}", self.schema_tree());
    }

    pub fn write(&self) -> DataFrameWriter {
        DataFrameWriter {
            frame: self.clone(),
            mode: SaveMode::default(),
            format: TableFormat::default(),
            opts: CsvOptions::default(),
        }
    }
}

fn truncate_cell(s: &str) -> String {
    if s.chars().count() > SHOW_TRUNCATE {
        let mut t: String = s.chars().take(SHOW_TRUNCATE - 3).collect();
        t.push_str("...");
        t
    } else {
        s.to_string()
    }
}

/// Builder for reading delimited files against a declared schema.
pub struct DataFrameReader {
    session: Session,
    schema: Option<SchemaRef>,
    opts: CsvOptions,
}

impl DataFrameReader {
    pub(crate) fn new(session: Session) -> Self {
        Self {
            session,
            schema: None,
            opts: CsvOptions::default(),
        }
    }

    /// Declared schema; columns are matched by position.
    pub fn schema(mut self, schema: SchemaRef) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn header(mut self, has_headers: bool) -> Self {
        self.opts.has_headers = has_headers;
        self
    }

    pub fn sep(mut self, delimiter: u8) -> Self {
        self.opts.delimiter = delimiter;
        self
    }

    /// Field text to read as null in every column.
    pub fn null_value(mut self, sentinel: impl Into<String>) -> Self {
        self.opts.null_value = Some(sentinel.into());
        self
    }

    /// Read a delimited file from a local path or a registered object store.
    ///
    /// Raw records are loaded eagerly; coercion to the schema is a pipeline stage
    /// that runs per partition on the session pool when the frame is evaluated.
    ///
    /// # Errors
    /// Fails without a schema, on column types that cannot be coerced, or when
    /// the input cannot be opened or parsed as CSV.
    pub fn csv(self, uri: &str) -> Result<DataFrame> {
        let Some(schema) = self.schema else {
            bail!("reading {uri}: a schema is required, inference is not supported");
        };
        if let Some(f) = schema.fields().iter().find(|f| !is_supported(f.data_type())) {
            bail!("column {} has unsupported type {}", f.name(), f.data_type());
        }
        let input = open_input(&self.session, uri)?;
        let records = read_raw_records(input, &self.opts).with_context(|| format!("read {uri}"))?;
        info!("read {} record(s) from {uri}", records.len());

        let typed_schema = schema.clone();
        let null_value = self.opts.null_value.clone();
        let rows = from_vec(&Pipeline::default(), records).map(move |rec: &Vec<String>| {
            coerce_record(rec, &typed_schema, null_value.as_deref())
        });
        Ok(DataFrame {
            session: self.session,
            schema,
            rows,
        })
    }
}

/// Builder for persisting a frame to files or the warehouse.
pub struct DataFrameWriter {
    frame: DataFrame,
    mode: SaveMode,
    format: TableFormat,
    opts: CsvOptions,
}

impl DataFrameWriter {
    pub fn mode(mut self, mode: SaveMode) -> Self {
        self.mode = mode;
        self
    }

    /// Storage format used by [`save_as_table`](Self::save_as_table).
    pub fn format(mut self, format: TableFormat) -> Self {
        self.format = format;
        self
    }

    pub fn header(mut self, has_headers: bool) -> Self {
        self.opts.has_headers = has_headers;
        self
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.opts.delimiter = delimiter;
        self
    }

    /// Write one CSV shard per partition into the local directory `uri`.
    ///
    /// # Errors
    /// Fails for non-local destinations, on evaluation errors, and on any
    /// filesystem error or save-mode conflict.
    pub fn csv(self, uri: &str) -> Result<CsvWriteSummary> {
        let dir = local_path(uri)?;
        let parts = self.frame.partitions()?;
        debug!("writing {} partition(s) as csv to {}", parts.len(), dir.display());
        write_csv_dir(&dir, &self.frame.schema, &parts, &self.opts, self.mode)
    }

    /// Write one Parquet shard per partition into the local directory `uri`.
    ///
    /// # Errors
    /// As for [`csv`](Self::csv).
    pub fn parquet(self, uri: &str) -> Result<Option<Vec<PathBuf>>> {
        let dir = local_path(uri)?;
        let parts = self.frame.partitions()?;
        write_parquet_dir(&dir, &self.frame.schema, &parts, self.mode)
    }

    /// Persist as a managed warehouse table named `db.table` (or `table`).
    ///
    /// # Errors
    /// Identifier, catalog, evaluation and I/O errors.
    pub fn save_as_table(self, name: &str) -> Result<SaveOutcome> {
        let ident = TableIdent::parse(name)?;
        let parts = self.frame.partitions()?;
        self.frame.session.warehouse().save_as_table(
            &ident,
            &self.frame.schema,
            &parts,
            self.format,
            self.mode,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn dropping_a_frame_releases_its_graph() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let session = Session::builder().master("local").warehouse_dir(tmp.path()).build()?;
        let df = session.sql("SHOW DATABASES")?;
        let other = session.sql("SHOW DATABASES")?;
        assert!(!Arc::ptr_eq(&df.rows.pipeline.inner, &other.rows.pipeline.inner));

        let graph = Arc::downgrade(&df.rows.pipeline.inner);
        let copy = df.coalesce(1);
        drop(df);
        assert!(graph.upgrade().is_some());
        drop(copy);
        assert!(graph.upgrade().is_none());
        Ok(())
    }

    #[test]
    fn long_cells_are_truncated() {
        assert_eq!(truncate_cell("Electronic check"), "Electronic check");
        assert_eq!(
            truncate_cell("Bank transfer (automatic)"),
            "Bank transfer (au..."
        );
    }
}
