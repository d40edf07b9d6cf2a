//! Filesystem-backed warehouse catalog.
//!
//! Layout under the warehouse root:
//!
//! ```text
//! <root>/<database>.db/<table>/part-00000.parquet
//!                              _SUCCESS
//!                              _table.json
//! ```
//!
//! A table is registered once its `_table.json` exists; the metadata file is
//! written after the data shards, so a listing never shows a half-written table.
//! Identifiers are case-insensitive and stored lower-cased.

pub mod sql;

use crate::error::WarehouseError;
use crate::io::csv::{CsvOptions, read_raw_records, write_csv_dir};
use crate::io::parquet::{parquet_row_count, read_parquet_rows, write_parquet_dir};
use crate::io::{SaveMode, shard_files};
use crate::schema::{Row, coerce_record, is_supported, type_name};
use anyhow::{Context, Result, bail};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_DATABASE: &str = "default";
const DATABASE_SUFFIX: &str = ".db";
const METADATA_FILE: &str = "_table.json";

/// On-disk storage format of a managed table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    #[default]
    Parquet,
    Csv,
}

impl TableFormat {
    pub fn name(&self) -> &'static str {
        match self {
            TableFormat::Parquet => "parquet",
            TableFormat::Csv => "csv",
        }
    }

    fn extension(&self) -> &'static str {
        self.name()
    }
}

/// `database.table`, with the database defaulting to [`DEFAULT_DATABASE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableIdent {
    pub database: String,
    pub table: String,
}

impl TableIdent {
    /// Parse `table` or `database.table`.
    ///
    /// # Errors
    /// Returns [`WarehouseError::InvalidIdentifier`] for empty parts, more than one
    /// dot, or characters outside `[A-Za-z0-9_]`.
    pub fn parse(name: &str) -> Result<Self, WarehouseError> {
        let parts: Vec<&str> = name.trim().split('.').collect();
        let (database, table) = match parts.as_slice() {
            [table] => (DEFAULT_DATABASE, *table),
            [database, table] => (*database, *table),
            _ => return Err(WarehouseError::InvalidIdentifier(name.to_string())),
        };
        Ok(Self {
            database: normalize_name(database)?,
            table: normalize_name(table)?,
        })
    }
}

impl std::fmt::Display for TableIdent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

/// Validate and lower-case a database or table name.
pub(crate) fn normalize_name(name: &str) -> Result<String, WarehouseError> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name.to_ascii_lowercase())
    } else {
        Err(WarehouseError::InvalidIdentifier(name.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

/// Contents of `_table.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub database: String,
    pub table: String,
    pub format: TableFormat,
    pub columns: Vec<ColumnSpec>,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
}

impl TableMetadata {
    fn new(ident: &TableIdent, schema: &Schema, format: TableFormat) -> Result<Self> {
        let columns = schema
            .fields()
            .iter()
            .map(|f| {
                if !is_supported(f.data_type()) {
                    bail!("column {} has unsupported type {}", f.name(), f.data_type());
                }
                Ok(ColumnSpec {
                    name: f.name().clone(),
                    data_type: type_name(f.data_type()).to_string(),
                    nullable: f.is_nullable(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Ok(Self {
            database: ident.database.clone(),
            table: ident.table.clone(),
            format,
            columns,
            created_at,
        })
    }

    /// Rebuild the Arrow schema recorded for this table.
    pub fn schema(&self) -> Result<SchemaRef> {
        let fields = self
            .columns
            .iter()
            .map(|c| {
                let dt = match c.data_type.as_str() {
                    "string" => DataType::Utf8,
                    "double" => DataType::Float64,
                    "bigint" => DataType::Int64,
                    other => bail!("column {} has unknown type '{other}'", c.name),
                };
                Ok(Field::new(&c.name, dt, c.nullable))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Arc::new(Schema::new(fields)))
    }
}

/// What [`Warehouse::save_as_table`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Replaced,
    Appended,
    /// [`SaveMode::Ignore`] on an existing table.
    Skipped,
}

/// Catalog of databases and managed tables rooted at one directory.
#[derive(Debug, Clone)]
pub struct Warehouse {
    root: PathBuf,
}

impl Warehouse {
    /// Open (creating if needed) a warehouse rooted at `root`, with its
    /// `default` database.
    ///
    /// # Errors
    /// Fails if the root directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let wh = Self { root: root.into() };
        fs::create_dir_all(&wh.root)
            .with_context(|| format!("mkdir -p {}", wh.root.display()))?;
        wh.create_database(DEFAULT_DATABASE, true)?;
        Ok(wh)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn database_dir(&self, database: &str) -> PathBuf {
        self.root.join(format!("{database}{DATABASE_SUFFIX}"))
    }

    /// Directory holding a table's shards and metadata.
    pub fn table_dir(&self, ident: &TableIdent) -> PathBuf {
        self.database_dir(&ident.database).join(&ident.table)
    }

    /// Database names, sorted.
    pub fn list_databases(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        let entries =
            fs::read_dir(&self.root).with_context(|| format!("list {}", self.root.display()))?;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry
                .file_name()
                .to_str()
                .and_then(|n| n.strip_suffix(DATABASE_SUFFIX))
            {
                out.push(name.to_string());
            }
        }
        out.sort();
        Ok(out)
    }

    pub fn database_exists(&self, database: &str) -> Result<bool> {
        Ok(self.database_dir(&normalize_name(database)?).is_dir())
    }

    /// Create a database. Returns `false` if it already existed and
    /// `if_not_exists` was set.
    ///
    /// # Errors
    /// [`WarehouseError::DatabaseAlreadyExists`] when it exists and
    /// `if_not_exists` is false; filesystem errors otherwise.
    pub fn create_database(&self, database: &str, if_not_exists: bool) -> Result<bool> {
        let database = normalize_name(database)?;
        let dir = self.database_dir(&database);
        if dir.is_dir() {
            if if_not_exists {
                return Ok(false);
            }
            return Err(WarehouseError::DatabaseAlreadyExists(database).into());
        }
        fs::create_dir_all(&dir).with_context(|| format!("mkdir -p {}", dir.display()))?;
        info!("created database {database}");
        Ok(true)
    }

    /// Registered table names in `database`, sorted.
    ///
    /// # Errors
    /// [`WarehouseError::DatabaseNotFound`] if the database does not exist.
    pub fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        let database = normalize_name(database)?;
        let dir = self.database_dir(&database);
        if !dir.is_dir() {
            return Err(WarehouseError::DatabaseNotFound(database).into());
        }
        let mut out = Vec::new();
        for entry in fs::read_dir(&dir).with_context(|| format!("list {}", dir.display()))? {
            let path = entry?.path();
            if path.join(METADATA_FILE).is_file()
                && let Some(name) = path.file_name().and_then(|n| n.to_str())
            {
                out.push(name.to_string());
            }
        }
        out.sort();
        Ok(out)
    }

    pub fn table_exists(&self, ident: &TableIdent) -> Result<bool> {
        Ok(self.table_dir(ident).join(METADATA_FILE).is_file())
    }

    /// Load a table's `_table.json`.
    ///
    /// # Errors
    /// [`WarehouseError::TableNotFound`] if the table is not registered.
    pub fn table_metadata(&self, ident: &TableIdent) -> Result<TableMetadata> {
        let path = self.table_dir(ident).join(METADATA_FILE);
        if !path.is_file() {
            return Err(WarehouseError::TableNotFound {
                database: ident.database.clone(),
                table: ident.table.clone(),
            }
            .into());
        }
        let f = File::open(&path).with_context(|| format!("open {}", path.display()))?;
        serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse {}", path.display()))
    }

    fn write_metadata(&self, meta: &TableMetadata, dir: &Path) -> Result<()> {
        let path = dir.join(METADATA_FILE);
        let f = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        serde_json::to_writer_pretty(f, meta).with_context(|| format!("write {}", path.display()))
    }

    /// Materialize partitions as a managed table.
    ///
    /// | mode | table absent | table present |
    /// |---|---|---|
    /// | `ErrorIfExists` | create | error |
    /// | `Overwrite` | create | replace data and metadata |
    /// | `Append` | create | add shards (schema must match) |
    /// | `Ignore` | create | skip |
    ///
    /// # Errors
    /// [`WarehouseError::DatabaseNotFound`] if the database is missing, plus the
    /// mode-specific errors above and any I/O failure.
    pub fn save_as_table(
        &self,
        ident: &TableIdent,
        schema: &SchemaRef,
        partitions: &[Vec<Row>],
        format: TableFormat,
        mode: SaveMode,
    ) -> Result<SaveOutcome> {
        if !self.database_exists(&ident.database)? {
            return Err(WarehouseError::DatabaseNotFound(ident.database.clone()).into());
        }
        let dir = self.table_dir(ident);
        let exists = self.table_exists(ident)?;

        let (outcome, write_mode, meta) = match (mode, exists) {
            (SaveMode::ErrorIfExists, true) => {
                return Err(WarehouseError::TableAlreadyExists {
                    database: ident.database.clone(),
                    table: ident.table.clone(),
                }
                .into());
            }
            (SaveMode::Ignore, true) => {
                info!("table {ident} exists; ignoring write");
                return Ok(SaveOutcome::Skipped);
            }
            (SaveMode::Append, true) => {
                let existing = self.table_metadata(ident)?;
                let incoming = TableMetadata::new(ident, schema, existing.format)?;
                if existing.columns != incoming.columns {
                    return Err(WarehouseError::SchemaMismatch {
                        table: ident.to_string(),
                    }
                    .into());
                }
                (SaveOutcome::Appended, SaveMode::Append, existing)
            }
            (SaveMode::Overwrite, true) => (
                SaveOutcome::Replaced,
                SaveMode::Overwrite,
                TableMetadata::new(ident, schema, format)?,
            ),
            // Leftovers from an unregistered, half-written table are discarded.
            (_, false) => (
                SaveOutcome::Created,
                SaveMode::Overwrite,
                TableMetadata::new(ident, schema, format)?,
            ),
        };

        match meta.format {
            TableFormat::Parquet => {
                write_parquet_dir(&dir, schema, partitions, write_mode)?;
            }
            TableFormat::Csv => {
                let opts = CsvOptions {
                    has_headers: true,
                    ..Default::default()
                };
                write_csv_dir(&dir, schema, partitions, &opts, write_mode)?;
            }
        }
        self.write_metadata(&meta, &dir)?;
        info!("{outcome:?} table {ident} ({} format)", meta.format.name());
        Ok(outcome)
    }

    /// Sorted data shards of a table.
    pub fn table_files(&self, ident: &TableIdent) -> Result<Vec<PathBuf>> {
        let meta = self.table_metadata(ident)?;
        shard_files(&self.table_dir(ident), meta.format.extension())
    }

    /// Read a whole table back as its recorded schema and rows, shard by shard.
    pub fn read_table(&self, ident: &TableIdent) -> Result<(SchemaRef, Vec<Row>)> {
        let meta = self.table_metadata(ident)?;
        let schema = meta.schema()?;
        let mut rows = Vec::new();
        for path in self.table_files(ident)? {
            debug!("reading {}", path.display());
            match meta.format {
                TableFormat::Parquet => rows.extend(read_parquet_rows(&path)?.1),
                TableFormat::Csv => {
                    let f = File::open(&path).with_context(|| format!("open {}", path.display()))?;
                    let opts = CsvOptions {
                        has_headers: true,
                        ..Default::default()
                    };
                    rows.extend(
                        read_raw_records(BufReader::new(f), &opts)?
                            .iter()
                            .map(|rec| coerce_record(rec, &schema, None)),
                    );
                }
            }
        }
        Ok((schema, rows))
    }

    /// Row count, from Parquet footers where possible.
    pub fn table_row_count(&self, ident: &TableIdent) -> Result<u64> {
        let meta = self.table_metadata(ident)?;
        match meta.format {
            TableFormat::Parquet => self
                .table_files(ident)?
                .iter()
                .map(parquet_row_count)
                .sum(),
            TableFormat::Csv => Ok(self.read_table(ident)?.1.len() as u64),
        }
    }

    /// Drop a table. Returns `false` if it was absent and `if_exists` was set.
    ///
    /// # Errors
    /// [`WarehouseError::TableNotFound`] when absent and `if_exists` is false.
    pub fn drop_table(&self, ident: &TableIdent, if_exists: bool) -> Result<bool> {
        if !self.table_exists(ident)? {
            if if_exists {
                return Ok(false);
            }
            return Err(WarehouseError::TableNotFound {
                database: ident.database.clone(),
                table: ident.table.clone(),
            }
            .into());
        }
        let dir = self.table_dir(ident);
        fs::remove_dir_all(&dir).with_context(|| format!("rm -r {}", dir.display()))?;
        info!("dropped table {ident}");
        Ok(true)
    }
}
