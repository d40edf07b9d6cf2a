//! The churn ingestion job.
//!
//! Reads the telco churn CSV from object storage, writes a single-shard local
//! copy, and populates the warehouse table on first run only.

use crate::config::{IngestConfig, NULL_SENTINEL};
use crate::frame::DataFrame;
use crate::io::SaveMode;
use crate::io::cloud::ObjectStoreIO;
use crate::io::storage::Location;
use crate::schema::{Value, telco_churn_schema};
use crate::session::Session;
use crate::warehouse::{SaveOutcome, TableFormat};
use anyhow::{Context, Result};
use log::{debug, info};
use std::sync::Arc;

const SHOW_ROWS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAction {
    Created,
    /// The table already existed and was left untouched.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub rows_read: usize,
    pub local_files: usize,
    pub table_action: TableAction,
}

/// Register a provider-backed object store for the scheme of the input URI.
///
/// Local roots need nothing, and a store already registered for the scheme is
/// kept. Returns the scheme a store was registered for, if any.
///
/// # Errors
/// Fails on a malformed input URI or a scheme no provider serves.
pub fn register_storage(session: &Session, config: &IngestConfig) -> Result<Option<String>> {
    let input = config.input_uri();
    let Location::Object { scheme, .. } = Location::parse(&input)? else {
        return Ok(None);
    };
    if session.object_store(&scheme).is_some() {
        debug!("keeping the object store already registered for {scheme}://");
        return Ok(None);
    }
    let store = ObjectStoreIO::from_env(&scheme)
        .with_context(|| format!("object store for {}", config.storage_root))?;
    session.register_object_store(&scheme, Arc::new(store));
    info!("serving {scheme}:// from the cloud provider");
    Ok(Some(scheme))
}

/// Run the job end to end on `session`.
///
/// # Errors
/// Any read, write or catalog failure aborts the run; nothing is retried and
/// partial output is not cleaned up.
pub fn run(session: &Session, config: &IngestConfig) -> Result<IngestReport> {
    let input = config.input_uri();
    info!("ingesting {input}");
    let df = session
        .read()
        .schema(telco_churn_schema())
        .header(true)
        .sep(b',')
        .null_value(NULL_SENTINEL)
        .csv(&input)
        .with_context(|| format!("read source {input}"))?;
    df.show(SHOW_ROWS)?;
    df.print_schema();

    let summary = df
        .coalesce(1)
        .write()
        .mode(SaveMode::Overwrite)
        .header(true)
        .csv(&config.local_output)
        .with_context(|| format!("write local copy to {}", config.local_output))?;
    info!(
        "local copy: {} row(s) in {} file(s) at {}",
        summary.rows,
        summary.files.len(),
        config.local_output
    );

    session.sql(&format!("CREATE DATABASE IF NOT EXISTS {}", config.database))?;
    session.sql("SHOW DATABASES")?.show(SHOW_ROWS)?;
    let tables = session.sql(&format!("SHOW TABLES IN {}", config.database))?;
    tables.show(SHOW_ROWS)?;

    let table = config.qualified_table();
    let table_action = if table_listed(&tables, &config.table)? {
        info!("table {table} already exists; leaving it unchanged");
        TableAction::Skipped
    } else {
        let outcome = df
            .write()
            .format(TableFormat::Parquet)
            .mode(SaveMode::Overwrite)
            .save_as_table(&table)
            .with_context(|| format!("create table {table}"))?;
        debug!("save_as_table returned {outcome:?}");
        match outcome {
            SaveOutcome::Skipped => TableAction::Skipped,
            _ => TableAction::Created,
        }
    };

    session.sql(&format!("SELECT * FROM {table}"))?.show(SHOW_ROWS)?;
    session
        .sql(&format!("DESCRIBE FORMATTED {table}"))?
        .show(usize::MAX)?;

    Ok(IngestReport {
        rows_read: summary.rows,
        local_files: summary.files.len(),
        table_action,
    })
}

fn table_listed(tables: &DataFrame, table: &str) -> Result<bool> {
    Ok(tables
        .column_values("tableName")?
        .iter()
        .any(|v| matches!(v, Value::Str(name) if name.eq_ignore_ascii_case(table))))
}
