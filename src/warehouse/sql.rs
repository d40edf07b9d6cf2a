//! The small catalog-query dialect accepted by `Session::sql`.
//!
//! Keywords are case-insensitive and a trailing `;` is ignored. Supported forms:
//!
//! ```text
//! SHOW DATABASES
//! SHOW TABLES [IN|FROM db]
//! DESCRIBE [FORMATTED|EXTENDED] [db.]table
//! SELECT * FROM [db.]table [LIMIT n]
//! CREATE DATABASE [IF NOT EXISTS] db
//! DROP TABLE [IF EXISTS] [db.]table
//! ```

use super::{DEFAULT_DATABASE, TableIdent, Warehouse, normalize_name};
use crate::error::WarehouseError;
use crate::schema::{Row, Value, type_name};
use anyhow::Result;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use log::debug;
use regex::Regex;
use std::sync::{Arc, LazyLock};

const IDENT: &str = r"[A-Za-z_][A-Za-z0-9_]*";

macro_rules! statement_regex {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(&format!(r"(?i)^\s*{}\s*$", $pattern)).expect("statement regex is valid")
        });
    };
}

statement_regex!(SHOW_DATABASES, r"SHOW\s+(?:DATABASES|SCHEMAS)");
statement_regex!(
    SHOW_TABLES,
    format!(r"SHOW\s+TABLES(?:\s+(?:IN|FROM)\s+(?P<db>{IDENT}))?")
);
statement_regex!(
    DESCRIBE,
    format!(
        concat!(
            r"(?:DESCRIBE|DESC)(?:\s+TABLE)?(?:\s+(?P<detail>FORMATTED|EXTENDED))?",
            r"\s+(?P<table>{IDENT}(?:\.{IDENT})?)"
        ),
        IDENT = IDENT
    )
);
statement_regex!(
    SELECT_ALL,
    format!(r"SELECT\s+\*\s+FROM\s+(?P<table>{IDENT}(?:\.{IDENT})?)(?:\s+LIMIT\s+(?P<limit>\d+))?")
);
statement_regex!(
    CREATE_DATABASE,
    format!(r"CREATE\s+(?:DATABASE|SCHEMA)(?P<ine>\s+IF\s+NOT\s+EXISTS)?\s+(?P<db>{IDENT})")
);
statement_regex!(
    DROP_TABLE,
    format!(r"DROP\s+TABLE(?P<ie>\s+IF\s+EXISTS)?\s+(?P<table>{IDENT}(?:\.{IDENT})?)")
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    ShowDatabases,
    ShowTables { database: String },
    Describe { table: TableIdent, detailed: bool },
    SelectAll { table: TableIdent, limit: Option<usize> },
    CreateDatabase { name: String, if_not_exists: bool },
    DropTable { table: TableIdent, if_exists: bool },
}

impl Statement {
    /// Parse one statement.
    ///
    /// # Errors
    /// [`WarehouseError::UnsupportedStatement`] for anything outside the dialect,
    /// [`WarehouseError::InvalidIdentifier`] for malformed names.
    pub fn parse(text: &str) -> Result<Self, WarehouseError> {
        let text = text.trim().trim_end_matches(';');
        if SHOW_DATABASES.is_match(text) {
            return Ok(Statement::ShowDatabases);
        }
        if let Some(c) = SHOW_TABLES.captures(text) {
            let database = match c.name("db") {
                Some(db) => normalize_name(db.as_str())?,
                None => DEFAULT_DATABASE.to_string(),
            };
            return Ok(Statement::ShowTables { database });
        }
        if let Some(c) = DESCRIBE.captures(text) {
            return Ok(Statement::Describe {
                table: TableIdent::parse(&c["table"])?,
                detailed: c.name("detail").is_some(),
            });
        }
        if let Some(c) = SELECT_ALL.captures(text) {
            let limit = c
                .name("limit")
                .map(|m| m.as_str().parse::<usize>())
                .transpose()
                .map_err(|_| WarehouseError::UnsupportedStatement(text.to_string()))?;
            return Ok(Statement::SelectAll {
                table: TableIdent::parse(&c["table"])?,
                limit,
            });
        }
        if let Some(c) = CREATE_DATABASE.captures(text) {
            return Ok(Statement::CreateDatabase {
                name: normalize_name(&c["db"])?,
                if_not_exists: c.name("ine").is_some(),
            });
        }
        if let Some(c) = DROP_TABLE.captures(text) {
            return Ok(Statement::DropTable {
                table: TableIdent::parse(&c["table"])?,
                if_exists: c.name("ie").is_some(),
            });
        }
        Err(WarehouseError::UnsupportedStatement(text.to_string()))
    }
}

/// Tabular result of a statement.
#[derive(Debug, Clone)]
pub struct QueryOutput {
    pub schema: SchemaRef,
    pub rows: Vec<Row>,
}

impl QueryOutput {
    fn empty() -> Self {
        Self {
            schema: Arc::new(Schema::empty()),
            rows: Vec::new(),
        }
    }
}

fn string_schema(names: &[&str]) -> SchemaRef {
    Arc::new(Schema::new(
        names
            .iter()
            .map(|n| Field::new(*n, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ))
}

fn text(s: impl Into<String>) -> Value {
    Value::Str(s.into())
}

/// Run a parsed statement against `warehouse`.
///
/// # Errors
/// Catalog errors from the warehouse (missing database or table, and so on) and
/// any I/O failure while reading table data.
pub fn execute(warehouse: &Warehouse, stmt: &Statement) -> Result<QueryOutput> {
    debug!("executing {stmt:?}");
    match stmt {
        Statement::ShowDatabases => Ok(QueryOutput {
            schema: string_schema(&["namespace"]),
            rows: warehouse
                .list_databases()?
                .into_iter()
                .map(|db| vec![text(db)])
                .collect(),
        }),
        Statement::ShowTables { database } => {
            let schema = Arc::new(Schema::new(vec![
                Field::new("namespace", DataType::Utf8, true),
                Field::new("tableName", DataType::Utf8, true),
                Field::new("isTemporary", DataType::Utf8, true),
            ]));
            let rows = warehouse
                .list_tables(database)?
                .into_iter()
                .map(|t| vec![text(database.as_str()), text(t), text("false")])
                .collect();
            Ok(QueryOutput { schema, rows })
        }
        Statement::Describe { table, detailed } => describe(warehouse, table, *detailed),
        Statement::SelectAll { table, limit } => {
            let (schema, mut rows) = warehouse.read_table(table)?;
            if let Some(n) = limit {
                rows.truncate(*n);
            }
            Ok(QueryOutput { schema, rows })
        }
        Statement::CreateDatabase {
            name,
            if_not_exists,
        } => {
            warehouse.create_database(name, *if_not_exists)?;
            Ok(QueryOutput::empty())
        }
        Statement::DropTable { table, if_exists } => {
            warehouse.drop_table(table, *if_exists)?;
            Ok(QueryOutput::empty())
        }
    }
}

fn describe(warehouse: &Warehouse, table: &TableIdent, detailed: bool) -> Result<QueryOutput> {
    let meta = warehouse.table_metadata(table)?;
    let schema = meta.schema()?;
    let mut rows: Vec<Row> = schema
        .fields()
        .iter()
        .map(|f| vec![text(f.name().as_str()), text(type_name(f.data_type())), Value::Null])
        .collect();
    if detailed {
        let location = warehouse.table_dir(table);
        let count = warehouse.table_row_count(table)?;
        rows.push(vec![text(""), text(""), text("")]);
        rows.push(vec![text("# Detailed Table Information"), text(""), text("")]);
        for (key, value) in [
            ("Database", meta.database.clone()),
            ("Table", meta.table.clone()),
            ("Type", "MANAGED".to_string()),
            ("Provider", meta.format.name().to_string()),
            ("Location", format!("file:{}", location.display())),
            ("Num Rows", count.to_string()),
        ] {
            rows.push(vec![text(key), text(value), text("")]);
        }
    }
    Ok(QueryOutput {
        schema: string_schema(&["col_name", "data_type", "comment"]),
        rows,
    })
}
