//! # Churnflow
//!
//! A small batch-ingestion engine for the telco customer-churn dataset: read a
//! delimited file from object storage against a declared schema, keep a local
//! single-file copy, and register the data as a managed warehouse table on the
//! first run.
//!
//! ## Key Features
//!
//! - **Session handle** - one explicit [`Session`] carries the worker pool, the
//!   warehouse catalog and the registered object stores
//! - **Deferred pipelines** - frames are lazy [`PCollection`]s of rows, evaluated
//!   partition by partition on the session's rayon pool
//! - **Declared schemas** - columns are never inferred; sentinel, blank and
//!   malformed values become null instead of failing the run
//! - **Sharded output** - one `part-NNNNN` file per partition plus a `_SUCCESS`
//!   marker, under four save modes
//! - **Warehouse catalog** - filesystem-backed databases and Parquet tables with a
//!   small SQL surface (`SHOW`, `DESCRIBE`, `SELECT *`, `CREATE`, `DROP`)
//!
//! ## Quick Start
//!
//! ```no_run
//! use churnflow::{IngestConfig, SessionBuilder, ingest};
//! # fn main() -> anyhow::Result<()> {
//! let config = IngestConfig::from_env()?;
//! let session = SessionBuilder::new()
//!     .app_name(&config.app_name)
//!     .master(&config.master)
//!     .warehouse_dir(&config.warehouse_dir)
//!     .get_or_create()?;
//! let report = ingest::run(&session, &config)?;
//! println!("{report:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Reading and writing frames
//!
//! ```no_run
//! use churnflow::{SaveMode, SessionBuilder, telco_churn_schema};
//! # fn main() -> anyhow::Result<()> {
//! let session = SessionBuilder::new().master("local[4]").build()?;
//! let df = session
//!     .read()
//!     .schema(telco_churn_schema())
//!     .header(true)
//!     .null_value("NA")
//!     .csv("file:/data/churn.csv")?;
//! df.coalesce(1)
//!     .write()
//!     .mode(SaveMode::Overwrite)
//!     .header(true)
//!     .csv("file:/tmp/churn-copy")?;
//! # Ok(())
//! # }
//! ```
//!
//! Object-store URIs such as `s3a://bucket/key` resolve through an
//! [`ObjectIO`](io::cloud::ObjectIO) registered with
//! [`Session::register_object_store`].

pub mod collection;
pub mod config;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod io;
pub mod node;
pub mod node_id;
pub mod pipeline;
pub mod runner;
pub mod schema;
pub mod session;
pub mod type_token;
pub mod warehouse;

pub use collection::{PCollection, from_vec};
pub use config::IngestConfig;
pub use error::{ConfigError, SessionError, StorageError, WarehouseError};
pub use frame::{DataFrame, DataFrameReader, DataFrameWriter};
pub use io::SaveMode;
pub use node_id::NodeId;
pub use pipeline::Pipeline;
pub use runner::{ExecMode, Runner};
pub use schema::{Row, Value, telco_churn_schema};
pub use session::{Master, Session, SessionBuilder};
pub use type_token::Partition;
pub use warehouse::{SaveOutcome, TableFormat, TableIdent, Warehouse};
