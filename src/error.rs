//! Error types for the ingestion job.
//!
//! Each concern gets its own enum. Library functions return `anyhow::Result` and
//! raise one of these as the root cause, so callers can still `downcast_ref` to
//! tell a missing `STORAGE` variable from an unwritable output path.

use thiserror::Error;

/// Problems with the process configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),
    #[error("environment variable {name} is empty")]
    EmptyVar { name: &'static str },
}

/// Problems acquiring an execution context.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid master URL '{0}'")]
    InvalidMaster(String),
    #[error("cluster coordinator {address} is unreachable: {reason}")]
    CoordinatorUnreachable { address: String, reason: String },
    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

/// Problems resolving or touching a storage location.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no object store registered for scheme '{scheme}' (uri {uri})")]
    NoObjectStore { scheme: String, uri: String },
    #[error("invalid storage uri '{0}'")]
    InvalidUri(String),
    #[error("path {0} already exists")]
    AlreadyExists(String),
}

/// Problems with the warehouse catalog or its SQL surface.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("database '{0}' not found")]
    DatabaseNotFound(String),
    #[error("database '{0}' already exists")]
    DatabaseAlreadyExists(String),
    #[error("table '{database}.{table}' not found")]
    TableNotFound { database: String, table: String },
    #[error("table '{database}.{table}' already exists")]
    TableAlreadyExists { database: String, table: String },
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),
    #[error("cannot append to '{table}': schema differs from the existing table")]
    SchemaMismatch { table: String },
    #[error("unsupported statement: {0}")]
    UnsupportedStatement(String),
}
