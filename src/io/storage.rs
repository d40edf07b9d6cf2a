//! Storage URI resolution.
//!
//! `file:` URIs (`file:/a/b`, `file:///a/b`) and bare paths resolve to the local
//! filesystem. Anything of the form `scheme://bucket/key` is served by the
//! [`ObjectIO`](crate::io::cloud::ObjectIO) registered on the session for that
//! scheme.

use crate::error::StorageError;
use crate::session::Session;
use anyhow::{Context, Result};
use log::debug;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Object {
        scheme: String,
        bucket: String,
        key: String,
    },
}

impl Location {
    /// Parse a storage URI.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidUri`] for empty input, or an object URI
    /// without a bucket or key.
    pub fn parse(uri: &str) -> Result<Self, StorageError> {
        if uri.trim().is_empty() {
            return Err(StorageError::InvalidUri(uri.to_string()));
        }
        if let Some(rest) = uri.strip_prefix("file://") {
            return Ok(Location::Local(PathBuf::from(rest)));
        }
        if let Some(rest) = uri.strip_prefix("file:") {
            return Ok(Location::Local(PathBuf::from(rest)));
        }
        let Some((scheme, rest)) = uri.split_once("://") else {
            return Ok(Location::Local(PathBuf::from(uri)));
        };
        let (bucket, key) = rest
            .split_once('/')
            .ok_or_else(|| StorageError::InvalidUri(uri.to_string()))?;
        let key = key.trim_start_matches('/');
        if scheme.is_empty() || bucket.is_empty() || key.is_empty() {
            return Err(StorageError::InvalidUri(uri.to_string()));
        }
        Ok(Location::Object {
            scheme: scheme.to_ascii_lowercase(),
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

/// Resolve `uri` to a local filesystem path.
///
/// # Errors
/// Fails when the URI is malformed or names an object store.
pub fn local_path(uri: &str) -> Result<PathBuf> {
    match Location::parse(uri)? {
        Location::Local(path) => Ok(path),
        Location::Object { .. } => Err(StorageError::InvalidUri(uri.to_string()))
            .with_context(|| format!("{uri} is not a local filesystem path")),
    }
}

/// Open `uri` for reading, either from disk or through the session's object stores.
///
/// # Errors
/// Fails when the location cannot be resolved, no store is registered for the
/// scheme, or the resource is missing/unreadable.
pub fn open_input(session: &Session, uri: &str) -> Result<Box<dyn Read + Send>> {
    match Location::parse(uri)? {
        Location::Local(path) => {
            debug!("opening local input {}", path.display());
            let f = File::open(&path).with_context(|| format!("open {}", path.display()))?;
            Ok(Box::new(BufReader::new(f)))
        }
        Location::Object {
            scheme,
            bucket,
            key,
        } => {
            let store = session
                .object_store(&scheme)
                .ok_or_else(|| StorageError::NoObjectStore {
                    scheme: scheme.clone(),
                    uri: uri.to_string(),
                })?;
            debug!("fetching {scheme}://{bucket}/{key}");
            let bytes = store
                .get_object(&bucket, &key)
                .with_context(|| format!("read {uri}"))?;
            Ok(Box::new(Cursor::new(bytes)))
        }
    }
}
