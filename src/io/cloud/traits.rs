//! Core object-store trait and its error type.
//!
//! Operations are synchronous; an implementation backed by an async SDK blocks
//! internally, as [`ObjectStoreIO`](super::ObjectStoreIO) does.

use thiserror::Error;

/// Error returned by object-store operations.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct CloudIOError {
    pub message: String,
    pub kind: ErrorKind,
    /// Provider-specific detail, e.g. the underlying SDK message.
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    NotFound,
    InvalidInput,
    Network,
    Other,
}

impl CloudIOError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

pub type CloudResult<T> = Result<T, CloudIOError>;

/// Metadata for an object in storage.
#[derive(Debug, Clone)]
pub struct ObjectMetadata {
    pub key: String,
    pub size: u64,
}

/// Blocking object storage (S3, GCS, ADLS, ...).
pub trait ObjectIO: Send + Sync {
    /// Upload `data` under `bucket/key`, replacing any previous object.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails or permissions are not enough
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<()>;

    /// Download the object at `bucket/key`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotFound`] if the bucket or object is missing
    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>>;

    /// Delete an object.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotFound`] if the object is missing
    fn delete_object(&self, bucket: &str, key: &str) -> CloudResult<()>;

    /// List objects whose key starts with `prefix`, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket doesn't exist or the listing fails
    fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> CloudResult<Vec<ObjectMetadata>>;

    /// Check whether an object exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the check itself fails
    fn object_exists(&self, bucket: &str, key: &str) -> CloudResult<bool>;
}
