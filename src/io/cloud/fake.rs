//! In-memory object store for tests and local demos.

use crate::io::cloud::traits::{CloudIOError, CloudResult, ErrorKind, ObjectIO, ObjectMetadata};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

type BucketStorage = Arc<Mutex<HashMap<String, BTreeMap<String, Vec<u8>>>>>;

/// Buckets are created implicitly by the first `put_object`.
#[derive(Clone, Default)]
pub struct FakeObjectIO {
    storage: BucketStorage,
}

impl FakeObjectIO {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn buckets(&self) -> CloudResult<MutexGuard<'_, HashMap<String, BTreeMap<String, Vec<u8>>>>> {
        self.storage
            .lock()
            .map_err(|_| CloudIOError::new(ErrorKind::Other, "object storage mutex poisoned"))
    }
}

fn not_found(bucket: &str, key: &str) -> CloudIOError {
    CloudIOError::new(ErrorKind::NotFound, format!("Object {bucket}/{key} not found"))
}

impl ObjectIO for FakeObjectIO {
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<()> {
        if bucket.is_empty() || key.is_empty() {
            return Err(CloudIOError::new(
                ErrorKind::InvalidInput,
                "bucket and key must be non-empty",
            ));
        }
        self.buckets()?
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>> {
        self.buckets()?
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
            .ok_or_else(|| not_found(bucket, key))
    }

    fn delete_object(&self, bucket: &str, key: &str) -> CloudResult<()> {
        self.buckets()?
            .get_mut(bucket)
            .and_then(|objects| objects.remove(key))
            .map(|_| ())
            .ok_or_else(|| not_found(bucket, key))
    }

    fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> CloudResult<Vec<ObjectMetadata>> {
        let buckets = self.buckets()?;
        let objects = buckets.get(bucket).ok_or_else(|| {
            CloudIOError::new(ErrorKind::NotFound, format!("Bucket {bucket} not found"))
        })?;
        Ok(objects
            .iter()
            .filter(|(key, _)| prefix.is_none_or(|p| key.starts_with(p)))
            .map(|(key, data)| ObjectMetadata {
                key: key.clone(),
                size: data.len() as u64,
            })
            .collect())
    }

    fn object_exists(&self, bucket: &str, key: &str) -> CloudResult<bool> {
        Ok(self
            .buckets()?
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(key)))
    }
}
