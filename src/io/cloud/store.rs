//! [`ObjectIO`] over the `object_store` crate (S3, GCS and Azure).
//!
//! One client is built per bucket on first use, configured from the provider's
//! usual environment variables (`AWS_*`, `GOOGLE_*`, `AZURE_*`). Calls block on a
//! private current-thread tokio runtime.

use crate::io::cloud::traits::{CloudIOError, CloudResult, ErrorKind, ObjectIO, ObjectMetadata};
use futures::TryStreamExt;
use log::debug;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore, PutPayload};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::{Builder, Runtime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provider {
    S3,
    Gcs,
    Azure,
}

impl Provider {
    fn for_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "s3" | "s3a" => Some(Provider::S3),
            "gs" => Some(Provider::Gcs),
            "az" | "adl" | "azure" | "abfs" | "abfss" => Some(Provider::Azure),
            _ => None,
        }
    }
}

pub struct ObjectStoreIO {
    scheme: String,
    provider: Option<Provider>,
    runtime: Runtime,
    stores: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl std::fmt::Debug for ObjectStoreIO {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreIO")
            .field("scheme", &self.scheme)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl ObjectStoreIO {
    /// Serve `scheme://bucket/key` from the matching cloud provider, with
    /// credentials taken from the environment.
    ///
    /// # Errors
    /// [`ErrorKind::InvalidInput`] for a scheme no provider handles, or
    /// [`ErrorKind::Other`] if the runtime cannot start.
    pub fn from_env(scheme: &str) -> CloudResult<Self> {
        let scheme = scheme.to_ascii_lowercase();
        let provider = Provider::for_scheme(&scheme).ok_or_else(|| {
            CloudIOError::new(
                ErrorKind::InvalidInput,
                format!("no object-store provider for scheme '{scheme}'"),
            )
        })?;
        Self::with_provider(scheme, Some(provider))
    }

    /// Serve a single bucket from an already-built store, e.g.
    /// `object_store::local::LocalFileSystem` or `object_store::memory::InMemory`.
    /// Other buckets report [`ErrorKind::NotFound`].
    ///
    /// # Errors
    /// [`ErrorKind::Other`] if the runtime cannot start.
    pub fn from_store(bucket: &str, store: Arc<dyn ObjectStore>) -> CloudResult<Self> {
        let io = Self::with_provider(String::from("store"), None)?;
        io.stores
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bucket.to_string(), store);
        Ok(io)
    }

    fn with_provider(scheme: String, provider: Option<Provider>) -> CloudResult<Self> {
        let runtime = Builder::new_current_thread().enable_all().build().map_err(|e| {
            CloudIOError::new(ErrorKind::Other, "start object-store runtime")
                .with_detail(e.to_string())
        })?;
        Ok(Self {
            scheme,
            provider,
            runtime,
            stores: Mutex::new(HashMap::new()),
        })
    }

    fn store(&self, bucket: &str) -> CloudResult<Arc<dyn ObjectStore>> {
        if bucket.is_empty() {
            return Err(CloudIOError::new(ErrorKind::InvalidInput, "bucket must be non-empty"));
        }
        let mut stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(store) = stores.get(bucket) {
            return Ok(Arc::clone(store));
        }
        let Some(provider) = self.provider else {
            return Err(CloudIOError::new(
                ErrorKind::NotFound,
                format!("bucket {bucket} is not served by this store"),
            ));
        };
        let url = format!("{}://{bucket}", self.scheme);
        debug!("building {provider:?} client for {url}");
        let built: object_store::Result<Arc<dyn ObjectStore>> = match provider {
            Provider::S3 => AmazonS3Builder::from_env()
                .with_url(&url)
                .build()
                .map(|s| Arc::new(s) as Arc<dyn ObjectStore>),
            Provider::Gcs => GoogleCloudStorageBuilder::from_env()
                .with_url(&url)
                .build()
                .map(|s| Arc::new(s) as Arc<dyn ObjectStore>),
            Provider::Azure => MicrosoftAzureBuilder::from_env()
                .with_url(&url)
                .build()
                .map(|s| Arc::new(s) as Arc<dyn ObjectStore>),
        };
        let store = built.map_err(|e| {
            CloudIOError::new(ErrorKind::InvalidInput, format!("configure client for {url}"))
                .with_detail(e.to_string())
        })?;
        stores.insert(bucket.to_string(), Arc::clone(&store));
        Ok(store)
    }

    fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }
}

fn cloud_error(err: object_store::Error, what: String) -> CloudIOError {
    let kind = match &err {
        object_store::Error::NotFound { .. } => ErrorKind::NotFound,
        object_store::Error::Unauthenticated { .. }
        | object_store::Error::PermissionDenied { .. } => ErrorKind::Authentication,
        object_store::Error::InvalidPath { .. } => ErrorKind::InvalidInput,
        object_store::Error::Generic { .. } => ErrorKind::Network,
        _ => ErrorKind::Other,
    };
    CloudIOError::new(kind, what).with_detail(err.to_string())
}

impl ObjectIO for ObjectStoreIO {
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<()> {
        if key.is_empty() {
            return Err(CloudIOError::new(ErrorKind::InvalidInput, "key must be non-empty"));
        }
        let store = self.store(bucket)?;
        let payload = PutPayload::from(data.to_vec());
        self.block_on(store.put(&Path::from(key), payload))
            .map(|_| ())
            .map_err(|e| cloud_error(e, format!("put {bucket}/{key}")))
    }

    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>> {
        let store = self.store(bucket)?;
        let path = Path::from(key);
        let bytes = self
            .block_on(async { store.get(&path).await?.bytes().await })
            .map_err(|e| cloud_error(e, format!("get {bucket}/{key}")))?;
        debug!("fetched {} byte(s) from {bucket}/{key}", bytes.len());
        Ok(bytes.to_vec())
    }

    fn delete_object(&self, bucket: &str, key: &str) -> CloudResult<()> {
        // Most providers treat deleting a missing key as success.
        if !self.object_exists(bucket, key)? {
            return Err(CloudIOError::new(
                ErrorKind::NotFound,
                format!("Object {bucket}/{key} not found"),
            ));
        }
        let store = self.store(bucket)?;
        self.block_on(store.delete(&Path::from(key)))
            .map_err(|e| cloud_error(e, format!("delete {bucket}/{key}")))
    }

    fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> CloudResult<Vec<ObjectMetadata>> {
        let store = self.store(bucket)?;
        let prefix = prefix.unwrap_or("");
        // Listing is by path segment; narrow to the prefix's directory and
        // filter the rest by string prefix.
        let dir = prefix
            .rfind('/')
            .map(|i| Path::from(&prefix[..i]))
            .filter(|p| !p.as_ref().is_empty());
        let metas: Vec<ObjectMeta> = self
            .block_on(store.list(dir.as_ref()).try_collect())
            .map_err(|e| cloud_error(e, format!("list {bucket}/{prefix}")))?;
        let mut out: Vec<ObjectMetadata> = metas
            .into_iter()
            .map(|m| ObjectMetadata {
                key: m.location.to_string(),
                size: m.size,
            })
            .filter(|m| m.key.starts_with(prefix))
            .collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

    fn object_exists(&self, bucket: &str, key: &str) -> CloudResult<bool> {
        let store = self.store(bucket)?;
        match self.block_on(store.head(&Path::from(key))) {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(cloud_error(e, format!("head {bucket}/{key}"))),
        }
    }
}
