//! `object_store`-backed gateway with one store per bucket.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload};
use tracing::debug;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{StoreError, StoreResult};

use super::gateway::{FetchedObject, ObjectGateway};

/// Gateway over `object_store` backends.
///
/// Construction does no I/O. Per-bucket stores are built on first use and
/// cached for the lifetime of the gateway, so one instance is meant to be
/// created at startup and shared (`Arc`) by every worker.
pub struct ObjectStoreGateway {
    backend: StorageBackend,
    root: PathBuf,
    region: Option<String>,
    endpoint: Option<String>,
    buckets: RwLock<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl ObjectStoreGateway {
    /// Create a gateway for the configured backend.
    ///
    /// `root` is the already-expanded `storage.root`, used only by the local
    /// backend.
    pub fn new(config: &StorageConfig, root: PathBuf) -> Self {
        Self {
            backend: config.backend,
            root,
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// A gateway over process-local in-memory buckets.
    pub fn in_memory() -> Self {
        Self {
            backend: StorageBackend::Memory,
            root: PathBuf::new(),
            region: None,
            endpoint: None,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// The backend this gateway talks to.
    pub fn backend(&self) -> StorageBackend {
        self.backend
    }

    /// Resolve (building if needed) the store for a bucket.
    fn store_for(&self, bucket: &str) -> StoreResult<Arc<dyn ObjectStore>> {
        {
            let buckets = self.buckets.read().unwrap_or_else(|e| e.into_inner());
            if let Some(store) = buckets.get(bucket) {
                return Ok(Arc::clone(store));
            }
        }

        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        // Another worker may have built it between the two locks
        if let Some(store) = buckets.get(bucket) {
            return Ok(Arc::clone(store));
        }
        let store = self.build_store(bucket)?;
        buckets.insert(bucket.to_string(), Arc::clone(&store));
        Ok(store)
    }

    fn build_store(&self, bucket: &str) -> StoreResult<Arc<dyn ObjectStore>> {
        if bucket.is_empty() || bucket.contains('/') || bucket == "." || bucket == ".." {
            return Err(StoreError::Permanent {
                bucket: bucket.to_string(),
                key: String::new(),
                message: "invalid bucket name".to_string(),
            });
        }

        let store: Arc<dyn ObjectStore> = match self.backend {
            StorageBackend::Memory => Arc::new(InMemory::new()),
            StorageBackend::Local => {
                let dir = self.root.join(bucket);
                std::fs::create_dir_all(&dir).map_err(|e| {
                    StoreError::transient(bucket, "", format!("cannot create {dir:?}: {e}"))
                })?;
                let fs = LocalFileSystem::new_with_prefix(&dir)
                    .map_err(|e| StoreError::from_object_store(bucket, "", e))?;
                Arc::new(fs)
            }
            StorageBackend::S3 => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                if let Some(region) = &self.region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = &self.endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"));
                }
                let s3 = builder
                    .build()
                    .map_err(|e| StoreError::from_object_store(bucket, "", e))?;
                Arc::new(s3)
            }
        };

        debug!(bucket = %bucket, backend = ?self.backend, "Created bucket store");
        Ok(store)
    }

    /// Local filesystems cannot persist content types.
    fn supports_attributes(&self) -> bool {
        self.backend != StorageBackend::Local
    }
}

/// Resolve a key to a store path verbatim.
///
/// `Path::from` would percent-encode characters such as `#` or `[` and address
/// a different object, so keys that do not parse as-is are rejected instead.
fn object_path(bucket: &str, key: &str) -> StoreResult<ObjectPath> {
    ObjectPath::parse(key).map_err(|e| StoreError::from_object_store(bucket, key, e.into()))
}

#[async_trait]
impl ObjectGateway for ObjectStoreGateway {
    async fn fetch(&self, bucket: &str, key: &str) -> StoreResult<FetchedObject> {
        let store = self.store_for(bucket)?;
        let path = object_path(bucket, key)?;

        let result = store
            .get(&path)
            .await
            .map_err(|e| StoreError::from_object_store(bucket, key, e))?;
        let size_bytes = result.meta.size;
        let bytes = result
            .bytes()
            .await
            .map_err(|e| StoreError::from_object_store(bucket, key, e))?;

        Ok(FetchedObject { bytes, size_bytes })
    }

    async fn exists(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        let store = self.store_for(bucket)?;
        let path = object_path(bucket, key)?;

        match store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StoreError::from_object_store(bucket, key, e)),
        }
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        content: Bytes,
        content_type: &str,
    ) -> StoreResult<()> {
        let store = self.store_for(bucket)?;
        let path = object_path(bucket, key)?;

        let mut attributes = Attributes::new();
        if self.supports_attributes() {
            attributes.insert(
                Attribute::ContentType,
                AttributeValue::from(content_type.to_string()),
            );
        }
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        store
            .put_opts(&path, PutPayload::from(content), options)
            .await
            .map_err(|e| StoreError::from_object_store(bucket, key, e))?;
        Ok(())
    }
}
