//! Gateway trait over bucket storage.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreResult;

/// Object bytes plus the size reported by the store.
#[derive(Debug, Clone)]
pub struct FetchedObject {
    pub bytes: Bytes,
    pub size_bytes: u64,
}

/// Fetch, probe and write objects by bucket and key.
///
/// Implementations do no retrying of their own. `put` is a full replace, which
/// makes it idempotent; nothing else is assumed to be.
///
/// Uses `async_trait` because the processor holds an `Arc<dyn ObjectGateway>`
/// shared across workers.
#[async_trait]
pub trait ObjectGateway: Send + Sync {
    /// Read a whole object.
    ///
    /// Fails with `StoreError::NotFound` when the key is absent.
    async fn fetch(&self, bucket: &str, key: &str) -> StoreResult<FetchedObject>;

    /// Whether an object exists.
    ///
    /// Absence is `Ok(false)`, never an error.
    async fn exists(&self, bucket: &str, key: &str) -> StoreResult<bool>;

    /// Write `content` under `key`, replacing any previous object.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        content: Bytes,
        content_type: &str,
    ) -> StoreResult<()>;
}
