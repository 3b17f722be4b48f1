//! Gateway double for unit tests: in-memory storage with injectable failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{ErrorKind, StoreError, StoreResult};

use super::{FetchedObject, ObjectGateway, ObjectStoreGateway};

/// Which gateway call to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Fetch,
    Exists,
    Put,
}

/// In-memory gateway that fails chosen (op, key) pairs and counts every call.
pub struct ScriptedGateway {
    inner: ObjectStoreGateway,
    failures: Mutex<HashMap<(Op, String), ErrorKind>>,
    pub fetches: AtomicUsize,
    pub probes: AtomicUsize,
    pub puts: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            inner: ObjectStoreGateway::in_memory(),
            failures: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
        }
    }

    /// Make every `op` on `key` fail transiently until [`heal`](Self::heal)
    /// is called.
    pub fn fail(&self, op: Op, key: &str) {
        self.fail_with(op, key, ErrorKind::Transient);
    }

    /// Make every `op` on `key` fail with an error of the given kind.
    pub fn fail_with(&self, op: Op, key: &str, kind: ErrorKind) {
        self.failures
            .lock()
            .unwrap()
            .insert((op, key.to_string()), kind);
    }

    pub fn heal(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Seed an object without going through the counters.
    pub async fn seed(&self, bucket: &str, key: &str, bytes: Vec<u8>) {
        self.inner
            .put(bucket, key, Bytes::from(bytes), "application/octet-stream")
            .await
            .unwrap();
    }

    /// Read an object without going through the counters.
    pub async fn read(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.inner.fetch(bucket, key).await.ok().map(|o| o.bytes)
    }

    pub fn total_calls(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
            + self.probes.load(Ordering::SeqCst)
            + self.puts.load(Ordering::SeqCst)
    }

    fn check(&self, op: Op, bucket: &str, key: &str) -> StoreResult<()> {
        let kind = self.failures.lock().unwrap().get(&(op, key.to_string())).copied();
        match kind {
            None => Ok(()),
            Some(ErrorKind::Transient) => {
                Err(StoreError::transient(bucket, key, "simulated outage"))
            }
            Some(ErrorKind::NotFound) => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Some(ErrorKind::Permanent) => Err(StoreError::Permanent {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "access denied".to_string(),
            }),
        }
    }
}

#[async_trait]
impl ObjectGateway for ScriptedGateway {
    async fn fetch(&self, bucket: &str, key: &str) -> StoreResult<FetchedObject> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check(Op::Fetch, bucket, key)?;
        self.inner.fetch(bucket, key).await
    }

    async fn exists(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.check(Op::Exists, bucket, key)?;
        self.inner.exists(bucket, key).await
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        content: Bytes,
        content_type: &str,
    ) -> StoreResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.check(Op::Put, bucket, key)?;
        self.inner.put(bucket, key, content, content_type).await
    }
}
