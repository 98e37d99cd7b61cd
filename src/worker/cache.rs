//! Named cache buckets, one per worker generation.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::WorkerError;
use crate::worker::fetch::Response;

/// Browser-style cache storage: named buckets of URL-keyed responses.
///
/// Safe for concurrent use; generations only ever touch their own bucket
/// except during activation cleanup.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Names of all existing buckets.
    async fn keys(&self) -> Result<Vec<String>, WorkerError>;

    async fn has(&self, bucket: &str) -> Result<bool, WorkerError>;

    /// Returns false when the bucket did not exist.
    async fn delete(&self, bucket: &str) -> Result<bool, WorkerError>;

    async fn match_in(&self, bucket: &str, key: &str) -> Result<Option<Response>, WorkerError>;

    /// Store one entry, creating the bucket if needed.
    async fn put(&self, bucket: &str, key: String, response: Response) -> Result<(), WorkerError>;

    /// Store all entries in one step; the bucket is untouched on error.
    async fn put_all(
        &self,
        bucket: &str,
        entries: Vec<(String, Response)>,
    ) -> Result<(), WorkerError>;

    /// Keys held by one bucket, empty when it does not exist.
    async fn entries(&self, bucket: &str) -> Result<Vec<String>, WorkerError>;
}

/// In-process [`CacheStorage`].
#[derive(Clone, Default)]
pub struct MemoryCacheStorage {
    buckets: Arc<RwLock<BTreeMap<String, HashMap<String, Response>>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn keys(&self) -> Result<Vec<String>, WorkerError> {
        Ok(self.buckets.read().await.keys().cloned().collect())
    }

    async fn has(&self, bucket: &str) -> Result<bool, WorkerError> {
        Ok(self.buckets.read().await.contains_key(bucket))
    }

    async fn delete(&self, bucket: &str) -> Result<bool, WorkerError> {
        Ok(self.buckets.write().await.remove(bucket).is_some())
    }

    async fn match_in(&self, bucket: &str, key: &str) -> Result<Option<Response>, WorkerError> {
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .and_then(|b| b.get(key))
            .cloned())
    }

    async fn put(&self, bucket: &str, key: String, response: Response) -> Result<(), WorkerError> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default()
            .insert(key, response);
        Ok(())
    }

    async fn put_all(
        &self,
        bucket: &str,
        entries: Vec<(String, Response)>,
    ) -> Result<(), WorkerError> {
        let mut buckets = self.buckets.write().await;
        buckets.entry(bucket.to_string()).or_default().extend(entries);
        Ok(())
    }

    async fn entries(&self, bucket: &str) -> Result<Vec<String>, WorkerError> {
        let mut keys: Vec<String> = self
            .buckets
            .read()
            .await
            .get(bucket)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }
}
