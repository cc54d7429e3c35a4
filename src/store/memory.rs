//! In-memory cache store

use super::{validate_bucket_name, CacheStore, CachedEntry, RequestKey};
use crate::error::SwResult;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

type Bucket = HashMap<RequestKey, CachedEntry>;

/// Store that keeps every bucket in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: RwLock<BTreeMap<String, Bucket>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, bucket: &str) -> SwResult<()> {
        validate_bucket_name(bucket)?;
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default();
        Ok(())
    }

    async fn keys(&self) -> SwResult<Vec<String>> {
        Ok(self.buckets.read().await.keys().cloned().collect())
    }

    async fn has(&self, bucket: &str) -> SwResult<bool> {
        Ok(self.buckets.read().await.contains_key(bucket))
    }

    async fn delete(&self, bucket: &str) -> SwResult<bool> {
        Ok(self.buckets.write().await.remove(bucket).is_some())
    }

    async fn put(&self, bucket: &str, entry: CachedEntry) -> SwResult<()> {
        validate_bucket_name(bucket)?;
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default()
            .insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn put_all(&self, bucket: &str, entries: Vec<CachedEntry>) -> SwResult<()> {
        validate_bucket_name(bucket)?;
        let mut buckets = self.buckets.write().await;
        let target = buckets.entry(bucket.to_string()).or_default();
        for entry in entries {
            target.insert(entry.key.clone(), entry);
        }
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &RequestKey) -> SwResult<Option<CachedEntry>> {
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .and_then(|b| b.get(key))
            .cloned())
    }

    async fn entries(&self, bucket: &str) -> SwResult<Vec<CachedEntry>> {
        let buckets = self.buckets.read().await;
        let mut entries: Vec<CachedEntry> = buckets
            .get(bucket)
            .map(|b| b.values().cloned().collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| a.key.url.cmp(&b.key.url));
        Ok(entries)
    }
}
