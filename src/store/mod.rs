//! Cache Store abstraction
//!
//! A store is a set of named buckets, each mapping a request key to a
//! response snapshot. The controller only talks to buckets through the
//! [`CacheStore`] trait so it can run against any backing storage.
//!
//! # Backends
//!
//! | Backend | Persistence | Used by |
//! |---------|-------------|---------|
//! | [`MemoryStore`] | process lifetime | tests, embedded hosts |
//! | [`DiskStore`] | directory per bucket | the CLI |
//!
//! Lookups across buckets ([`CacheStore::match_any`]) walk buckets in name
//! order, so `{version}-dynamic` is consulted before `{version}-static`.

pub mod disk;
pub mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use crate::error::{SwError, SwResult};
use crate::http::{Method, Request, Response};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::warn;

/// Cache key: method plus absolute URL. Only GET keys are ever built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: Method,
    pub url: String,
}

impl RequestKey {
    /// Key for a GET of `url`
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
        }
    }

    /// Key for a request, `None` unless it is a GET
    pub fn for_request(request: &Request) -> Option<Self> {
        (request.method == Method::Get).then(|| Self::get(request.url.as_str()))
    }

    /// Stable hex digest used for on-disk file names
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_str().as_bytes());
        hasher.update(b" ");
        hasher.update(self.url.as_bytes());
        hex::encode(&hasher.finalize()[..16])
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A stored (key, response snapshot) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    pub key: RequestKey,
    pub response: Response,
    pub stored_at: DateTime<Utc>,
}

impl CachedEntry {
    /// Capture a response for a key. The body buffer is shared, not copied.
    pub fn capture(key: RequestKey, response: &Response) -> Self {
        Self {
            key,
            response: response.clone(),
            stored_at: Utc::now(),
        }
    }
}

/// Reject bucket names that could escape a storage root or collide with
/// temporary files.
pub fn validate_bucket_name(name: &str) -> SwResult<()> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control());
    if invalid {
        return Err(SwError::InvalidBucketName(name.to_string()));
    }
    Ok(())
}

/// Storage backend for named buckets
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the bucket if it does not exist
    async fn open(&self, bucket: &str) -> SwResult<()>;

    /// All bucket names, sorted
    async fn keys(&self) -> SwResult<Vec<String>>;

    /// Whether a bucket exists
    async fn has(&self, bucket: &str) -> SwResult<bool> {
        Ok(self.keys().await?.iter().any(|b| b == bucket))
    }

    /// Delete a bucket and every entry in it. Returns whether it existed.
    async fn delete(&self, bucket: &str) -> SwResult<bool>;

    /// Store an entry, creating the bucket if needed. Overwrites any entry
    /// with the same key.
    async fn put(&self, bucket: &str, entry: CachedEntry) -> SwResult<()>;

    /// Store a batch of entries, creating the bucket if needed.
    ///
    /// The default writes entries one at a time; backends that can publish
    /// the whole batch at once override it.
    async fn put_all(&self, bucket: &str, entries: Vec<CachedEntry>) -> SwResult<()> {
        self.open(bucket).await?;
        for entry in entries {
            self.put(bucket, entry).await?;
        }
        Ok(())
    }

    /// Look up a key in one bucket
    async fn get(&self, bucket: &str, key: &RequestKey) -> SwResult<Option<CachedEntry>>;

    /// Every entry in a bucket, sorted by key
    async fn entries(&self, bucket: &str) -> SwResult<Vec<CachedEntry>>;

    /// Look up a key across all buckets, first hit in bucket order.
    ///
    /// A bucket that fails to read is skipped; only a failure to list
    /// buckets is an error.
    async fn match_any(&self, key: &RequestKey) -> SwResult<Option<CachedEntry>> {
        for bucket in self.keys().await? {
            match self.get(&bucket, key).await {
                Ok(Some(entry)) => return Ok(Some(entry)),
                Ok(None) => {}
                Err(e) => {
                    warn!(bucket = %bucket, key = %key, "Skipping unreadable entry: {}", e)
                }
            }
        }
        Ok(None)
    }
}
