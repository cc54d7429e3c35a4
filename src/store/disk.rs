//! Directory-backed cache store
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<bucket>/<sha256(key)[..32]>.entry
//! ```
//!
//! Each `.entry` file is one JSON metadata line followed by the raw body
//! bytes. Writes go to a dot-prefixed temp file in the same directory and are
//! renamed into place, so a reader sees either the old entry or the new one.
//! Batch writes are staged in a dot-prefixed sibling directory, which
//! [`CacheStore::keys`] never lists, and moved in once every entry is on disk.

use super::{validate_bucket_name, CacheStore, CachedEntry, RequestKey};
use crate::error::{SwError, SwResult};
use crate::http::{Headers, Response, ResponseType};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use url::Url;
use uuid::Uuid;

const ENTRY_EXT: &str = "entry";

/// Metadata line written ahead of the body
#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    key: RequestKey,
    status: u16,
    headers: Headers,
    kind: ResponseType,
    url: Url,
    stored_at: DateTime<Utc>,
    body_len: usize,
}

/// Store that persists buckets as directories
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> SwResult<PathBuf> {
        validate_bucket_name(bucket)?;
        Ok(self.root.join(bucket))
    }

    fn entry_path(dir: &Path, key: &RequestKey) -> PathBuf {
        dir.join(format!("{}.{}", key.digest(), ENTRY_EXT))
    }

    fn encode(entry: &CachedEntry) -> SwResult<Vec<u8>> {
        let meta = EntryMeta {
            key: entry.key.clone(),
            status: entry.response.status,
            headers: entry.response.headers.clone(),
            kind: entry.response.kind,
            url: entry.response.url.clone(),
            stored_at: entry.stored_at,
            body_len: entry.response.body.len(),
        };

        // serde_json escapes newlines inside strings, so the first raw
        // newline always terminates the metadata line
        let mut buf = serde_json::to_vec(&meta)?;
        buf.push(b'\n');
        buf.extend_from_slice(&entry.response.body);
        Ok(buf)
    }

    fn decode(path: &Path, raw: Vec<u8>) -> SwResult<CachedEntry> {
        let corrupt = |reason: String| SwError::CorruptEntry {
            path: path.to_path_buf(),
            reason,
        };

        let split = raw
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| corrupt("missing metadata line".to_string()))?;
        let meta: EntryMeta =
            serde_json::from_slice(&raw[..split]).map_err(|e| corrupt(e.to_string()))?;

        let body = Bytes::from(raw).slice(split + 1..);
        if body.len() != meta.body_len {
            return Err(corrupt(format!(
                "body length {} does not match recorded {}",
                body.len(),
                meta.body_len
            )));
        }

        Ok(CachedEntry {
            key: meta.key,
            response: Response {
                status: meta.status,
                headers: meta.headers,
                kind: meta.kind,
                url: meta.url,
                body,
            },
            stored_at: meta.stored_at,
        })
    }

    async fn write_staged(staging: &Path, entries: &[CachedEntry]) -> SwResult<()> {
        fs::create_dir_all(staging)
            .await
            .map_err(|e| SwError::io(format!("creating {}", staging.display()), e))?;
        for entry in entries {
            let path = Self::entry_path(staging, &entry.key);
            fs::write(&path, Self::encode(entry)?)
                .await
                .map_err(|e| SwError::io(format!("writing {}", path.display()), e))?;
        }
        Ok(())
    }

    /// Move staged entries into a bucket that already exists, one rename each
    async fn merge_staged(
        staging: &Path,
        dir: &Path,
        entries: &[CachedEntry],
    ) -> std::io::Result<()> {
        for entry in entries {
            fs::rename(
                Self::entry_path(staging, &entry.key),
                Self::entry_path(dir, &entry.key),
            )
            .await?;
        }
        Ok(())
    }

    async fn read_entry(path: &Path) -> SwResult<Option<CachedEntry>> {
        match fs::read(path).await {
            Ok(raw) => Self::decode(path, raw).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SwError::io(format!("reading {}", path.display()), e)),
        }
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn open(&self, bucket: &str) -> SwResult<()> {
        let dir = self.bucket_dir(bucket)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| SwError::io(format!("creating bucket {}", dir.display()), e))
    }

    async fn keys(&self) -> SwResult<Vec<String>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SwError::io(
                    format!("listing buckets in {}", self.root.display()),
                    e,
                ))
            }
        };

        let mut names = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| SwError::io("listing buckets", e))?
        {
            let is_dir = item
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            let name = item.file_name().to_string_lossy().into_owned();
            if is_dir && validate_bucket_name(&name).is_ok() {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    async fn has(&self, bucket: &str) -> SwResult<bool> {
        let dir = self.bucket_dir(bucket)?;
        Ok(fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false))
    }

    async fn delete(&self, bucket: &str) -> SwResult<bool> {
        let dir = self.bucket_dir(bucket)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!("Removed bucket directory {}", dir.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SwError::storage(bucket, e.to_string())),
        }
    }

    async fn put(&self, bucket: &str, entry: CachedEntry) -> SwResult<()> {
        let dir = self.bucket_dir(bucket)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| SwError::storage(bucket, e.to_string()))?;

        let target = Self::entry_path(&dir, &entry.key);
        let tmp = dir.join(format!(".{}.{}.tmp", entry.key.digest(), Uuid::new_v4()));
        let data = Self::encode(&entry)?;

        if let Err(e) = fs::write(&tmp, &data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(SwError::storage(bucket, e.to_string()));
        }
        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(SwError::storage(bucket, e.to_string()));
        }

        debug!("Stored {} in {}", entry.key, bucket);
        Ok(())
    }

    async fn put_all(&self, bucket: &str, entries: Vec<CachedEntry>) -> SwResult<()> {
        let dir = self.bucket_dir(bucket)?;
        let staging = self
            .root
            .join(format!(".{}.{}.staging", bucket, Uuid::new_v4()));

        if let Err(e) = Self::write_staged(&staging, &entries).await {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(SwError::storage(bucket, e.to_string()));
        }

        // A new bucket appears in a single rename
        let moved = if fs::metadata(&dir).await.is_ok() {
            Self::merge_staged(&staging, &dir, &entries).await
        } else {
            fs::rename(&staging, &dir).await
        };
        let _ = fs::remove_dir_all(&staging).await;
        moved.map_err(|e| SwError::storage(bucket, e.to_string()))?;

        debug!("Stored {} entries in {}", entries.len(), bucket);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &RequestKey) -> SwResult<Option<CachedEntry>> {
        let dir = self.bucket_dir(bucket)?;
        let found = Self::read_entry(&Self::entry_path(&dir, key)).await?;
        // Truncated digest, so confirm the stored key
        Ok(found.filter(|e| &e.key == key))
    }

    async fn entries(&self, bucket: &str) -> SwResult<Vec<CachedEntry>> {
        let dir = self.bucket_dir(bucket)?;
        let mut listing = match fs::read_dir(&dir).await {
            Ok(listing) => listing,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SwError::io(format!("listing {}", dir.display()), e)),
        };

        let mut entries = Vec::new();
        while let Some(item) = listing
            .next_entry()
            .await
            .map_err(|e| SwError::io(format!("listing {}", dir.display()), e))?
        {
            let path = item.path();
            let is_entry = path.extension().is_some_and(|ext| ext == ENTRY_EXT)
                && !item.file_name().to_string_lossy().starts_with('.');
            if !is_entry {
                continue;
            }
            if let Some(entry) = Self::read_entry(&path).await? {
                entries.push(entry);
            }
        }

        entries.sort_by(|a, b| a.key.url.cmp(&b.key.url));
        Ok(entries)
    }
}
