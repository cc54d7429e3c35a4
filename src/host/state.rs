//! Worker record persistence for the CLI host

use super::ClientHost;
use crate::error::{SwError, SwResult};
use crate::policy::CacheVersion;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

/// Lifecycle phase of the recorded controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerPhase {
    /// Static bucket populated, ready to activate
    Installed,
    /// Stale buckets purged, pages claimed
    Activated,
}

impl std::fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Installed => write!(f, "installed"),
            Self::Activated => write!(f, "activated"),
        }
    }
}

/// Persisted controller record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRecord {
    /// Unique id of this controller generation
    pub id: Uuid,

    /// Cache version the controller was installed with
    pub version: String,

    /// Current phase
    pub phase: WorkerPhase,

    /// Whether activation skips waiting for open pages
    pub skip_waiting: bool,

    /// When install completed
    pub installed_at: DateTime<Utc>,

    /// When the controller claimed clients
    pub activated_at: Option<DateTime<Utc>>,

    /// Last change to this record
    pub updated_at: DateTime<Utc>,
}

impl WorkerRecord {
    fn installed(version: &CacheVersion) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            version: version.to_string(),
            phase: WorkerPhase::Installed,
            skip_waiting: false,
            installed_at: now,
            activated_at: None,
            updated_at: now,
        }
    }

    /// Whether this record is the active controller for `version`
    pub fn is_active_for(&self, version: &CacheVersion) -> bool {
        self.phase == WorkerPhase::Activated && self.version == version.as_str()
    }
}

/// Host that keeps the worker record in a JSON file
#[derive(Debug, Clone)]
pub struct StateFileHost {
    path: PathBuf,
    version: CacheVersion,
}

impl StateFileHost {
    pub fn new(path: impl Into<PathBuf>, version: CacheVersion) -> Self {
        Self {
            path: path.into(),
            version,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, if any
    pub async fn load(&self) -> SwResult<Option<WorkerRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| SwError::io(format!("reading {}", self.path.display()), e))?;

        let record: WorkerRecord = serde_json::from_str(&content)?;
        Ok(Some(record))
    }

    async fn save(&self, record: &WorkerRecord) -> SwResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SwError::io(format!("creating {}", parent.display()), e))?;
        }

        let content = serde_json::to_string_pretty(record)?;
        fs::write(&self.path, content)
            .await
            .map_err(|e| SwError::io(format!("writing {}", self.path.display()), e))?;

        debug!("Saved worker record {} ({})", record.id, record.phase);
        Ok(())
    }

    /// Remove the record (unregister)
    pub async fn clear(&self) -> SwResult<bool> {
        if !self.path.exists() {
            return Ok(false);
        }

        fs::remove_file(&self.path)
            .await
            .map_err(|e| SwError::io(format!("removing {}", self.path.display()), e))?;
        info!("Unregistered worker record at {}", self.path.display());
        Ok(true)
    }
}

#[async_trait]
impl ClientHost for StateFileHost {
    async fn register(&self) -> SwResult<()> {
        let record = match self.load().await? {
            Some(mut existing) if existing.version == self.version.as_str() => {
                existing.updated_at = Utc::now();
                existing
            }
            _ => WorkerRecord::installed(&self.version),
        };
        self.save(&record).await
    }

    /// Only flags an existing record for this version; never creates one
    async fn skip_waiting(&self) -> SwResult<()> {
        let mut record = match self.load().await? {
            Some(existing) if existing.version == self.version.as_str() => existing,
            _ => {
                debug!("No {} worker record, skip waiting is a no-op", self.version);
                return Ok(());
            }
        };

        record.skip_waiting = true;
        record.updated_at = Utc::now();
        self.save(&record).await
    }

    async fn claim_clients(&self) -> SwResult<usize> {
        let mut record = match self.load().await? {
            Some(existing) if existing.version == self.version.as_str() => existing,
            _ => return Err(SwError::NotInstalled(self.version.to_string())),
        };

        let now = Utc::now();
        record.phase = WorkerPhase::Activated;
        record.activated_at = Some(now);
        record.updated_at = now;
        self.save(&record).await?;

        // A terminal host has no open pages to take over
        Ok(0)
    }
}
