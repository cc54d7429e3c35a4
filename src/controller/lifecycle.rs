//! Install and activate phases

use super::Controller;
use crate::error::{SwError, SwResult};
use crate::http::{Request, Response};
use crate::policy::{partition_buckets, BucketKind};
use crate::store::{CachedEntry, RequestKey};
use futures_util::future::try_join_all;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

/// Result of a successful install
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub version: String,
    pub bucket: String,
    pub assets: Vec<String>,
}

/// Result of a successful activate
#[derive(Debug, Clone, Serialize)]
pub struct ActivateReport {
    pub version: String,
    pub purged: Vec<String>,
    pub clients_claimed: usize,
}

impl Controller {
    /// Install phase: populate `{version}-static` with the whole manifest
    ///
    /// Every asset is fetched before anything is written. Any failed fetch
    /// or non-2xx status fails the install with nothing stored. The entries
    /// are written as one batch ([`crate::store::CacheStore::put_all`]) and a
    /// failed write removes the static bucket again.
    pub async fn on_install(&self) -> SwResult<InstallReport> {
        let bucket = self.version.bucket(BucketKind::Static);
        info!("Installing {} ({} assets)", self.version, self.static_assets.len());

        let responses = try_join_all(self.static_assets.iter().map(|url| self.fetch_asset(url))).await?;

        let entries = self
            .static_assets
            .iter()
            .zip(responses)
            .map(|(url, response)| CachedEntry::capture(RequestKey::get(url.as_str()), &response))
            .collect();
        if let Err(e) = self.store.put_all(&bucket, entries).await {
            warn!("Failed to populate {}: {}", bucket, e);
            if let Err(cleanup) = self.store.delete(&bucket).await {
                warn!("Failed to remove partial bucket {}: {}", bucket, cleanup);
            }
            return Err(SwError::InstallWrite {
                bucket,
                reason: e.to_string(),
            });
        }
        info!("Static assets cached in {}", bucket);

        self.host.register().await?;
        self.host.skip_waiting().await?;

        Ok(InstallReport {
            version: self.version.to_string(),
            bucket,
            assets: self.static_assets.iter().map(Url::to_string).collect(),
        })
    }

    async fn fetch_asset(&self, url: &Url) -> SwResult<Response> {
        let install_error = |reason: String| SwError::InstallAsset {
            url: url.to_string(),
            reason,
        };

        let response = self
            .network
            .fetch(&Request::get(url.clone()))
            .await
            .map_err(|e| install_error(e.to_string()))?;

        if !response.ok() {
            return Err(install_error(format!("HTTP status {}", response.status)));
        }
        Ok(response)
    }

    /// Activate phase: delete every bucket not owned by this version, then
    /// claim open pages
    ///
    /// Clients are claimed even when the purge fails; the purge error is
    /// returned afterwards so the host can retry on the next activation.
    pub async fn on_activate(&self) -> SwResult<ActivateReport> {
        info!("Activating {}", self.version);

        let purge = self.purge_stale().await;
        if let Err(ref e) = purge {
            warn!("Stale bucket purge incomplete: {}", e);
        }

        let clients_claimed = self.host.claim_clients().await?;
        info!("Claimed {} client(s)", clients_claimed);

        let purged = purge?;
        Ok(ActivateReport {
            version: self.version.to_string(),
            purged,
            clients_claimed,
        })
    }

    async fn purge_stale(&self) -> SwResult<Vec<String>> {
        let names = self.store.keys().await?;
        let (_, stale) = partition_buckets(&self.version, names);
        if stale.is_empty() {
            return Ok(stale);
        }

        let (deleted, failed) = self.delete_buckets(&stale).await;
        if !failed.is_empty() {
            return Err(SwError::Activate { failed });
        }
        info!("All stale buckets purged ({})", deleted.len());
        Ok(deleted)
    }
}
