//! Offline cache controller
//!
//! The controller is an explicit state object with one method per lifecycle
//! hook. Whatever environment supplies request interception calls these
//! hooks; storage, network and page control are reached only through the
//! [`CacheStore`], [`Network`] and [`ClientHost`] traits.
//!
//! | Hook | Purpose |
//! |------|---------|
//! | [`Controller::on_install`] | pre-warm `{version}-static`, all or nothing |
//! | [`Controller::on_activate`] | purge stale buckets, claim open pages |
//! | [`Controller::on_fetch`] | bypass, or network-first with cache fallback |
//! | [`Controller::on_message`] | force-update and version query |
//! | [`Controller::on_push`] | reserved, inert |

pub mod fetch;
pub mod lifecycle;
pub mod messages;

pub use fetch::{FetchOutcome, PassthroughReason, ResponseSource};
pub use lifecycle::{ActivateReport, InstallReport};
pub use messages::{reply_channel, ControlMessage, ControlReply, MessageOutcome, ReplyPort};

use crate::config::Config;
use crate::error::{SwError, SwResult};
use crate::host::ClientHost;
use crate::net::Network;
use crate::policy::{BypassRuleSpec, BypassRules, CacheVersion};
use crate::store::CacheStore;
use futures_util::future::join_all;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

/// Static policy a controller is built with
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Active deployment generation
    pub version: CacheVersion,
    /// Origin the controller serves; relative paths resolve against it
    pub scope: Url,
    /// Paths pre-cached at install
    pub static_assets: Vec<String>,
    /// Document served to HTML navigations when offline and uncached
    pub shell_document: String,
    /// Only cache same-origin (`basic`) responses in the dynamic bucket
    pub same_origin_only: bool,
    /// Ordered bypass rules
    pub bypass: BypassRules,
}

impl ControllerOptions {
    /// Options with the default manifest and bypass rules
    pub fn new(version: CacheVersion, scope: Url) -> SwResult<Self> {
        Ok(Self {
            version,
            scope,
            static_assets: default_static_assets(),
            shell_document: "/index.html".to_string(),
            same_origin_only: false,
            bypass: BypassRules::compile(&BypassRuleSpec::defaults())?,
        })
    }

    /// Build options from the loaded configuration
    pub fn from_config(config: &Config) -> SwResult<Self> {
        let scope = parse_scope(&config.worker.origin)?;
        Ok(Self {
            version: CacheVersion::new(config.worker.version.clone())?,
            scope,
            static_assets: config.worker.static_assets.clone(),
            shell_document: config.worker.shell_document.clone(),
            same_origin_only: config.worker.same_origin_only,
            bypass: BypassRules::compile(&config.bypass.rules)?,
        })
    }

    pub fn with_static_assets(mut self, assets: &[&str]) -> Self {
        self.static_assets = assets.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_bypass(mut self, bypass: BypassRules) -> Self {
        self.bypass = bypass;
        self
    }

    pub fn with_same_origin_only(mut self, same_origin_only: bool) -> Self {
        self.same_origin_only = same_origin_only;
        self
    }
}

/// Default install manifest
pub fn default_static_assets() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/favicon.ico"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Parse and validate a controller origin
pub fn parse_scope(origin: &str) -> SwResult<Url> {
    let url = Url::parse(origin).map_err(|e| SwError::InvalidUrl {
        url: origin.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(SwError::InvalidUrl {
            url: origin.to_string(),
            reason: "origin must be a hierarchical URL such as https://host/".to_string(),
        });
    }
    Ok(url)
}

/// The controller state object
pub struct Controller {
    version: CacheVersion,
    scope: Url,
    static_assets: Vec<Url>,
    shell_url: Url,
    same_origin_only: bool,
    bypass: BypassRules,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    host: Arc<dyn ClientHost>,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a controller, resolving the manifest and shell document
    /// against the scope
    pub fn new(
        options: ControllerOptions,
        store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
        host: Arc<dyn ClientHost>,
    ) -> SwResult<Self> {
        let resolve = |path: &str| resolve_against(&options.scope, path);
        let static_assets = options
            .static_assets
            .iter()
            .map(|p| resolve(p.as_str()))
            .collect::<SwResult<Vec<_>>>()?;
        let shell_url = resolve(options.shell_document.as_str())?;

        info!(
            "Controller loaded: version {}, scope {}, {} bypass rules",
            options.version,
            options.scope,
            options.bypass.len()
        );

        Ok(Self {
            version: options.version,
            scope: options.scope,
            static_assets,
            shell_url,
            same_origin_only: options.same_origin_only,
            bypass: options.bypass,
            store,
            network,
            host,
            pending_writes: Mutex::new(Vec::new()),
        })
    }

    pub fn version(&self) -> &CacheVersion {
        &self.version
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    pub fn bypass(&self) -> &BypassRules {
        &self.bypass
    }

    pub fn static_assets(&self) -> &[Url] {
        &self.static_assets
    }

    pub fn shell_url(&self) -> &Url {
        &self.shell_url
    }

    /// Resolve a path or absolute URL against the scope
    pub fn resolve(&self, path_or_url: &str) -> SwResult<Url> {
        resolve_against(&self.scope, path_or_url)
    }

    /// Push hook. Registered so hosts can deliver the event, but inert.
    pub fn on_push(&self, payload: Option<&[u8]>) {
        info!(
            "Push received ({} bytes), no handler registered",
            payload.map_or(0, <[u8]>::len)
        );
    }

    /// Wait for every in-flight background cache write to finish
    ///
    /// Short-lived hosts call this before exiting so detached writes are
    /// not dropped with the runtime.
    pub async fn flush(&self) {
        let handles = {
            let mut pending = self
                .pending_writes
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *pending)
        };

        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!("Background cache write task failed: {}", e);
            }
        }
    }

    fn track_write(&self, handle: JoinHandle<()>) {
        let mut pending = self
            .pending_writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Delete buckets concurrently, returning (deleted, failed) names
    async fn delete_buckets(&self, names: &[String]) -> (Vec<String>, Vec<String>) {
        let store = &self.store;
        let results = join_all(names.iter().map(|name| async move {
            (name.clone(), store.delete(name).await)
        }))
        .await;

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for (name, result) in results {
            match result {
                Ok(_) => {
                    info!("Purged bucket {}", name);
                    deleted.push(name);
                }
                Err(e) => {
                    warn!("Failed to delete bucket {}: {}", name, e);
                    failed.push(name);
                }
            }
        }
        (deleted, failed)
    }
}

fn resolve_against(scope: &Url, path_or_url: &str) -> SwResult<Url> {
    scope.join(path_or_url).map_err(|e| SwError::InvalidUrl {
        url: path_or_url.to_string(),
        reason: e.to_string(),
    })
}
