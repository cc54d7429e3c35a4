//! Fetch interception: bypass, or network-first with cache fallback

use super::Controller;
use crate::error::{SwError, SwResult};
use crate::http::{Method, Request, Response, ResponseType};
use crate::policy::BucketKind;
use crate::store::{CachedEntry, RequestKey};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why a request was left to the network untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassthroughReason {
    /// Only GET requests are intercepted
    Method(Method),
    /// URL matched a bypass rule (rule description)
    Bypass(String),
}

impl fmt::Display for PassthroughReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method(m) => write!(f, "{} requests are not intercepted", m),
            Self::Bypass(rule) => write!(f, "matched bypass rule {}", rule),
        }
    }
}

/// Where an intercepted response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    Shell,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Cache => write!(f, "cache"),
            Self::Shell => write!(f, "shell"),
        }
    }
}

/// Result of one interception
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The controller did not intervene; the host performs a native fetch
    Passthrough(PassthroughReason),
    /// The controller answered the request
    Respond {
        response: Response,
        source: ResponseSource,
    },
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Respond { response, .. } => Some(response),
            Self::Passthrough(_) => None,
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            Self::Respond { source, .. } => Some(*source),
            Self::Passthrough(_) => None,
        }
    }
}

impl Controller {
    /// Why the controller would not intercept this request, if it would not
    pub fn passthrough_reason(&self, request: &Request) -> Option<PassthroughReason> {
        if let Some((_, rule)) = self.bypass.first_match(request.url.as_str()) {
            return Some(PassthroughReason::Bypass(rule.to_string()));
        }
        if request.method != Method::Get {
            return Some(PassthroughReason::Method(request.method));
        }
        None
    }

    /// Fetch hook
    ///
    /// Eligible requests go to the network first. A 200 response is written
    /// to `{version}-dynamic` in the background and returned. When the
    /// network fails the request is answered from any bucket, then HTML
    /// navigations fall back to the shell document; otherwise the network
    /// error is returned unchanged.
    pub async fn on_fetch(&self, request: &Request) -> SwResult<FetchOutcome> {
        if let Some(reason) = self.passthrough_reason(request) {
            debug!("Passthrough {} {}: {}", request.method, request.url, reason);
            return Ok(FetchOutcome::Passthrough(reason));
        }

        let key = RequestKey::get(request.url.as_str());
        match self.network.fetch(request).await {
            Ok(response) => {
                if self.should_cache(&response) {
                    self.spawn_cache_write(key, &response);
                } else {
                    debug!(
                        "Not caching {} (status {}, type {})",
                        request.url, response.status, response.kind
                    );
                }
                Ok(FetchOutcome::Respond {
                    response,
                    source: ResponseSource::Network,
                })
            }
            Err(err) => self.fallback(request, &key, err).await,
        }
    }

    fn should_cache(&self, response: &Response) -> bool {
        response.status == 200 && (!self.same_origin_only || response.kind == ResponseType::Basic)
    }

    /// Detached write into the dynamic bucket; failures are only logged
    fn spawn_cache_write(&self, key: RequestKey, response: &Response) {
        let store = Arc::clone(&self.store);
        let bucket = self.version.bucket(BucketKind::Dynamic);
        let entry = CachedEntry::capture(key, response);

        let handle = tokio::spawn(async move {
            let key = entry.key.clone();
            match store.put(&bucket, entry).await {
                Ok(()) => debug!("Refreshed {} in {}", key, bucket),
                Err(e) => warn!("Cache write for {} failed: {}", key, e),
            }
        });
        self.track_write(handle);
    }

    async fn fallback(
        &self,
        request: &Request,
        key: &RequestKey,
        err: SwError,
    ) -> SwResult<FetchOutcome> {
        debug!("Network failed for {}: {}", request.url, err);

        if let Some(entry) = self.lookup(key).await {
            info!("Serving from cache: {}", request.url);
            return Ok(FetchOutcome::Respond {
                response: entry.response,
                source: ResponseSource::Cache,
            });
        }

        if request.accepts_html() {
            let shell_key = RequestKey::get(self.shell_url.as_str());
            if let Some(entry) = self.lookup(&shell_key).await {
                info!("Serving offline shell for {}", request.url);
                return Ok(FetchOutcome::Respond {
                    response: entry.response,
                    source: ResponseSource::Shell,
                });
            }
        }

        Err(err)
    }

    /// Cache lookup across all buckets; read errors count as a miss
    async fn lookup(&self, key: &RequestKey) -> Option<CachedEntry> {
        match self.store.match_any(key).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Cache lookup for {} failed: {}", key, e);
                None
            }
        }
    }
}
