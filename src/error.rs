//! Error types for swcache
//!
//! All modules use `SwResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for swcache operations
pub type SwResult<T> = Result<T, SwError>;

/// All errors that can occur in swcache
#[derive(Error, Debug)]
pub enum SwError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Policy errors
    #[error("Invalid cache version '{0}': must be non-empty with no whitespace or path separators")]
    InvalidVersion(String),

    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid bypass pattern '{pattern}': {reason}")]
    BypassPattern { pattern: String, reason: String },

    // Network errors
    #[error("Network request failed for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Network unavailable (offline): {0}")]
    Offline(String),

    // Lifecycle errors
    #[error("Install failed, asset {url} could not be cached: {reason}")]
    InstallAsset { url: String, reason: String },

    #[error("Install failed, bucket {bucket} could not be populated: {reason}")]
    InstallWrite { bucket: String, reason: String },

    #[error("Activation purge incomplete, failed to delete: {}", failed.join(", "))]
    Activate { failed: Vec<String> },

    #[error("Force update failed: {0}")]
    ForceUpdate(String),

    #[error("No worker installed for version {0}")]
    NotInstalled(String),

    // Storage errors
    #[error("Cache storage error in bucket {bucket}: {reason}")]
    Storage { bucket: String, reason: String },

    #[error("Corrupt cache entry {path}: {reason}")]
    CorruptEntry { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl SwError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network transport error
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a storage error for a bucket
    pub fn storage(bucket: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Storage {
            bucket: bucket.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is a network-level failure (offline, DNS, timeout)
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Offline(_))
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::Offline(_)
                | Self::InstallAsset { .. }
                | Self::InstallWrite { .. }
                | Self::Activate { .. }
                | Self::ForceUpdate(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Offline(_) => Some("Only previously fetched URLs are served while offline"),
            Self::InstallAsset { .. } => {
                Some("Check worker.origin and worker.static_assets, then run: swcache install")
            }
            Self::InstallWrite { .. } => Some("Check free space under the bucket directory"),
            Self::Activate { .. } => Some("Run: swcache activate (the purge is retried)"),
            Self::ForceUpdate(_) => Some("Retry: swcache message force-update"),
            Self::NotInstalled(_) => Some("Run: swcache install"),
            Self::CorruptEntry { .. } => Some("Run: swcache message force-update --yes"),
            _ => None,
        }
    }
}
