//! Configuration schema for swcache
//!
//! Configuration is stored at `~/.config/swcache/config.toml`

use crate::policy::BypassRuleSpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Controller policy
    pub worker: WorkerConfig,

    /// Requests that are never intercepted
    pub bypass: BypassConfig,

    /// Cache store location
    pub store: StoreConfig,

    /// Network settings
    pub network: NetworkConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable audit logging
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// Controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Cache version; every bucket name is prefixed with it
    pub version: String,

    /// Origin the controller serves
    pub origin: String,

    /// Paths pre-cached at install
    pub static_assets: Vec<String>,

    /// Offline fallback for HTML navigations
    pub shell_document: String,

    /// Only cache same-origin responses at runtime
    pub same_origin_only: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            version: "shell-v1.0.0".to_string(),
            origin: "https://app.example.com/".to_string(),
            static_assets: crate::controller::default_static_assets(),
            shell_document: "/index.html".to_string(),
            same_origin_only: false,
        }
    }
}

/// Bypass rule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BypassConfig {
    /// Ordered rules, first match wins
    pub rules: Vec<BypassRuleSpec>,
}

impl Default for BypassConfig {
    fn default() -> Self {
        Self {
            rules: BypassRuleSpec::defaults(),
        }
    }
}

/// Cache store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Bucket directory (defaults to `<state dir>/buckets`)
    pub path: Option<PathBuf>,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// User-Agent sent when the request has none
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("swcache/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
