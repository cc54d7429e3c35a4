//! Bypass rules: URLs the controller must never intercept
//!
//! Rules are evaluated in order against the absolute request URL and the
//! first match wins. A bypassed request is never read from or written to
//! any bucket.

use crate::error::{SwError, SwResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serializable rule definition, as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pattern", rename_all = "lowercase")]
pub enum BypassRuleSpec {
    /// Matches when the URL contains the pattern anywhere
    Substring(String),
    /// Matches when the URL starts with the pattern
    Prefix(String),
    /// Matches when the regular expression finds a match in the URL
    Regex(String),
}

impl BypassRuleSpec {
    pub fn substring(pattern: &str) -> Self {
        Self::Substring(pattern.to_string())
    }

    pub fn prefix(pattern: &str) -> Self {
        Self::Prefix(pattern.to_string())
    }

    /// Default rule set: auth/API providers, edge functions, realtime
    /// gateways, local dev servers, hosted previews, browser extensions and
    /// hot-reload paths.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::substring("supabase"),
            Self::substring("google"),
            Self::substring("/functions/"),
            Self::substring("ai.gateway"),
            Self::substring("localhost"),
            Self::substring("lovableproject.com"),
            Self::substring("chrome-extension"),
            Self::substring("hot-update"),
            Self::substring("__vite"),
            Self::prefix("ws://"),
            Self::prefix("wss://"),
        ]
    }
}

/// A compiled rule
#[derive(Debug, Clone)]
pub enum BypassRule {
    Substring(String),
    Prefix(String),
    Regex(Regex),
}

impl BypassRule {
    /// Compile a rule definition
    pub fn compile(spec: &BypassRuleSpec) -> SwResult<Self> {
        match spec {
            BypassRuleSpec::Substring(p) | BypassRuleSpec::Prefix(p) if p.is_empty() => {
                Err(SwError::BypassPattern {
                    pattern: p.clone(),
                    reason: "pattern must not be empty".to_string(),
                })
            }
            BypassRuleSpec::Substring(p) => Ok(Self::Substring(p.clone())),
            BypassRuleSpec::Prefix(p) => Ok(Self::Prefix(p.clone())),
            BypassRuleSpec::Regex(p) => Regex::new(p)
                .map(Self::Regex)
                .map_err(|e| SwError::BypassPattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                }),
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Substring(p) => url.contains(p.as_str()),
            Self::Prefix(p) => url.starts_with(p.as_str()),
            Self::Regex(re) => re.is_match(url),
        }
    }
}

impl fmt::Display for BypassRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Substring(p) => write!(f, "substring \"{}\"", p),
            Self::Prefix(p) => write!(f, "prefix \"{}\"", p),
            Self::Regex(re) => write!(f, "regex /{}/", re.as_str()),
        }
    }
}

/// Ordered rule set
#[derive(Debug, Clone, Default)]
pub struct BypassRules {
    rules: Vec<BypassRule>,
}

impl BypassRules {
    /// Compile every spec, failing on the first invalid pattern
    pub fn compile(specs: &[BypassRuleSpec]) -> SwResult<Self> {
        let rules = specs
            .iter()
            .map(BypassRule::compile)
            .collect::<SwResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// First rule matching the URL, with its position
    pub fn first_match(&self, url: &str) -> Option<(usize, &BypassRule)> {
        self.rules.iter().enumerate().find(|(_, r)| r.matches(url))
    }

    pub fn is_bypassed(&self, url: &str) -> bool {
        self.first_match(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BypassRule> {
        self.rules.iter()
    }
}
