//! Cache versioning and bucket naming
//!
//! Every bucket a controller owns is named `{version}-{kind}`. Anything in
//! the store that does not carry the active `{version}-` prefix is stale.

use crate::error::{SwError, SwResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deployment generation identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheVersion(String);

impl CacheVersion {
    /// Validate and wrap a version string
    pub fn new(version: impl Into<String>) -> SwResult<Self> {
        let version = version.into();
        let valid = !version.is_empty()
            && !version
                .chars()
                .any(|c| c.is_whitespace() || c == '/' || c == '\\');
        if !valid || version == "." || version == ".." {
            return Err(SwError::InvalidVersion(version));
        }
        Ok(Self(version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bucket name prefix owned by this version
    pub fn prefix(&self) -> String {
        format!("{}-", self.0)
    }

    /// Full bucket name for a bucket kind
    pub fn bucket(&self, kind: BucketKind) -> String {
        format!("{}-{}", self.0, kind)
    }

    /// Whether a bucket name belongs to this version
    pub fn owns(&self, bucket: &str) -> bool {
        bucket
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
    }
}

impl fmt::Display for CacheVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CacheVersion {
    type Error = SwError;

    fn try_from(value: String) -> SwResult<Self> {
        Self::new(value)
    }
}

impl From<CacheVersion> for String {
    fn from(version: CacheVersion) -> Self {
        version.0
    }
}

/// The two partitions a controller maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketKind {
    /// Shell assets populated at install
    Static,
    /// Runtime GET responses populated opportunistically
    Dynamic,
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => f.write_str("static"),
            Self::Dynamic => f.write_str("dynamic"),
        }
    }
}

/// Split bucket names into (owned, stale) for a version
pub fn partition_buckets(version: &CacheVersion, names: Vec<String>) -> (Vec<String>, Vec<String>) {
    names.into_iter().partition(|name| version.owns(name))
}
