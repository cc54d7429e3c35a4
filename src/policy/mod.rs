//! Interception policy: cache versioning and bypass rules

pub mod bypass;
pub mod version;

pub use bypass::{BypassRule, BypassRuleSpec, BypassRules};
pub use version::{partition_buckets, BucketKind, CacheVersion};
