//! Network abstraction
//!
//! Provides a trait for the fetch primitive the controller sits in front of,
//! so interception policy can be exercised without a live origin.

pub mod http;

pub use self::http::HttpNetwork;

use crate::error::{SwError, SwResult};
use crate::http::{Request, Response};
use async_trait::async_trait;

/// Abstract network interface
///
/// Implementations return `Ok` for any response the server produced,
/// whatever its status. `Err` means the request never completed (offline,
/// DNS failure, timeout, aborted connection).
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request and read the full response body
    async fn fetch(&self, request: &Request) -> SwResult<Response>;

    /// Human-readable name for display
    fn name(&self) -> &'static str;
}

/// A network that is always unreachable
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineNetwork;

#[async_trait]
impl Network for OfflineNetwork {
    async fn fetch(&self, request: &Request) -> SwResult<Response> {
        Err(SwError::Offline(request.url.to_string()))
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}
