//! Host environment abstraction
//!
//! The controller needs two things from whatever environment runs it:
//! permission to activate without waiting for old pages to close, and a way
//! to take control of pages that are already open.

pub mod state;

pub use state::{StateFileHost, WorkerPhase, WorkerRecord};

use crate::error::SwResult;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Abstract host interface
#[async_trait]
pub trait ClientHost: Send + Sync {
    /// Record that this controller finished installing
    async fn register(&self) -> SwResult<()> {
        Ok(())
    }

    /// Mark the installed controller ready to activate immediately
    async fn skip_waiting(&self) -> SwResult<()>;

    /// Route every open page through this controller, returning how many
    /// pages were claimed
    async fn claim_clients(&self) -> SwResult<usize>;
}

/// Host with a fixed set of open pages, recording every call
#[derive(Debug, Default)]
pub struct InMemoryHost {
    open_clients: usize,
    skip_waiting_calls: AtomicUsize,
    claimed: AtomicUsize,
}

impl InMemoryHost {
    pub fn new(open_clients: usize) -> Self {
        Self {
            open_clients,
            ..Self::default()
        }
    }

    pub fn skip_waiting_calls(&self) -> usize {
        self.skip_waiting_calls.load(Ordering::SeqCst)
    }

    /// Number of pages currently controlled
    pub fn claimed(&self) -> usize {
        self.claimed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientHost for InMemoryHost {
    async fn skip_waiting(&self) -> SwResult<()> {
        self.skip_waiting_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn claim_clients(&self) -> SwResult<usize> {
        self.claimed.store(self.open_clients, Ordering::SeqCst);
        Ok(self.open_clients)
    }
}
