//! swcache - offline cache controller
//!
//! Versioned install/activate lifecycle, network-first request
//! interception with cache and shell fallbacks, and a small control
//! channel for forced updates. The controller is host-agnostic; the
//! bundled CLI drives it against an on-disk store and an HTTP origin.

pub mod audit;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod http;
pub mod net;
pub mod policy;
pub mod runtime;
pub mod store;
pub mod ui;

pub use error::{SwError, SwResult};
