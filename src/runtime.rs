//! Runtime factory for wiring a controller to its collaborators
//!
//! The CLI host keeps buckets on disk, talks to the origin over HTTP (or
//! not at all in offline mode) and records the worker lifecycle in a JSON
//! file under the state directory.

use crate::config::{Config, ConfigManager};
use crate::controller::{Controller, ControllerOptions};
use crate::error::SwResult;
use crate::host::StateFileHost;
use crate::net::{HttpNetwork, Network, OfflineNetwork};
use crate::store::DiskStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How the runtime reaches the origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMode {
    /// Real HTTP requests
    Online,
    /// Every request fails as if the device had no connectivity
    Offline,
}

impl NetworkMode {
    pub fn from_offline_flag(offline: bool) -> Self {
        if offline {
            Self::Offline
        } else {
            Self::Online
        }
    }
}

/// A controller together with the concrete store and host behind it
pub struct Runtime {
    pub controller: Controller,
    pub store: Arc<DiskStore>,
    pub host: Arc<StateFileHost>,
    pub network: Arc<dyn Network>,
}

/// Create the network for a mode
pub fn create_network(
    config: &Config,
    options: &ControllerOptions,
    mode: NetworkMode,
) -> Arc<dyn Network> {
    match mode {
        NetworkMode::Online => Arc::new(HttpNetwork::new(
            options.scope.clone(),
            Duration::from_secs(config.network.timeout_secs),
            config.network.user_agent.clone(),
        )),
        NetworkMode::Offline => Arc::new(OfflineNetwork),
    }
}

/// Build a runtime from configuration
pub fn create_runtime(config: &Config, mode: NetworkMode) -> SwResult<Runtime> {
    let options = ControllerOptions::from_config(config)?;
    let store_path = ConfigManager::store_path(config);
    debug!("Using bucket store at {}", store_path.display());

    let store = Arc::new(DiskStore::new(store_path));
    let host = Arc::new(StateFileHost::new(
        ConfigManager::worker_record_path(),
        options.version.clone(),
    ));
    let network = create_network(config, &options, mode);

    let controller = Controller::new(options, store.clone(), network.clone(), host.clone())?;

    Ok(Runtime {
        controller,
        store,
        host,
        network,
    })
}
