//! Application state.

use std::sync::Arc;

use ridesapp_rides::RideManager;
use ridesapp_store::Store;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Ride components over the configured store.
    pub rides: RideManager,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        Self {
            rides: RideManager::new(store),
            config,
        }
    }

    /// The storage backend.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.rides.store().as_ref()
    }
}
