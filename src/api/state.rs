//! Application state for the leave engine API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::calculation::RotationAnchor;
use crate::config::ConfigLoader;
use crate::error::{EngineError, EngineResult};
use crate::store::InMemoryStore;

/// Shared application state.
///
/// Holds the loaded configuration and the store. Every request locks the
/// store for its whole duration, which serializes writers to a ledger.
#[derive(Clone)]
pub struct AppState {
    /// The loaded engine configuration.
    config: Arc<ConfigLoader>,
    /// The store behind every handler.
    store: Arc<Mutex<InMemoryStore>>,
}

impl AppState {
    /// Creates the state with a fresh store seeded from the configuration.
    ///
    /// Fails with `Validation` if a configured work pattern is invalid.
    pub fn new(config: ConfigLoader) -> EngineResult<Self> {
        let mut store = InMemoryStore::new();
        config.seed_work_patterns(&mut store)?;
        Ok(Self::with_store(config, store))
    }

    /// Creates the state around an existing store, without seeding.
    pub fn with_store(config: ConfigLoader, store: InMemoryStore) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Returns a reference to the configuration loader.
    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }

    /// The rotation anchor used by the work pattern calendar.
    pub fn rotation_anchor(&self) -> RotationAnchor {
        self.config.rotation_anchor()
    }

    /// Locks the store.
    pub fn store(&self) -> EngineResult<MutexGuard<'_, InMemoryStore>> {
        self.store.lock().map_err(|_| EngineError::Storage {
            message: "store lock poisoned by a panicking request".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LeaveStore;

    #[test]
    fn test_app_state_is_clone() {
        // Verify AppState can be cloned (required for axum state)
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_new_state_is_seeded() {
        let config = ConfigLoader::load("./config/default").unwrap();
        let state = AppState::new(config).unwrap();

        let store = state.store().unwrap();
        assert_eq!(store.load_work_patterns().unwrap().len(), 2);
    }
}
