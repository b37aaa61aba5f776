//! Shared application state for the HTTP server.

use crate::collect::CollectionPass;
use crate::config::EngineConfig;
use crate::database::Database;
use crate::store::{DATABASE, LATEST_PASS};
use std::sync::{Arc, Mutex, RwLock};

/// State shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Snapshot database, if it could be opened.
    pub database: Option<Arc<Mutex<Database>>>,

    /// Latest collection pass.
    pub latest: Arc<RwLock<Option<CollectionPass>>>,

    pub config: Arc<EngineConfig>,
}

impl AppState {
    pub fn new(
        database: Option<Arc<Mutex<Database>>>,
        latest: Arc<RwLock<Option<CollectionPass>>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            database,
            latest,
            config: Arc::new(config),
        }
    }

    /// State wired to the process-wide database and pass.
    pub fn from_globals(config: EngineConfig) -> Self {
        Self::new((*DATABASE).clone(), Arc::clone(&LATEST_PASS), config)
    }
}
