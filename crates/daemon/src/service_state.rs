use std::sync::Arc;

use common::prelude::{EnvelopeError, EnvelopeKey};

use crate::capture::CapturePipeline;
use crate::database::{Database, DatabaseSetupError};
use crate::restore::RestoreWorkflow;
use crate::service_config::Config;
use crate::watch::debounce::{DebounceEngine, PendingChanges};
use crate::watch::{WatchManager, WatchRegistry};

/// Main service state - wires the store, the envelope key, and the
/// capture/restore machinery together behind one cloneable handle.
#[derive(Clone)]
pub struct State {
    database: Database,
    watch_manager: WatchManager,
    restore: RestoreWorkflow,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        // 1. Setup database
        let database = match config.sqlite_path {
            Some(ref path) => {
                tracing::info!(path = %path.display(), "opening database");
                Database::connect(path).await?
            }
            None => {
                tracing::info!("no database path configured, using in-memory database");
                Database::in_memory().await?
            }
        };

        // 2. Load the envelope key. Absence or a wrong-sized value is
        //    startup-fatal: no capture or restore can work without it.
        let key = EnvelopeKey::from_env()?;

        // 3. Capture/restore machinery, sharing one process-wide capture
        //    lock so version-number assignment can never race.
        let capture_lock = Arc::new(tokio::sync::Mutex::new(()));
        let pipeline = CapturePipeline::new(database.clone(), key.clone(), capture_lock.clone());
        let restore = RestoreWorkflow::new(database.clone(), key, capture_lock);

        // 4. Watch plumbing: injected registries, debouncer feeding the
        //    pipeline.
        let debounce = DebounceEngine::new(
            Arc::new(PendingChanges::default()),
            Arc::new(pipeline),
        );
        let watch_manager = WatchManager::new(Arc::new(WatchRegistry::default()), debounce);

        Ok(Self {
            database,
            watch_manager,
            restore,
        })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn watch_manager(&self) -> &WatchManager {
        &self.watch_manager
    }

    pub fn restore(&self) -> &RestoreWorkflow {
        &self.restore
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("database setup failed: {0}")]
    Database(#[from] DatabaseSetupError),

    #[error("envelope key unavailable: {0}")]
    EnvelopeKey(#[from] EnvelopeError),
}
