//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::media::{AssetStore, ChunkStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    chunks: ChunkStore,
    assets: AssetStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Chunks live under `<media dir>/chunks`, merged assets under
    /// `<media dir>/assets`; only the latter is served publicly.
    pub fn new(config: Config, db: SqlitePool) -> Self {
        let chunks = ChunkStore::new(config.media.dir.clone());
        let assets = AssetStore::new(
            config.media.dir.join("assets"),
            config.media.public_prefix.clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                chunks,
                assets,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the chunk store
    pub fn chunks(&self) -> &ChunkStore {
        &self.inner.chunks
    }

    /// Get the merged asset store
    pub fn assets(&self) -> &AssetStore {
        &self.inner.assets
    }
}
