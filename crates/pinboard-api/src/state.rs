use std::sync::Arc;
use std::time::Duration;

use pinboard_core::{Collaborators, Engine, MemoryPermissionCache};
use pinboard_db::Database;
use pinboard_gateway::NotificationHub;
use pinboard_storage::LocalObjectStore;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub engine: Engine,
    pub storage: Arc<LocalObjectStore>,
    pub hub: NotificationHub,
    pub jwt_secret: String,
}

/// Tunables of the access/aggregation engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub aggregate_timeout: Duration,
    /// `None` keeps permission cache entries until invalidated.
    pub permission_ttl: Option<Duration>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            aggregate_timeout: Duration::from_millis(5000),
            permission_ttl: None,
        }
    }
}

impl AppStateInner {
    /// Wire the store, object storage and notification hub into one engine.
    pub fn new(
        db: Database,
        storage: LocalObjectStore,
        jwt_secret: String,
        settings: EngineSettings,
    ) -> AppState {
        let db = Arc::new(db);
        let storage = Arc::new(storage);
        let hub = NotificationHub::new();

        let deps = Collaborators {
            content: db.clone(),
            roles: db.clone(),
            bookmarks: db.clone(),
            profiles: db.clone(),
            media: storage.clone(),
            notifier: Arc::new(hub.clone()),
            cache: Arc::new(MemoryPermissionCache::new(settings.permission_ttl)),
        };

        Arc::new(Self {
            db,
            engine: Engine::new(deps, settings.aggregate_timeout),
            storage,
            hub,
            jwt_secret,
        })
    }

    /// Run a store call on the blocking pool.
    pub async fn blocking<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| ApiError::internal(anyhow::anyhow!("spawn_blocking join error: {}", e)))?
            .map_err(ApiError::internal)
    }
}
