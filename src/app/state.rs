use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::api::{HttpUserService, UserService, UsersApi};
use crate::app::{AppPrefs, Config};
use crate::http::Gateway;
use crate::query::{QueryClient, QueryOptions};
use crate::session::SessionStore;
use crate::storage::{DurableStorage, FileStorage};
use crate::store::Store;
use crate::upload::MediaUploader;

/// Global application state.
///
/// Owns every store and the single gateway; everything else borrows from
/// here.
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// Durable storage shared by the session store and the token stage
    pub storage: Arc<dyn DurableStorage>,
    /// Where durable storage lives, when it is on disk
    pub storage_dir: Option<PathBuf>,
    pub gateway: Arc<Gateway>,
    pub session: SessionStore,
    pub queries: QueryClient,
    /// UI preferences (in memory only)
    pub prefs: Store<AppPrefs>,
    pub users: UsersApi,
    pub uploader: MediaUploader,
}

impl AppState {
    /// Create app state backed by on-disk storage
    pub fn new(config: Config) -> Result<Self> {
        let storage = match &config.storage.dir {
            Some(dir) => FileStorage::new(dir.clone()),
            None => FileStorage::open_default(),
        }
        .context("Failed to open storage directory")?;
        let storage_dir = storage.dir().to_path_buf();

        let mut state = Self::with_storage(config, Arc::new(storage))?;
        state.storage_dir = Some(storage_dir);
        Ok(state)
    }

    /// Create app state over any storage backend
    pub fn with_storage(config: Config, storage: Arc<dyn DurableStorage>) -> Result<Self> {
        let gateway = Arc::new(
            Gateway::from_config(&config.api, Arc::clone(&storage))
                .context("Failed to build HTTP gateway")?,
        );
        let session = SessionStore::load(Arc::clone(&storage));
        let queries = QueryClient::new(QueryOptions::from(&config.query));
        let service: Arc<dyn UserService> = Arc::new(HttpUserService::new(Arc::clone(&gateway)));
        let users = UsersApi::new(service, queries.clone());
        let uploader = MediaUploader::new(Arc::clone(&gateway));

        Ok(Self {
            config,
            storage,
            storage_dir: None,
            gateway,
            session,
            queries,
            prefs: Store::new(AppPrefs::default()),
            users,
            uploader,
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("storage_dir", &self.storage_dir)
            .field("gateway", &self.gateway)
            .field("session", &self.session)
            .finish()
    }
}
