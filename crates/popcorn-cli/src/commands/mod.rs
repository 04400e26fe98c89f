pub mod browse;
pub mod clear;
pub mod config;
pub mod details;
pub mod recent;
pub mod search;
pub mod watched;

use std::sync::Arc;

use color_eyre::eyre::{eyre, Result};
use popcorn_api::OmdbClient;
use popcorn_config::{Config, CredentialStore, PathManager};
use popcorn_core::{CacheStore, FileStorage, RecentlyViewed, WatchedStore};

/// Storage key for the pending undo token written by `watched remove`.
pub const PENDING_UNDO_KEY: &str = "pending_undo";

/// Config, paths, and the shared storage backing every command.
pub struct AppContext {
    pub config: Config,
    pub paths: PathManager,
    pub storage: Arc<FileStorage>,
}

impl AppContext {
    pub fn init() -> Result<Self> {
        let paths = PathManager::default();
        paths
            .ensure_directories()
            .map_err(|e| eyre!("Failed to prepare data directories: {}", e))?;
        let config = Config::load(&paths.config_file()).map_err(|e| eyre!("{}", e))?;
        let storage = Arc::new(
            FileStorage::new(paths.storage_dir()).map_err(|e| eyre!("{}", e))?,
        );
        Ok(Self {
            config,
            paths,
            storage,
        })
    }

    /// The upstream client; fails with a hint when no API key is stored yet.
    pub fn provider(&self) -> Result<Arc<OmdbClient>> {
        let mut credentials = CredentialStore::new(self.paths.credentials_file());
        credentials
            .load()
            .map_err(|e| eyre!("Failed to load credentials: {}", e))?;
        let api_key = credentials.api_key().cloned().ok_or_else(|| {
            eyre!("No API key configured. Run `popcorn config set-key` first.")
        })?;
        Ok(Arc::new(OmdbClient::with_base_url(
            self.config.api.base_url.clone(),
            api_key,
        )))
    }

    pub fn cache_store(&self) -> Result<CacheStore> {
        CacheStore::new(self.paths.cache_dir()).map_err(|e| eyre!("{}", e))
    }

    pub fn watched_store(&self) -> WatchedStore<Arc<FileStorage>> {
        let undo_window = chrono::Duration::seconds(self.config.watched.undo_window_secs as i64);
        WatchedStore::load(self.storage.clone(), undo_window)
    }

    pub fn recently_viewed(&self) -> RecentlyViewed<Arc<FileStorage>> {
        RecentlyViewed::load(self.storage.clone(), self.config.recent.max_entries)
    }
}
