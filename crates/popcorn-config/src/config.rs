use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub watched: WatchedConfig,
    #[serde(default)]
    pub recent: RecentConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Bound on the search cache; oldest entries are evicted past this.
    #[serde(default = "default_cache_entries")]
    pub max_search_entries: usize,
    /// Bound on the details cache, counted independently of search.
    #[serde(default = "default_cache_entries")]
    pub max_details_entries: usize,
    /// Queries shorter than this (trimmed) never hit the network.
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
    /// How many leading search results get their details prefetched.
    #[serde(default = "default_prefetch_count")]
    pub prefetch_count: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchedConfig {
    /// How long a removal stays undoable.
    #[serde(default = "default_undo_window_secs")]
    pub undo_window_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecentConfig {
    #[serde(default = "default_max_recent")]
    pub max_entries: usize,
}

fn default_base_url() -> String {
    "https://www.omdbapi.com".to_string()
}

fn default_cache_entries() -> usize {
    80
}

fn default_min_query_len() -> usize {
    3
}

fn default_prefetch_count() -> usize {
    5
}

fn default_undo_window_secs() -> u64 {
    10
}

fn default_max_recent() -> usize {
    8
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_search_entries: default_cache_entries(),
            max_details_entries: default_cache_entries(),
            min_query_len: default_min_query_len(),
            prefetch_count: default_prefetch_count(),
        }
    }
}

impl Default for WatchedConfig {
    fn default() -> Self {
        Self {
            undo_window_secs: default_undo_window_secs(),
        }
    }
}

impl Default for RecentConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_recent(),
        }
    }
}

impl Config {
    /// Load from a TOML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config at {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.cache.max_search_entries, 80);
        assert_eq!(config.cache.min_query_len, 3);
        assert_eq!(config.recent.max_entries, 8);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\nmax_search_entries = 16\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.cache.max_search_entries, 16);
        assert_eq!(config.cache.max_details_entries, 80);
        assert_eq!(config.watched.undo_window_secs, 10);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.cache.prefetch_count = 3;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.cache.prefetch_count, 3);
    }
}
