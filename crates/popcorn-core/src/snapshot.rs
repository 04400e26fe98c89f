//! Cache snapshot persistence.
//!
//! The caches themselves are in-memory; the CLI round-trips them to JSON
//! files between runs so a cached query is still a cache hit next invocation.
//! Corrupt snapshots are deleted and replaced by an empty cache - stale or
//! missing cache data is never an error.

use std::hash::Hash;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{BoundedCache, CacheEntry};

pub const SEARCH_CACHE: &str = "search";
pub const DETAILS_CACHE: &str = "details";

pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn snapshot_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Load a named cache, or an empty one when the snapshot is absent or
    /// corrupt. A corrupt file is deleted so the next save starts clean.
    pub fn load<K, V>(&self, name: &str, capacity: usize) -> BoundedCache<K, V>
    where
        K: Eq + Hash + Clone + DeserializeOwned,
        V: DeserializeOwned,
    {
        let path = self.snapshot_path(name);
        if !path.exists() {
            debug!("Cache snapshot miss: {} (file does not exist)", name);
            return BoundedCache::new(capacity);
        }

        let entries: Vec<(K, CacheEntry<V>)> = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(
                        "Cache snapshot corruption detected for {}: {}. Deleting corrupted file.",
                        name, err
                    );
                    if let Err(rm_err) = std::fs::remove_file(&path) {
                        warn!("Failed to delete corrupted snapshot: {}", rm_err);
                    }
                    return BoundedCache::new(capacity);
                }
            },
            Err(err) => {
                warn!("Failed to read cache snapshot for {}: {}", name, err);
                return BoundedCache::new(capacity);
            }
        };

        let mut cache = BoundedCache::new(capacity);
        let count = entries.len();
        for (key, entry) in entries {
            cache.restore(key, entry);
        }
        info!("Cache snapshot hit: {} (loaded {} entries)", name, count);
        cache
    }

    /// Persist a named cache atomically (write to a temp file, then rename).
    pub fn save<K, V>(&self, name: &str, cache: &BoundedCache<K, V>) -> Result<()>
    where
        K: Eq + Hash + Clone + Serialize,
        V: Serialize,
    {
        let mut entries: Vec<(&K, &CacheEntry<V>)> = cache.iter().collect();
        // Stable file contents for identical caches.
        entries.sort_by_key(|(_, entry)| entry.seq);

        let json = serde_json::to_string_pretty(&entries)?;
        let path = self.snapshot_path(name);
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, json)
            .with_context(|| format!("Failed to write cache snapshot for {}", name))?;
        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to commit cache snapshot for {}", name))?;

        debug!("Cache snapshot saved: {} ({} entries)", name, cache.len());
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        for name in [SEARCH_CACHE, DETAILS_CACHE] {
            let path = self.snapshot_path(name);
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove cache snapshot {}", name))?;
            }
        }
        info!("Cleared cache snapshots in {}", self.dir.display());
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
