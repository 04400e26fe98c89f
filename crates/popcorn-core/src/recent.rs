//! Recently-viewed ring: most recent first, deduped by id, bounded.

use anyhow::Result;
use chrono::Utc;
use popcorn_models::{MovieSummary, RecentMovie};
use tracing::warn;

use crate::storage::KeyValueStorage;

/// Fixed storage key for the serialized ring.
pub const STORAGE_KEY: &str = "recently_viewed";

pub const DEFAULT_MAX_RECENT: usize = 8;

pub struct RecentlyViewed<S> {
    storage: S,
    entries: Vec<RecentMovie>,
    max_entries: usize,
}

impl<S: KeyValueStorage> RecentlyViewed<S> {
    pub fn load(storage: S, max_entries: usize) -> Self {
        let entries = match storage.get(STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("Recently-viewed list is corrupted: {}. Starting empty.", err);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("Failed to read recently-viewed list: {}. Starting empty.", err);
                Vec::new()
            }
        };
        Self {
            storage,
            entries,
            max_entries: max_entries.max(1),
        }
    }

    pub fn list(&self) -> &[RecentMovie] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Push to the front, dropping any older copy of the same id and anything
    /// past the bound.
    pub fn record(&mut self, movie: &MovieSummary) -> Result<()> {
        self.entries.retain(|entry| entry.imdb_id != movie.imdb_id);
        self.entries
            .insert(0, RecentMovie::from_summary(movie, Utc::now()));
        self.entries.truncate(self.max_entries);
        self.persist()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string(&self.entries)?;
        self.storage.set(STORAGE_KEY, &json)
    }
}
