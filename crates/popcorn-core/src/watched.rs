//! The persisted watched list.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use popcorn_models::{WatchedMovie, WatchedPatch};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::KeyValueStorage;

/// Fixed storage key for the serialized collection.
pub const STORAGE_KEY: &str = "watched";

/// A removed entry plus everything needed to put it back where it was.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemovedWatched {
    pub entry: WatchedMovie,
    pub index: usize,
    pub removed_at: DateTime<Utc>,
}

/// Watched-list store over a key-value storage backend.
///
/// Every mutation persists the whole collection as JSON under [`STORAGE_KEY`].
/// A corrupt or missing blob loads as an empty list, never as an error.
pub struct WatchedStore<S> {
    storage: S,
    items: Vec<WatchedMovie>,
    undo_window: Duration,
}

impl<S: KeyValueStorage> WatchedStore<S> {
    pub fn load(storage: S, undo_window: Duration) -> Self {
        let items = match storage.get(STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(items) => items,
                Err(err) => {
                    warn!("Watched list is corrupted: {}. Starting empty.", err);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("Failed to read watched list: {}. Starting empty.", err);
                Vec::new()
            }
        };
        debug!("Loaded watched list with {} entries", items.len());
        Self {
            storage,
            items,
            undo_window,
        }
    }

    pub fn list(&self) -> &[WatchedMovie] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&WatchedMovie> {
        self.items.iter().find(|movie| movie.imdb_id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Upsert by id: a fresh entry is stamped `created_at = updated_at = now`;
    /// re-adding merges fields (new values win) while preserving the original
    /// `created_at`, stamping `updated_at`, and counting rating changes.
    pub fn add(&mut self, movie: WatchedMovie) -> Result<&WatchedMovie> {
        let now = Utc::now();
        let position = self
            .items
            .iter()
            .position(|existing| existing.imdb_id == movie.imdb_id);

        let index = match position {
            Some(index) => {
                let existing = &self.items[index];
                let rating_change_count = if existing.user_rating != movie.user_rating {
                    existing.rating_change_count + 1
                } else {
                    existing.rating_change_count
                };
                let created_at = existing.created_at;
                self.items[index] = WatchedMovie {
                    rating_change_count,
                    created_at,
                    updated_at: now,
                    ..movie
                };
                index
            }
            None => {
                self.items.push(WatchedMovie {
                    created_at: now,
                    updated_at: now,
                    ..movie
                });
                self.items.len() - 1
            }
        };

        self.persist()?;
        Ok(&self.items[index])
    }

    /// Patch an existing entry in place. Returns `None` when the id is absent.
    pub fn update(&mut self, id: &str, patch: WatchedPatch) -> Result<Option<&WatchedMovie>> {
        let index = match self.items.iter().position(|movie| movie.imdb_id == id) {
            Some(index) => index,
            None => return Ok(None),
        };

        {
            let movie = &mut self.items[index];
            if let Some(user_rating) = patch.user_rating {
                if movie.user_rating != user_rating {
                    movie.rating_change_count += 1;
                }
                movie.user_rating = user_rating;
            }
            if let Some(imdb_rating) = patch.imdb_rating {
                movie.imdb_rating = imdb_rating;
            }
            if let Some(runtime_minutes) = patch.runtime_minutes {
                movie.runtime_minutes = runtime_minutes;
            }
            if let Some(poster) = patch.poster {
                movie.poster = poster;
            }
            movie.updated_at = Utc::now();
        }

        self.persist()?;
        Ok(Some(&self.items[index]))
    }

    /// Remove by id, returning an undo token that restores the entry at its
    /// original position.
    pub fn remove(&mut self, id: &str) -> Result<Option<RemovedWatched>> {
        let index = match self.items.iter().position(|movie| movie.imdb_id == id) {
            Some(index) => index,
            None => return Ok(None),
        };

        let entry = self.items.remove(index);
        self.persist()?;
        Ok(Some(RemovedWatched {
            entry,
            index,
            removed_at: Utc::now(),
        }))
    }

    /// Restore a removed entry at its original ordinal position. A no-op
    /// (returning false) once the undo window has elapsed or when the id has
    /// been re-added in the meantime.
    pub fn undo(&mut self, removed: RemovedWatched) -> Result<bool> {
        if Utc::now() - removed.removed_at > self.undo_window {
            debug!("Undo window elapsed for {}", removed.entry.imdb_id);
            return Ok(false);
        }
        if self.get(&removed.entry.imdb_id).is_some() {
            debug!("{} was re-added; undo is a no-op", removed.entry.imdb_id);
            return Ok(false);
        }

        let index = removed.index.min(self.items.len());
        self.items.insert(index, removed.entry);
        self.persist()?;
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.items.clear();
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string(&self.items)?;
        self.storage.set(STORAGE_KEY, &json)
    }
}
