use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::movie::MovieDetails;

/// A rated entry in the personal watched list.
///
/// Unique by `imdb_id` within the collection; display order is always derived
/// by an explicit sort, never by storage position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchedMovie {
    pub imdb_id: String,
    pub title: String,
    pub year: String,
    pub poster: Option<String>,
    pub runtime_minutes: u32,
    pub imdb_rating: f64,
    /// 0 means unrated.
    pub user_rating: u8,
    /// How many times the rating changed since the entry was created.
    #[serde(default)]
    pub rating_change_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WatchedMovie {
    /// Build a watched entry from fetched details plus the user's rating.
    /// Timestamps are placeholders; the store stamps them on insert.
    pub fn from_details(details: &MovieDetails, user_rating: u8) -> Self {
        let now = Utc::now();
        Self {
            imdb_id: details.imdb_id.clone(),
            title: details.title.clone(),
            year: details.year.clone(),
            poster: details.poster.clone(),
            runtime_minutes: details.runtime_minutes(),
            imdb_rating: details.imdb_rating_value(),
            user_rating,
            rating_change_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_rated(&self) -> bool {
        self.user_rating > 0
    }
}

/// Field-wise patch for [`WatchedMovie`]; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct WatchedPatch {
    pub user_rating: Option<u8>,
    pub imdb_rating: Option<f64>,
    pub runtime_minutes: Option<u32>,
    pub poster: Option<Option<String>>,
}

impl WatchedPatch {
    pub fn rating(user_rating: u8) -> Self {
        Self {
            user_rating: Some(user_rating),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_change_count_defaults_on_old_blobs() {
        // Entries persisted before the counter existed deserialize with 0.
        let raw = r#"{
            "imdb_id": "tt0133093",
            "title": "The Matrix",
            "year": "1999",
            "poster": null,
            "runtime_minutes": 136,
            "imdb_rating": 8.7,
            "user_rating": 9,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        }"#;
        let movie: WatchedMovie = serde_json::from_str(raw).unwrap();
        assert_eq!(movie.rating_change_count, 0);
        assert!(movie.is_rated());
    }
}
