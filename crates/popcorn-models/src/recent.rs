use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::movie::MovieSummary;

/// An entry in the recently-viewed ring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentMovie {
    pub imdb_id: String,
    pub title: String,
    pub year: String,
    pub poster: Option<String>,
    pub viewed_at: DateTime<Utc>,
}

impl RecentMovie {
    pub fn from_summary(summary: &MovieSummary, viewed_at: DateTime<Utc>) -> Self {
        Self {
            imdb_id: summary.imdb_id.clone(),
            title: summary.title.clone(),
            year: summary.year.clone(),
            poster: summary.poster.clone(),
            viewed_at,
        }
    }
}
