use serde::{Deserialize, Serialize};

/// One row of a search result page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub imdb_id: String,
    pub title: String,
    pub year: String,
    /// Absent upstream posters arrive as an "N/A" sentinel and are mapped to None.
    pub poster: Option<String>,
}

/// Full metadata for a single title.
///
/// `runtime` and `imdb_rating` are kept as the free-text strings the upstream
/// sends ("148 min", "8.8"); use [`MovieDetails::runtime_minutes`] and
/// [`MovieDetails::imdb_rating_value`] for the parsed forms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetails {
    pub imdb_id: String,
    pub title: String,
    pub year: String,
    pub poster: Option<String>,
    pub runtime: String,
    pub imdb_rating: String,
    pub plot: String,
    pub released: String,
    pub actors: String,
    pub director: String,
    pub genre: String,
}

impl MovieDetails {
    pub fn summary(&self) -> MovieSummary {
        MovieSummary {
            imdb_id: self.imdb_id.clone(),
            title: self.title.clone(),
            year: self.year.clone(),
            poster: self.poster.clone(),
        }
    }

    /// Parse "148 min" style runtime to whole minutes, 0 when unparseable.
    pub fn runtime_minutes(&self) -> u32 {
        self.runtime
            .split_whitespace()
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }

    /// Parse the free-text rating, 0.0 when unparseable ("N/A" included).
    pub fn imdb_rating_value(&self) -> f64 {
        self.imdb_rating.trim().parse().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(runtime: &str, rating: &str) -> MovieDetails {
        MovieDetails {
            imdb_id: "tt0133093".to_string(),
            title: "The Matrix".to_string(),
            year: "1999".to_string(),
            poster: None,
            runtime: runtime.to_string(),
            imdb_rating: rating.to_string(),
            plot: String::new(),
            released: String::new(),
            actors: String::new(),
            director: String::new(),
            genre: String::new(),
        }
    }

    #[test]
    fn test_runtime_minutes_parses_leading_token() {
        assert_eq!(details("136 min", "8.7").runtime_minutes(), 136);
    }

    #[test]
    fn test_runtime_minutes_unparseable_is_zero() {
        assert_eq!(details("N/A", "8.7").runtime_minutes(), 0);
        assert_eq!(details("", "8.7").runtime_minutes(), 0);
    }

    #[test]
    fn test_imdb_rating_value() {
        assert_eq!(details("136 min", "8.7").imdb_rating_value(), 8.7);
        assert_eq!(details("136 min", "N/A").imdb_rating_value(), 0.0);
    }
}
