//! Upstream payload shapes.
//!
//! The API signals success vs. failure with a string discriminator field
//! (`"Response": "True" | "False"`) rather than the transport status, so both
//! envelopes are tagged enums on that field.

use popcorn_models::{MovieDetails, MovieSummary, SearchPage};
use serde::Deserialize;

use crate::error::ProviderError;

/// Upstream sentinel for absent posters.
const POSTER_SENTINEL: &str = "N/A";

fn poster_from_wire(raw: String) -> Option<String> {
    if raw.is_empty() || raw == POSTER_SENTINEL {
        None
    } else {
        Some(raw)
    }
}

#[derive(Debug, Deserialize)]
pub struct WireSummary {
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "Poster")]
    pub poster: String,
}

impl From<WireSummary> for MovieSummary {
    fn from(wire: WireSummary) -> Self {
        Self {
            imdb_id: wire.imdb_id,
            title: wire.title,
            year: wire.year,
            poster: poster_from_wire(wire.poster),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "Response")]
pub enum SearchEnvelope {
    #[serde(rename = "True")]
    Success {
        #[serde(rename = "Search")]
        search: Vec<WireSummary>,
        /// Total match count across all pages, sent as a string.
        #[serde(rename = "totalResults")]
        total_results: String,
    },
    #[serde(rename = "False")]
    Failure {
        #[serde(rename = "Error")]
        error: Option<String>,
    },
}

impl SearchEnvelope {
    pub fn into_page(self, query: &str, page: u32) -> Result<SearchPage, ProviderError> {
        match self {
            Self::Success {
                search,
                total_results,
            } => Ok(SearchPage {
                query: query.to_string(),
                page,
                movies: search.into_iter().map(MovieSummary::from).collect(),
                total_results: total_results.parse().unwrap_or(0),
            }),
            Self::Failure { error } => Err(ProviderError::upstream(error)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "Response")]
pub enum DetailsEnvelope {
    #[serde(rename = "True")]
    Success {
        #[serde(rename = "imdbID")]
        imdb_id: String,
        #[serde(rename = "Title")]
        title: String,
        #[serde(rename = "Year")]
        year: String,
        #[serde(rename = "Poster")]
        poster: String,
        #[serde(rename = "Runtime")]
        runtime: String,
        #[serde(rename = "imdbRating")]
        imdb_rating: String,
        #[serde(rename = "Plot")]
        plot: String,
        #[serde(rename = "Released")]
        released: String,
        #[serde(rename = "Actors")]
        actors: String,
        #[serde(rename = "Director")]
        director: String,
        #[serde(rename = "Genre")]
        genre: String,
    },
    #[serde(rename = "False")]
    Failure {
        #[serde(rename = "Error")]
        error: Option<String>,
    },
}

impl DetailsEnvelope {
    pub fn into_details(self) -> Result<MovieDetails, ProviderError> {
        match self {
            Self::Success {
                imdb_id,
                title,
                year,
                poster,
                runtime,
                imdb_rating,
                plot,
                released,
                actors,
                director,
                genre,
            } => Ok(MovieDetails {
                imdb_id,
                title,
                year,
                poster: poster_from_wire(poster),
                runtime,
                imdb_rating,
                plot,
                released,
                actors,
                director,
                genre,
            }),
            Self::Failure { error } => Err(ProviderError::upstream(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_success_parses() {
        let raw = r#"{
            "Response": "True",
            "Search": [
                {"imdbID": "tt0078748", "Title": "Alien", "Year": "1979", "Poster": "https://example.com/alien.jpg"},
                {"imdbID": "tt0090605", "Title": "Aliens", "Year": "1986", "Poster": "N/A"}
            ],
            "totalResults": "25"
        }"#;

        let envelope: SearchEnvelope = serde_json::from_str(raw).unwrap();
        let page = envelope.into_page("ali", 1).unwrap();

        assert_eq!(page.movies.len(), 2);
        assert_eq!(page.total_results, 25);
        assert_eq!(page.movies[0].poster.as_deref(), Some("https://example.com/alien.jpg"));
        assert_eq!(page.movies[1].poster, None);
    }

    #[test]
    fn test_search_failure_uses_upstream_message() {
        let raw = r#"{"Response": "False", "Error": "Movie not found!"}"#;
        let envelope: SearchEnvelope = serde_json::from_str(raw).unwrap();
        let err = envelope.into_page("zzzzz", 1).unwrap_err();
        assert_eq!(err.to_string(), "Movie not found!");
    }

    #[test]
    fn test_search_failure_without_message_falls_back() {
        let raw = r#"{"Response": "False"}"#;
        let envelope: SearchEnvelope = serde_json::from_str(raw).unwrap();
        let err = envelope.into_page("zzzzz", 1).unwrap_err();
        assert_eq!(err.to_string(), "Movie not found");
    }

    #[test]
    fn test_non_numeric_total_results_parses_as_zero() {
        let raw = r#"{"Response": "True", "Search": [], "totalResults": "N/A"}"#;
        let envelope: SearchEnvelope = serde_json::from_str(raw).unwrap();
        let page = envelope.into_page("ali", 1).unwrap();
        assert_eq!(page.total_results, 0);
    }

    #[test]
    fn test_details_success_parses() {
        let raw = r#"{
            "Response": "True",
            "imdbID": "tt1375666",
            "Title": "Inception",
            "Year": "2010",
            "Poster": "N/A",
            "Runtime": "148 min",
            "imdbRating": "8.8",
            "Plot": "A thief who steals corporate secrets.",
            "Released": "16 Jul 2010",
            "Actors": "Leonardo DiCaprio",
            "Director": "Christopher Nolan",
            "Genre": "Action, Adventure, Sci-Fi"
        }"#;

        let details: MovieDetails = serde_json::from_str::<DetailsEnvelope>(raw)
            .unwrap()
            .into_details()
            .unwrap();

        assert_eq!(details.imdb_id, "tt1375666");
        assert_eq!(details.poster, None);
        assert_eq!(details.runtime_minutes(), 148);
        assert_eq!(details.imdb_rating_value(), 8.8);
    }

    #[test]
    fn test_details_failure() {
        let raw = r#"{"Response": "False", "Error": "Incorrect IMDb ID."}"#;
        let err = serde_json::from_str::<DetailsEnvelope>(raw)
            .unwrap()
            .into_details()
            .unwrap_err();
        assert_eq!(err.to_string(), "Incorrect IMDb ID.");
    }
}
