//! Pure derived views over the watched list.
//!
//! Composition order is fixed: filter, then title substring, then sort.
//! Changing it changes results for edge cases, so `visible` is the only
//! entry point the shell should use.

use std::cmp::Ordering;

use popcorn_models::WatchedMovie;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchedFilter {
    All,
    /// user_rating > 0
    Rated,
    /// user_rating == 0
    Unrated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatchedSort {
    DateDesc,
    DateAsc,
    UserRatingDesc,
    UserRatingAsc,
    ImdbRatingDesc,
    ImdbRatingAsc,
    RuntimeDesc,
    RuntimeAsc,
    TitleAsc,
    TitleDesc,
}

impl std::str::FromStr for WatchedFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "rated" => Ok(Self::Rated),
            "unrated" => Ok(Self::Unrated),
            other => Err(format!(
                "Unknown filter {:?}. Use 'all', 'rated', or 'unrated'",
                other
            )),
        }
    }
}

impl std::fmt::Display for WatchedFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::All => "all",
            Self::Rated => "rated",
            Self::Unrated => "unrated",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for WatchedSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date-desc" => Ok(Self::DateDesc),
            "date-asc" => Ok(Self::DateAsc),
            "user-rating-desc" => Ok(Self::UserRatingDesc),
            "user-rating-asc" => Ok(Self::UserRatingAsc),
            "imdb-rating-desc" => Ok(Self::ImdbRatingDesc),
            "imdb-rating-asc" => Ok(Self::ImdbRatingAsc),
            "runtime-desc" => Ok(Self::RuntimeDesc),
            "runtime-asc" => Ok(Self::RuntimeAsc),
            "title-asc" => Ok(Self::TitleAsc),
            "title-desc" => Ok(Self::TitleDesc),
            other => Err(format!("Unknown sort mode {:?}", other)),
        }
    }
}

impl std::fmt::Display for WatchedSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DateDesc => "date-desc",
            Self::DateAsc => "date-asc",
            Self::UserRatingDesc => "user-rating-desc",
            Self::UserRatingAsc => "user-rating-asc",
            Self::ImdbRatingDesc => "imdb-rating-desc",
            Self::ImdbRatingAsc => "imdb-rating-asc",
            Self::RuntimeDesc => "runtime-desc",
            Self::RuntimeAsc => "runtime-asc",
            Self::TitleAsc => "title-asc",
            Self::TitleDesc => "title-desc",
        };
        write!(f, "{}", name)
    }
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

pub fn filter_watched(list: &[WatchedMovie], filter: WatchedFilter) -> Vec<WatchedMovie> {
    match filter {
        WatchedFilter::All => list.to_vec(),
        WatchedFilter::Rated => list.iter().filter(|m| m.user_rating > 0).cloned().collect(),
        WatchedFilter::Unrated => list.iter().filter(|m| m.user_rating == 0).cloned().collect(),
    }
}

pub fn filter_by_title(list: Vec<WatchedMovie>, query: &str) -> Vec<WatchedMovie> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return list;
    }
    list.into_iter()
        .filter(|m| m.title.to_lowercase().contains(&query))
        .collect()
}

/// Stable sort on an owned list; ties preserve relative input order.
pub fn sort_watched(mut list: Vec<WatchedMovie>, sort: WatchedSort) -> Vec<WatchedMovie> {
    match sort {
        WatchedSort::DateDesc => list.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        WatchedSort::DateAsc => list.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        WatchedSort::UserRatingDesc => list.sort_by(|a, b| b.user_rating.cmp(&a.user_rating)),
        WatchedSort::UserRatingAsc => list.sort_by(|a, b| a.user_rating.cmp(&b.user_rating)),
        WatchedSort::ImdbRatingDesc => {
            list.sort_by(|a, b| b.imdb_rating.total_cmp(&a.imdb_rating))
        }
        WatchedSort::ImdbRatingAsc => list.sort_by(|a, b| a.imdb_rating.total_cmp(&b.imdb_rating)),
        WatchedSort::RuntimeDesc => list.sort_by(|a, b| b.runtime_minutes.cmp(&a.runtime_minutes)),
        WatchedSort::RuntimeAsc => list.sort_by(|a, b| a.runtime_minutes.cmp(&b.runtime_minutes)),
        WatchedSort::TitleAsc => list.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        WatchedSort::TitleDesc => list.sort_by(|a, b| compare_titles(&b.title, &a.title)),
    }
    list
}

/// The one composition the shell renders: filter, then title match, then sort.
/// The input list is never mutated.
pub fn visible(
    list: &[WatchedMovie],
    filter: WatchedFilter,
    title_query: &str,
    sort: WatchedSort,
) -> Vec<WatchedMovie> {
    let filtered = filter_watched(list, filter);
    let matched = filter_by_title(filtered, title_query);
    sort_watched(matched, sort)
}

/// Aggregates for the watched panel header.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchedSummary {
    pub count: usize,
    pub avg_imdb_rating: f64,
    pub avg_user_rating: f64,
    pub avg_runtime: f64,
}

fn average(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let len = values.len();
    if len == 0 {
        return 0.0;
    }
    values.sum::<f64>() / len as f64
}

impl WatchedSummary {
    pub fn from_list(list: &[WatchedMovie]) -> Self {
        Self {
            count: list.len(),
            avg_imdb_rating: average(list.iter().map(|m| m.imdb_rating)),
            avg_user_rating: average(list.iter().map(|m| f64::from(m.user_rating))),
            avg_runtime: average(list.iter().map(|m| f64::from(m.runtime_minutes))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn movie(id: &str, title: &str, user_rating: u8, created_secs: i64) -> WatchedMovie {
        let created_at = Utc.timestamp_opt(created_secs, 0).unwrap();
        WatchedMovie {
            imdb_id: id.to_string(),
            title: title.to_string(),
            year: "1999".to_string(),
            poster: None,
            runtime_minutes: 100,
            imdb_rating: 7.0,
            user_rating,
            rating_change_count: 0,
            created_at,
            updated_at: created_at,
        }
    }

    fn sample() -> Vec<WatchedMovie> {
        vec![
            movie("tt1", "the Matrix", 3, 100),
            movie("tt2", "Alien", 0, 200),
            movie("tt3", "Heat", 5, 300),
            movie("tt4", "Casino", 0, 400),
        ]
    }

    #[test]
    fn test_filter_modes() {
        let list = sample();
        assert_eq!(filter_watched(&list, WatchedFilter::All).len(), 4);

        let rated = filter_watched(&list, WatchedFilter::Rated);
        assert_eq!(
            rated.iter().map(|m| m.imdb_id.as_str()).collect::<Vec<_>>(),
            vec!["tt1", "tt3"]
        );

        let unrated = filter_watched(&list, WatchedFilter::Unrated);
        assert_eq!(
            unrated.iter().map(|m| m.imdb_id.as_str()).collect::<Vec<_>>(),
            vec!["tt2", "tt4"]
        );
    }

    #[test]
    fn test_title_filter_is_case_insensitive_substring() {
        let list = sample();
        let matched = filter_by_title(list.clone(), "MAT");
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].imdb_id, "tt1");

        // Empty query matches everything.
        assert_eq!(filter_by_title(list, "  ").len(), 4);
    }

    #[test]
    fn test_user_rating_desc_keeps_tie_order() {
        let list = vec![
            movie("a", "A", 3, 0),
            movie("b", "B", 0, 0),
            movie("c", "C", 5, 0),
            movie("d", "D", 0, 0),
        ];
        let sorted = sort_watched(list, WatchedSort::UserRatingDesc);
        assert_eq!(
            sorted.iter().map(|m| m.imdb_id.as_str()).collect::<Vec<_>>(),
            vec!["c", "a", "b", "d"]
        );
    }

    #[test]
    fn test_title_sort_ignores_case() {
        let list = vec![
            movie("a", "the Matrix", 0, 0),
            movie("b", "Alien", 0, 0),
            movie("c", "casino", 0, 0),
        ];
        let sorted = sort_watched(list, WatchedSort::TitleAsc);
        assert_eq!(
            sorted.iter().map(|m| m.title.as_str()).collect::<Vec<_>>(),
            vec!["Alien", "casino", "the Matrix"]
        );
    }

    #[test]
    fn test_sort_does_not_mutate_input() {
        let list = sample();
        let ids_before: Vec<String> = list.iter().map(|m| m.imdb_id.clone()).collect();
        let _ = visible(&list, WatchedFilter::All, "", WatchedSort::TitleAsc);
        let ids_after: Vec<String> = list.iter().map(|m| m.imdb_id.clone()).collect();
        assert_eq!(ids_before, ids_after);
    }

    #[test]
    fn test_visible_is_idempotent_on_sorted_input() {
        let list = sample();
        let once = visible(&list, WatchedFilter::All, "", WatchedSort::DateDesc);
        let twice = visible(&once, WatchedFilter::All, "", WatchedSort::DateDesc);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_composition_order_filters_before_sorting() {
        let list = sample();
        let result = visible(&list, WatchedFilter::Rated, "a", WatchedSort::UserRatingAsc);
        // Rated keeps tt1/tt3; "a" keeps "the Matrix" and "Heat"; ascending rating.
        assert_eq!(
            result.iter().map(|m| m.imdb_id.as_str()).collect::<Vec<_>>(),
            vec!["tt1", "tt3"]
        );
    }

    #[test]
    fn test_sort_mode_parsing() {
        assert_eq!("date-desc".parse::<WatchedSort>(), Ok(WatchedSort::DateDesc));
        assert_eq!("title-asc".parse::<WatchedSort>(), Ok(WatchedSort::TitleAsc));
        assert!("date".parse::<WatchedSort>().is_err());
        assert_eq!(WatchedSort::UserRatingDesc.to_string(), "user-rating-desc");
    }

    #[test]
    fn test_summary_averages() {
        let mut list = sample();
        list[0].imdb_rating = 8.0;
        list[1].imdb_rating = 6.0;
        list[2].imdb_rating = 7.0;
        list[3].imdb_rating = 7.0;

        let summary = WatchedSummary::from_list(&list);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.avg_imdb_rating, 7.0);
        assert_eq!(summary.avg_user_rating, 2.0);
        assert_eq!(summary.avg_runtime, 100.0);
    }

    #[test]
    fn test_summary_of_empty_list_is_zero() {
        let summary = WatchedSummary::from_list(&[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.avg_imdb_rating, 0.0);
    }
}
