use serde::{Deserialize, Serialize};

use crate::movie::MovieSummary;

/// One page of search results as returned by the upstream API.
///
/// `total_results` counts matches across all pages, not just this one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchPage {
    pub query: String,
    pub page: u32,
    pub movies: Vec<MovieSummary>,
    pub total_results: u32,
}
