use async_trait::async_trait;
use popcorn_models::{MovieDetails, SearchPage};

use crate::error::ProviderError;

/// The seam between the caching core and whatever serves movie metadata.
///
/// Production uses [`crate::OmdbClient`]; tests substitute scripted mocks.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Title search, paginated. `page` is 1-based.
    async fn search(&self, query: &str, page: u32) -> Result<SearchPage, ProviderError>;

    /// Full metadata lookup by id.
    async fn details(&self, id: &str) -> Result<MovieDetails, ProviderError>;
}
