use std::sync::Arc;

use async_trait::async_trait;
use popcorn_models::{MovieDetails, SearchPage};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ProviderError;
use crate::traits::MetadataProvider;
use crate::wire::{DetailsEnvelope, SearchEnvelope};

pub const DEFAULT_BASE_URL: &str = "https://www.omdbapi.com";

/// HTTP client for the OMDb-style metadata API.
#[derive(Clone)]
pub struct OmdbClient {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

impl OmdbClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: String) -> Self {
        let base_url = base_url.into();
        Self {
            client: Arc::new(Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn get_envelope<T: DeserializeOwned>(&self, url: String) -> Result<T, ProviderError> {
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!("Upstream returned {}: {}", status, body);
            return Err(ProviderError::Transport(format!(
                "unexpected status {}",
                status
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl MetadataProvider for OmdbClient {
    async fn search(&self, query: &str, page: u32) -> Result<SearchPage, ProviderError> {
        let url = format!(
            "{}/?apikey={}&s={}&page={}",
            self.base_url,
            self.api_key,
            urlencoding::encode(query),
            page
        );

        debug!("Searching for {:?} (page {})", query, page);
        let envelope: SearchEnvelope = self.get_envelope(url).await?;
        envelope.into_page(query, page)
    }

    async fn details(&self, id: &str) -> Result<MovieDetails, ProviderError> {
        let url = format!(
            "{}/?apikey={}&i={}",
            self.base_url,
            self.api_key,
            urlencoding::encode(id)
        );

        debug!("Fetching details for {}", id);
        let envelope: DetailsEnvelope = self.get_envelope(url).await?;
        envelope.into_details()
    }
}
