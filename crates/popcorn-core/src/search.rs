//! Stale-while-revalidate movie search.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use popcorn_api::{MetadataProvider, ProviderError};
use popcorn_models::{MovieSummary, SearchPage};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::BoundedCache;
use crate::flight::{Claim, FlightGuard};
use crate::lock;

pub const DEFAULT_CACHE_CAPACITY: usize = 80;
pub const DEFAULT_MIN_QUERY_LEN: usize = 3;

/// How long a waiter sleeps before re-checking the cache, covering the window
/// where the owner's notify fired between the claim and the wait.
const FLIGHT_RECHECK: Duration = Duration::from_millis(25);

/// Composite cache key: case-insensitive on the query, exact on the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchKey {
    pub query: String,
    pub page: u32,
}

impl SearchKey {
    pub fn new(query: &str, page: u32) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            page,
        }
    }
}

/// What the shell renders: result data plus loading/fetching/error flags.
///
/// `is_loading` is the blocking first-load state; `is_fetching` means a
/// background refresh is running behind already-visible data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchView {
    pub movies: Vec<MovieSummary>,
    pub total_results: u32,
    pub is_loading: bool,
    pub is_fetching: bool,
    pub error: Option<String>,
}

impl SearchView {
    fn from_page(page: &SearchPage) -> Self {
        Self {
            movies: page.movies.clone(),
            total_results: page.total_results,
            is_loading: false,
            is_fetching: false,
            error: None,
        }
    }
}

/// Search-side stale-while-revalidate engine.
///
/// Explicitly constructed with its provider and cache - one instance per
/// session, independent instances per test. The generation counter gates
/// every visible-state write: only the most recently initiated request may
/// update what the shell sees, so superseded responses are inert.
pub struct MovieSearcher {
    provider: Arc<dyn MetadataProvider>,
    cache: Arc<Mutex<BoundedCache<SearchKey, SearchPage>>>,
    state: Arc<Mutex<SearchView>>,
    generation: Arc<AtomicU64>,
    flight: Arc<FlightGuard<SearchKey>>,
    session: CancellationToken,
    current_request: Mutex<CancellationToken>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    min_query_len: usize,
}

impl MovieSearcher {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        cache: BoundedCache<SearchKey, SearchPage>,
    ) -> Self {
        Self::with_min_query_len(provider, cache, DEFAULT_MIN_QUERY_LEN)
    }

    pub fn with_min_query_len(
        provider: Arc<dyn MetadataProvider>,
        cache: BoundedCache<SearchKey, SearchPage>,
        min_query_len: usize,
    ) -> Self {
        let session = CancellationToken::new();
        Self {
            provider,
            cache: Arc::new(Mutex::new(cache)),
            state: Arc::new(Mutex::new(SearchView::default())),
            generation: Arc::new(AtomicU64::new(0)),
            flight: Arc::new(FlightGuard::new()),
            current_request: Mutex::new(session.child_token()),
            session,
            tasks: Mutex::new(Vec::new()),
            min_query_len,
        }
    }

    /// The view the shell is currently showing.
    pub fn snapshot(&self) -> SearchView {
        lock(&self.state).clone()
    }

    /// Explicit user retry: bypass the cache read, still write the result back.
    pub async fn retry(&self, query: &str, page: u32) -> SearchView {
        self.search(query, page, true).await
    }

    pub async fn search(&self, query: &str, page: u32, force_refresh: bool) -> SearchView {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let request = self.supersede();

        if query.trim().chars().count() < self.min_query_len {
            // Not yet a real query: empty result, no error, no network call.
            let view = SearchView::default();
            self.publish(generation, view.clone());
            return view;
        }

        let key = SearchKey::new(query, page);

        if !force_refresh {
            let cached = lock(&self.cache).get(&key).map(|entry| entry.value.clone());
            if let Some(page_data) = cached {
                // Serve the cached page now, refresh it behind the view.
                let mut view = SearchView::from_page(&page_data);
                view.is_fetching = true;
                self.publish(generation, view.clone());
                self.spawn_revalidate(key, generation, request);
                return view;
            }
        }

        // Cache miss or forced refresh: block until the first response.
        self.publish(
            generation,
            SearchView {
                is_loading: true,
                ..SearchView::default()
            },
        );

        let outcome = if force_refresh {
            match self.fetch_once(&key, &request).await {
                Ok(page_data) => {
                    self.store(key.clone(), page_data.clone());
                    Ok(page_data)
                }
                Err(err) => Err(err),
            }
        } else {
            self.fetch_shared(&key, &request).await
        };

        match outcome {
            Ok(page_data) => {
                let view = SearchView::from_page(&page_data);
                self.publish(generation, view.clone());
                view
            }
            Err(err) if err.is_canceled() => {
                // Superseded or shut down: leave the visible state untouched.
                debug!("Search for {:?} canceled", key.query);
                self.snapshot()
            }
            Err(err) => {
                let view = SearchView {
                    error: Some(err.to_string()),
                    ..SearchView::default()
                };
                self.publish(generation, view.clone());
                view
            }
        }
    }

    /// Wait for outstanding background refreshes to settle.
    pub async fn quiesce(&self) {
        loop {
            let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *lock(&self.tasks));
            if tasks.is_empty() {
                break;
            }
            futures::future::join_all(tasks).await;
        }
    }

    /// Cancel the session and everything in flight under it.
    pub fn shutdown(&self) {
        self.session.cancel();
    }

    /// Persist the current cache contents through the given snapshot store.
    pub fn save_cache(&self, store: &crate::snapshot::CacheStore, name: &str) -> anyhow::Result<()> {
        store.save(name, &lock(&self.cache))
    }

    /// Cancel the previous request and hand out a token for the new one.
    fn supersede(&self) -> CancellationToken {
        let mut current = lock(&self.current_request);
        current.cancel();
        *current = self.session.child_token();
        current.clone()
    }

    fn publish(&self, generation: u64, view: SearchView) {
        if self.generation.load(Ordering::SeqCst) == generation {
            *lock(&self.state) = view;
        }
    }

    fn store(&self, key: SearchKey, page: SearchPage) {
        lock(&self.cache).insert(key, page);
    }

    async fn fetch_once(
        &self,
        key: &SearchKey,
        cancel: &CancellationToken,
    ) -> Result<SearchPage, ProviderError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(ProviderError::Canceled),
            result = self.provider.search(&key.query, key.page) => result,
        }
    }

    /// Cache-miss fetch with in-flight dedupe: racing calls for the same key
    /// wait for the owner's cache write instead of fetching again. If the
    /// owner fails, the next waiter takes over the fetch.
    async fn fetch_shared(
        &self,
        key: &SearchKey,
        cancel: &CancellationToken,
    ) -> Result<SearchPage, ProviderError> {
        loop {
            if let Some(entry) = lock(&self.cache).get(key) {
                return Ok(entry.value.clone());
            }

            match self.flight.claim(key) {
                Claim::Owner => {
                    let result = self.fetch_once(key, cancel).await;
                    self.flight.release(key);
                    return match result {
                        Ok(page_data) => {
                            self.store(key.clone(), page_data.clone());
                            Ok(page_data)
                        }
                        Err(err) => Err(err),
                    };
                }
                Claim::Waiter(notify) => {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(ProviderError::Canceled),
                        _ = notify.notified() => {}
                        _ = tokio::time::sleep(FLIGHT_RECHECK) => {}
                    }
                }
            }
        }
    }

    /// Background refresh for an already-visible cached page. Duplicates for
    /// the same key are tolerated; the cache write is last-write-wins.
    fn spawn_revalidate(&self, key: SearchKey, generation: u64, cancel: CancellationToken) {
        let provider = self.provider.clone();
        let cache = self.cache.clone();
        let state = self.state.clone();
        let latest = self.generation.clone();

        let handle = tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => Err(ProviderError::Canceled),
                result = provider.search(&key.query, key.page) => result,
            };

            match result {
                Ok(page_data) => {
                    lock(&cache).insert(key, page_data.clone());
                    if latest.load(Ordering::SeqCst) == generation {
                        *lock(&state) = SearchView::from_page(&page_data);
                    }
                }
                Err(err) if err.is_canceled() => {}
                Err(err) => {
                    warn!("Background refresh for {:?} failed: {}", key.query, err);
                    if latest.load(Ordering::SeqCst) == generation {
                        // Stale data beats no data: keep it visible, surface
                        // the failure inline.
                        let mut view = lock(&state);
                        view.is_fetching = false;
                        view.error = Some(err.to_string());
                    }
                }
            }
        });

        lock(&self.tasks).push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    fn summary(id: &str, title: &str) -> MovieSummary {
        MovieSummary {
            imdb_id: id.to_string(),
            title: title.to_string(),
            year: "1979".to_string(),
            poster: None,
        }
    }

    /// Scripted provider: per-query movie lists, switchable failure, optional
    /// per-query delay, call counter.
    struct MockProvider {
        pages: Mutex<HashMap<String, Vec<MovieSummary>>>,
        total_results: Mutex<u32>,
        fail_with: Mutex<Option<String>>,
        delays: Mutex<HashMap<String, Duration>>,
        search_calls: AtomicUsize,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                pages: Mutex::new(HashMap::new()),
                total_results: Mutex::new(0),
                fail_with: Mutex::new(None),
                delays: Mutex::new(HashMap::new()),
                search_calls: AtomicUsize::new(0),
            }
        }

        fn set_page(&self, query: &str, movies: Vec<MovieSummary>, total: u32) {
            lock(&self.pages).insert(query.to_string(), movies);
            *lock(&self.total_results) = total;
        }

        fn set_failure(&self, message: Option<&str>) {
            *lock(&self.fail_with) = message.map(|m| m.to_string());
        }

        fn set_delay(&self, query: &str, delay: Duration) {
            lock(&self.delays).insert(query.to_string(), delay);
        }

        fn calls(&self) -> usize {
            self.search_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MetadataProvider for MockProvider {
        async fn search(&self, query: &str, page: u32) -> Result<SearchPage, ProviderError> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);

            let delay = lock(&self.delays).get(query).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(message) = lock(&self.fail_with).clone() {
                return Err(ProviderError::Upstream(message));
            }

            let movies = lock(&self.pages).get(query).cloned().unwrap_or_default();
            let total_results = *lock(&self.total_results);
            Ok(SearchPage {
                query: query.to_string(),
                page,
                movies,
                total_results,
            })
        }

        async fn details(
            &self,
            _id: &str,
        ) -> Result<popcorn_models::MovieDetails, ProviderError> {
            unreachable!("search tests never fetch details")
        }
    }

    fn searcher_over(provider: &Arc<MockProvider>) -> MovieSearcher {
        MovieSearcher::new(provider.clone(), BoundedCache::new(DEFAULT_CACHE_CAPACITY))
    }

    #[tokio::test]
    async fn test_short_query_is_silent_and_offline() {
        let provider = Arc::new(MockProvider::new());
        let searcher = searcher_over(&provider);

        let view = searcher.search("al", 1, false).await;

        assert!(view.movies.is_empty());
        assert_eq!(view.error, None);
        assert!(!view.is_loading);
        assert_eq!(provider.calls(), 0);

        // Whitespace does not count toward the minimum length.
        let view = searcher.search("  al  ", 1, false).await;
        assert!(view.movies.is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_three_char_query_fetches() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page(
            "ali",
            vec![summary("tt0078748", "Alien"), summary("tt0090605", "Aliens")],
            25,
        );
        let searcher = searcher_over(&provider);

        let view = searcher.search("ali", 1, false).await;

        assert_eq!(view.movies.len(), 2);
        assert_eq!(view.total_results, 25);
        assert!(!view.is_loading);
        assert_eq!(view.error, None);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_blocking_load_state_visible_during_first_fetch() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page("alien", vec![summary("tt0078748", "Alien")], 1);
        provider.set_delay("alien", Duration::from_millis(100));
        let searcher = Arc::new(searcher_over(&provider));

        let task = {
            let searcher = searcher.clone();
            tokio::spawn(async move { searcher.search("alien", 1, false).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(searcher.snapshot().is_loading);

        let view = task.await.unwrap();
        assert!(!view.is_loading);
        assert_eq!(view.movies.len(), 1);
    }

    #[tokio::test]
    async fn test_second_search_serves_cache_then_revalidates() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page("alien", vec![summary("tt0078748", "Alien")], 1);
        let searcher = searcher_over(&provider);

        let first = searcher.search("alien", 1, false).await;
        assert_eq!(provider.calls(), 1);

        let second = searcher.search("alien", 1, false).await;
        assert_eq!(second.movies, first.movies);
        assert!(!second.is_loading);
        assert!(second.is_fetching);

        searcher.quiesce().await;
        // Exactly one miss-path call; the second hit added one background refresh.
        assert_eq!(provider.calls(), 2);
        assert!(!searcher.snapshot().is_fetching);
    }

    #[tokio::test]
    async fn test_cache_key_is_case_insensitive_and_trimmed() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page("alien", vec![summary("tt0078748", "Alien")], 1);
        let searcher = searcher_over(&provider);

        searcher.search("Alien", 1, false).await;
        assert_eq!(provider.calls(), 1);

        let view = searcher.search("  ALIEN ", 1, false).await;
        assert!(!view.is_loading);
        assert_eq!(view.movies.len(), 1);
        searcher.quiesce().await;

        // Different page is a different key.
        searcher.search("alien", 2, false).await;
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_cache_but_writes_back() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page("alien", vec![summary("tt0078748", "Alien")], 1);
        let searcher = searcher_over(&provider);

        searcher.search("alien", 1, false).await;
        provider.set_page("alien", vec![summary("tt0090605", "Aliens")], 2);

        let forced = searcher.retry("alien", 1).await;
        assert_eq!(forced.movies[0].title, "Aliens");

        // The forced result landed in the cache: next hit serves it directly.
        let after = searcher.search("alien", 1, false).await;
        assert_eq!(after.movies[0].title, "Aliens");
        searcher.quiesce().await;
    }

    #[tokio::test]
    async fn test_upstream_failure_surfaces_message() {
        let provider = Arc::new(MockProvider::new());
        provider.set_failure(Some("Movie not found!"));
        let searcher = searcher_over(&provider);

        let view = searcher.search("zzzzzz", 1, false).await;
        assert_eq!(view.error.as_deref(), Some("Movie not found!"));
        assert!(view.movies.is_empty());
        assert!(!view.is_loading);
    }

    #[tokio::test]
    async fn test_failed_revalidation_keeps_stale_data_with_inline_error() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page("alien", vec![summary("tt0078748", "Alien")], 1);
        let searcher = searcher_over(&provider);

        searcher.search("alien", 1, false).await;
        provider.set_failure(Some("Movie not found!"));

        let stale = searcher.search("alien", 1, false).await;
        assert_eq!(stale.movies.len(), 1);
        assert_eq!(stale.error, None);

        searcher.quiesce().await;
        let view = searcher.snapshot();
        assert_eq!(view.movies.len(), 1);
        assert_eq!(view.error.as_deref(), Some("Movie not found!"));
        assert!(!view.is_fetching);
    }

    #[tokio::test]
    async fn test_superseded_request_does_not_clobber_newer_result() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page("alien", vec![summary("tt0078748", "Alien")], 1);
        provider.set_page("batman", vec![summary("tt0096895", "Batman")], 1);
        provider.set_delay("alien", Duration::from_millis(150));
        let searcher = Arc::new(searcher_over(&provider));

        let slow = {
            let searcher = searcher.clone();
            tokio::spawn(async move { searcher.search("alien", 1, false).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let fast = searcher.search("batman", 1, false).await;
        assert_eq!(fast.movies[0].title, "Batman");

        let slow_view = slow.await.unwrap();
        // The superseded request resolved inert: no error, no state update.
        assert_eq!(slow_view.error, None);
        assert_eq!(searcher.snapshot().movies[0].title, "Batman");
    }

    #[tokio::test]
    async fn test_shutdown_cancellation_is_not_an_error() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page("alien", vec![summary("tt0078748", "Alien")], 1);
        provider.set_delay("alien", Duration::from_millis(200));
        let searcher = Arc::new(searcher_over(&provider));

        let task = {
            let searcher = searcher.clone();
            tokio::spawn(async move { searcher.search("alien", 1, false).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        searcher.shutdown();

        let view = task.await.unwrap();
        assert_eq!(view.error, None);
        assert!(view.movies.is_empty());
    }

    #[tokio::test]
    async fn test_evicted_key_misses_again() {
        let provider = Arc::new(MockProvider::new());
        provider.set_page("alien", vec![summary("tt0078748", "Alien")], 1);
        let searcher = MovieSearcher::new(provider.clone(), BoundedCache::new(2));

        searcher.search("alien", 1, false).await;
        searcher.search("batman", 1, false).await;
        searcher.search("casino", 1, false).await;
        assert_eq!(provider.calls(), 3);

        // "alien" was the oldest entry and fell out; this is a miss again.
        let view = searcher.search("alien", 1, false).await;
        assert!(!view.is_fetching);
        assert_eq!(provider.calls(), 4);
        searcher.quiesce().await;
    }
}
