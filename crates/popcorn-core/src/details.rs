//! Details cache, fetcher, and speculative prefetch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use popcorn_api::{MetadataProvider, ProviderError};
use popcorn_models::MovieDetails;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::BoundedCache;
use crate::flight::{Claim, FlightGuard};
use crate::lock;

const FLIGHT_RECHECK: Duration = Duration::from_millis(25);

/// What the details panel renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailsView {
    pub details: Option<MovieDetails>,
    pub is_loading: bool,
    pub is_fetching: bool,
    pub error: Option<String>,
}

/// Details-side counterpart of the search engine: its own cache namespace and
/// capacity counter, same eviction and cancellation discipline.
///
/// Prefetch is fire-and-forget and error-swallowing; the in-flight id guard
/// keeps a prefetch and a blocking read for the same id on one request.
pub struct DetailsFetcher {
    provider: Arc<dyn MetadataProvider>,
    cache: Arc<Mutex<BoundedCache<String, MovieDetails>>>,
    state: Arc<Mutex<DetailsView>>,
    generation: Arc<AtomicU64>,
    flight: Arc<FlightGuard<String>>,
    session: CancellationToken,
    current_request: Mutex<CancellationToken>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DetailsFetcher {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        cache: BoundedCache<String, MovieDetails>,
    ) -> Self {
        let session = CancellationToken::new();
        Self {
            provider,
            cache: Arc::new(Mutex::new(cache)),
            state: Arc::new(Mutex::new(DetailsView::default())),
            generation: Arc::new(AtomicU64::new(0)),
            flight: Arc::new(FlightGuard::new()),
            current_request: Mutex::new(session.child_token()),
            session,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Synchronous cache read; never touches the network.
    pub fn cached(&self, id: &str) -> Option<MovieDetails> {
        lock(&self.cache)
            .get(&id.to_string())
            .map(|entry| entry.value.clone())
    }

    /// A child token suitable for one caller-managed request.
    pub fn request_token(&self) -> CancellationToken {
        self.session.child_token()
    }

    /// Idempotent fetch: a no-op when the id is already cached.
    pub async fn ensure_fetched(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ProviderError> {
        self.ensure(id, cancel).await.map(|_| ())
    }

    /// Speculative fetch on a UI hint (hover, first results, long-press).
    /// Failures never reach the caller.
    pub fn prefetch(self: &Arc<Self>, id: &str) {
        if self.cached(id).is_some() {
            return;
        }

        let fetcher = Arc::clone(self);
        let id = id.to_string();
        let cancel = self.session.child_token();
        let handle = tokio::spawn(async move {
            if let Err(err) = fetcher.ensure(&id, &cancel).await {
                if !err.is_canceled() {
                    debug!("Prefetch for {} failed: {}", id, err);
                }
            }
        });
        lock(&self.tasks).push(handle);
    }

    /// Combined stale-while-revalidate read for the details panel: cached data
    /// immediately when present (with a background refresh), a blocking load
    /// only when nothing is available yet.
    pub async fn view(&self, id: &str) -> DetailsView {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let request = self.supersede();

        if let Some(details) = self.cached(id) {
            let view = DetailsView {
                details: Some(details),
                is_loading: false,
                is_fetching: true,
                error: None,
            };
            self.publish(generation, view.clone());
            self.spawn_revalidate(id.to_string(), generation, request);
            return view;
        }

        self.publish(
            generation,
            DetailsView {
                is_loading: true,
                ..DetailsView::default()
            },
        );

        match self.ensure(id, &request).await {
            Ok(details) => {
                let view = DetailsView {
                    details: Some(details),
                    ..DetailsView::default()
                };
                self.publish(generation, view.clone());
                view
            }
            Err(err) if err.is_canceled() => {
                debug!("Details fetch for {} canceled", id);
                self.snapshot()
            }
            Err(err) => {
                let view = DetailsView {
                    error: Some(err.to_string()),
                    ..DetailsView::default()
                };
                self.publish(generation, view.clone());
                view
            }
        }
    }

    pub fn snapshot(&self) -> DetailsView {
        lock(&self.state).clone()
    }

    /// Wait for outstanding prefetches and refreshes to settle.
    pub async fn quiesce(&self) {
        loop {
            let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *lock(&self.tasks));
            if tasks.is_empty() {
                break;
            }
            futures::future::join_all(tasks).await;
        }
    }

    pub fn shutdown(&self) {
        self.session.cancel();
    }

    /// Blocking forced refresh: bypass the cache read, still write back.
    pub async fn refresh(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<MovieDetails, ProviderError> {
        let details = self.fetch_once(id, cancel).await?;
        lock(&self.cache).insert(id.to_string(), details.clone());
        Ok(details)
    }

    /// Persist the current cache contents through the given snapshot store.
    pub fn save_cache(&self, store: &crate::snapshot::CacheStore, name: &str) -> anyhow::Result<()> {
        store.save(name, &lock(&self.cache))
    }

    fn supersede(&self) -> CancellationToken {
        let mut current = lock(&self.current_request);
        current.cancel();
        *current = self.session.child_token();
        current.clone()
    }

    fn publish(&self, generation: u64, view: DetailsView) {
        if self.generation.load(Ordering::SeqCst) == generation {
            *lock(&self.state) = view;
        }
    }

    async fn fetch_once(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<MovieDetails, ProviderError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(ProviderError::Canceled),
            result = self.provider.details(id) => result,
        }
    }

    /// Cache-or-fetch with in-flight dedupe, mirroring the search path.
    async fn ensure(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<MovieDetails, ProviderError> {
        let key = id.to_string();
        loop {
            if let Some(entry) = lock(&self.cache).get(&key) {
                return Ok(entry.value.clone());
            }

            match self.flight.claim(&key) {
                Claim::Owner => {
                    let result = self.fetch_once(id, cancel).await;
                    self.flight.release(&key);
                    return match result {
                        Ok(details) => {
                            lock(&self.cache).insert(key, details.clone());
                            Ok(details)
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

    /// Forced refresh behind an already-visible cached entry.
    fn spawn_revalidate(&self, id: String, generation: u64, cancel: CancellationToken) {
        let provider = self.provider.clone();
        let cache = self.cache.clone();
        let state = self.state.clone();
        let latest = self.generation.clone();

        let handle = tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => Err(ProviderError::Canceled),
                result = provider.details(&id) => result,
            };

            match result {
                Ok(details) => {
                    lock(&cache).insert(id, details.clone());
                    if latest.load(Ordering::SeqCst) == generation {
                        *lock(&state) = DetailsView {
                            details: Some(details),
                            ..DetailsView::default()
                        };
                    }
                }
                Err(err) if err.is_canceled() => {}
                Err(err) => {
                    warn!("Background details refresh for {} failed: {}", id, err);
                    if latest.load(Ordering::SeqCst) == generation {
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
