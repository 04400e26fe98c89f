pub mod cache;
pub mod details;
pub(crate) mod flight;
pub mod recent;
pub mod search;
pub mod snapshot;
pub mod storage;
pub mod view;
pub mod watched;

pub use cache::{BoundedCache, CacheEntry};
pub use details::{DetailsFetcher, DetailsView};
pub use recent::RecentlyViewed;
pub use search::{MovieSearcher, SearchKey, SearchView};
pub use snapshot::CacheStore;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use view::{visible, WatchedFilter, WatchedSort, WatchedSummary};
pub use watched::{RemovedWatched, WatchedStore};

/// A poisoned lock only means another thread panicked mid-update; the guarded
/// data is still usable, so recover it instead of propagating the panic.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
