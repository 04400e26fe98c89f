//! Keyed in-flight request tracking.
//!
//! The first caller for a key claims the fetch; latecomers wait on a notify
//! and re-read the cache, so racing cache-miss calls for the same key share
//! one network request instead of issuing duplicates.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::lock;

pub(crate) struct FlightGuard<K> {
    keys: Mutex<HashMap<K, Arc<Notify>>>,
}

pub(crate) enum Claim {
    /// This caller owns the fetch and must call `release` when done.
    Owner,
    /// Another fetch for the key is in flight; wait, then re-check the cache.
    Waiter(Arc<Notify>),
}

impl<K: Eq + Hash + Clone> FlightGuard<K> {
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
        }
    }

    pub fn claim(&self, key: &K) -> Claim {
        let mut keys = lock(&self.keys);
        match keys.get(key) {
            Some(notify) => Claim::Waiter(notify.clone()),
            None => {
                keys.insert(key.clone(), Arc::new(Notify::new()));
                Claim::Owner
            }
        }
    }

    /// Release the key and wake every waiter, whatever the fetch outcome was.
    pub fn release(&self, key: &K) {
        let notify = lock(&self.keys).remove(key);
        if let Some(notify) = notify {
            notify.notify_waiters();
        }
    }
}
