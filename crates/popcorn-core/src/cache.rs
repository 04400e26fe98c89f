use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached value plus the bookkeeping eviction needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: DateTime<Utc>,
    /// Monotonic insertion counter; breaks equal-timestamp ties on eviction.
    pub seq: u64,
}

/// Bounded in-memory cache pruned oldest-timestamp-first when over capacity.
///
/// Entries are refreshed in place (a re-insert under the same key replaces the
/// entry and its timestamp); there is no TTL, eviction happens on capacity
/// pressure only.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    capacity: usize,
    next_seq: u64,
}

impl<K: Eq + Hash + Clone, V> BoundedCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            next_seq: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    /// Insert or refresh in place, stamped with the current time.
    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Utc::now());
    }

    pub(crate) fn insert_at(&mut self, key: K, value: V, fetched_at: DateTime<Utc>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            key,
            CacheEntry {
                value,
                fetched_at,
                seq,
            },
        );
        self.prune();
    }

    /// Reinstate a persisted entry without re-stamping it.
    pub fn restore(&mut self, key: K, entry: CacheEntry<V>) {
        self.next_seq = self.next_seq.max(entry.seq + 1);
        self.entries.insert(key, entry);
        self.prune();
    }

    pub fn remove(&mut self, key: &K) -> Option<CacheEntry<V>> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &CacheEntry<V>)> {
        self.entries.iter()
    }

    fn prune(&mut self) {
        while self.entries.len() > self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| (entry.fetched_at, entry.seq))
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_eviction_bound_holds() {
        let mut cache = BoundedCache::new(3);
        for i in 0..10 {
            cache.insert_at(i, i * 100, ts(i as i64));
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_oldest_timestamp_evicted_first() {
        let mut cache = BoundedCache::new(2);
        cache.insert_at("a", 1, ts(100));
        cache.insert_at("b", 2, ts(50));
        cache.insert_at("c", 3, ts(200));

        // "b" carried the oldest timestamp even though it was inserted second.
        assert!(!cache.contains_key(&"b"));
        assert!(cache.contains_key(&"a"));
        assert!(cache.contains_key(&"c"));
    }

    #[test]
    fn test_equal_timestamps_break_ties_by_insertion_order() {
        let mut cache = BoundedCache::new(2);
        cache.insert_at("first", 1, ts(100));
        cache.insert_at("second", 2, ts(100));
        cache.insert_at("third", 3, ts(100));

        assert!(!cache.contains_key(&"first"));
        assert!(cache.contains_key(&"second"));
        assert!(cache.contains_key(&"third"));
    }

    #[test]
    fn test_refresh_in_place_updates_timestamp() {
        let mut cache = BoundedCache::new(2);
        cache.insert_at("a", 1, ts(10));
        cache.insert_at("b", 2, ts(20));
        // Refresh "a": it is now the newest entry.
        cache.insert_at("a", 3, ts(30));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a").map(|e| e.value), Some(3));

        cache.insert_at("c", 4, ts(40));
        assert!(!cache.contains_key(&"b"));
        assert!(cache.contains_key(&"a"));
    }

    #[test]
    fn test_restore_keeps_seq_monotonic() {
        let mut cache = BoundedCache::new(4);
        cache.restore(
            "old",
            CacheEntry {
                value: 1,
                fetched_at: ts(100),
                seq: 7,
            },
        );
        cache.insert_at("new", 2, ts(100));
        // The fresh insert must not reuse a seq at or below the restored one.
        assert!(cache.get(&"new").map(|e| e.seq) > cache.get(&"old").map(|e| e.seq));
    }
}
