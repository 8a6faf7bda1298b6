//! Size-bounded TTL cache.
//!
//! # Responsibilities
//! - Key → value storage with per-entry expiry (epoch milliseconds)
//! - Lazy expiry on read, explicit sweep of expired entries
//! - Keep the entry count at or below `capacity`
//!
//! # Eviction
//! When an insert finds the map full, expired entries are swept first. If the
//! map is still full, entries with the earliest expiry are evicted (ties by
//! key) until there is room.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::observability::metrics;

/// A stored value and the instant it stops being served.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at_ms: u64,
}

impl<V> CacheEntry<V> {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at_ms
    }
}

/// Thread-safe bounded cache. Every operation takes the single map lock.
#[derive(Debug)]
pub struct BoundedCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    capacity: usize,
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn ttl_ms(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}

impl<V: Clone> BoundedCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, now_ms())
    }

    /// Read `key` as of `now_ms`. An expired hit is removed and reported as a miss.
    pub fn get_at(&self, key: &str, now_ms: u64) -> Option<V> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now_ms) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                metrics::record_bounded_cache_size(entries.len());
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.set_at(key, value, ttl, now_ms());
    }

    pub fn set_at(&self, key: impl Into<String>, value: V, ttl: Duration, now_ms: u64) {
        let key = key.into();
        let mut entries = self.lock();
        self.make_room(&mut entries, &key, now_ms);
        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at_ms: now_ms.saturating_add(ttl_ms(ttl)),
            },
        );
        metrics::record_bounded_cache_size(entries.len());
    }

    /// Atomically replace the value under `key`.
    ///
    /// A live entry keeps its expiry; a missing or expired one is recreated
    /// with a fresh `ttl`. `f` receives the live value, if any.
    pub fn upsert_at<F>(&self, key: &str, ttl: Duration, now_ms: u64, f: F) -> V
    where
        F: FnOnce(Option<&V>) -> V,
    {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(key) {
            if !entry.is_expired(now_ms) {
                entry.value = f(Some(&entry.value));
                return entry.value.clone();
            }
            entries.remove(key);
        }

        self.make_room(&mut entries, key, now_ms);
        let value = f(None);
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                expires_at_ms: now_ms.saturating_add(ttl_ms(ttl)),
            },
        );
        metrics::record_bounded_cache_size(entries.len());
        value
    }

    pub fn upsert<F>(&self, key: &str, ttl: Duration, f: F) -> V
    where
        F: FnOnce(Option<&V>) -> V,
    {
        self.upsert_at(key, ttl, now_ms(), f)
    }

    pub fn delete(&self, key: &str) -> bool {
        let mut entries = self.lock();
        let removed = entries.remove(key).is_some();
        if removed {
            metrics::record_bounded_cache_size(entries.len());
        }
        removed
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(now_ms())
    }

    pub fn sweep_at(&self, now_ms: u64) -> usize {
        let mut entries = self.lock();
        let removed = Self::sweep_locked(&mut entries, now_ms);
        metrics::record_bounded_cache_size(entries.len());
        removed
    }

    fn sweep_locked(entries: &mut HashMap<String, CacheEntry<V>>, now_ms: u64) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now_ms));
        before - entries.len()
    }

    fn make_room(&self, entries: &mut HashMap<String, CacheEntry<V>>, key: &str, now_ms: u64) {
        if entries.contains_key(key) || entries.len() < self.capacity {
            return;
        }

        let swept = Self::sweep_locked(entries, now_ms);
        if swept > 0 {
            tracing::debug!(swept, remaining = entries.len(), "Swept expired cache entries");
        }

        while entries.len() >= self.capacity {
            let victim = entries
                .iter()
                .min_by(|a, b| {
                    a.1.expires_at_ms
                        .cmp(&b.1.expires_at_ms)
                        .then_with(|| a.0.cmp(b.0))
                })
                .map(|(k, _)| k.clone());
            match victim {
                Some(victim) => {
                    tracing::debug!(key = %victim, "Evicting live cache entry at capacity");
                    entries.remove(&victim);
                }
                None => break,
            }
        }
    }
}
