// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Bounded memoisation keyed on the content of the inputs.
//!
//! Keys are blake3 digests built with [`ContentHasher`]; every field is
//! length-prefixed so that `("ab", "c")` and `("a", "bc")` never collide.
//! Entries are evicted least-recently-used once the capacity is reached.

use lru::LruCache;
use serde::Serialize;
use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentKey([u8; 32]);

impl ContentKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn short(&self) -> String {
        self.0[..6].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentKey({})", self.short())
    }
}

pub struct ContentHasher {
    inner: blake3::Hasher,
}

impl ContentHasher {
    pub fn new(domain: &str) -> Self {
        let mut hasher = Self {
            inner: blake3::Hasher::new(),
        };
        hasher.update_str(domain);
        hasher
    }

    pub fn update_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.inner.update(&(bytes.len() as u64).to_le_bytes());
        self.inner.update(bytes);
        self
    }

    pub fn update_str(&mut self, value: &str) -> &mut Self {
        self.update_bytes(value.as_bytes())
    }

    pub fn update_key(&mut self, key: &ContentKey) -> &mut Self {
        self.update_bytes(key.as_bytes())
    }

    pub fn finish(&self) -> ContentKey {
        ContentKey(*self.inner.finalize().as_bytes())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

/// A process-wide memo table. Values are cloned out, so store `Arc`s.
pub struct MemoCache<K: Hash + Eq, V: Clone> {
    name: &'static str,
    entries: Mutex<LruCache<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Hash + Eq + fmt::Debug, V: Clone> MemoCache<K, V> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<K, V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let found = self.lock().get(key).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    pub fn insert(&self, key: K, value: V) {
        self.lock().put(key, value);
    }

    /// Returns the cached value for `key`, computing and storing it on a miss.
    /// Errors are returned as-is and nothing is cached for them.
    pub fn get_or_try_insert_with<E, F>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            debug!(cache = self.name, ?key, "cache hit");
            return Ok(value);
        }
        debug!(cache = self.name, ?key, "cache miss");
        // The lock is not held while computing; a concurrent miss on the same
        // key computes twice and the last insert wins.
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: entries.len(),
            capacity: entries.cap().get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn key(parts: &[&str]) -> ContentKey {
        let mut hasher = ContentHasher::new("test");
        for part in parts {
            hasher.update_str(part);
        }
        hasher.finish()
    }

    #[test]
    fn length_prefix_separates_fields() {
        assert_ne!(key(&["ab", "c"]), key(&["a", "bc"]));
        assert_eq!(key(&["ab", "c"]), key(&["ab", "c"]));
    }

    #[test]
    fn domain_separates_keys() {
        let a = ContentHasher::new("loader").finish();
        let b = ContentHasher::new("summary").finish();
        assert_ne!(a, b);
    }

    #[test]
    fn computes_once_per_key() {
        let cache: MemoCache<ContentKey, u32> = MemoCache::new("test", 4);
        let calls = Cell::new(0);
        let compute = || -> Result<u32, ()> {
            calls.set(calls.get() + 1);
            Ok(7)
        };
        assert_eq!(cache.get_or_try_insert_with(key(&["x"]), compute), Ok(7));
        assert_eq!(cache.get_or_try_insert_with(key(&["x"]), compute), Ok(7));
        assert_eq!(calls.get(), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn errors_are_not_cached() {
        let cache: MemoCache<ContentKey, u32> = MemoCache::new("test", 4);
        let failed: Result<u32, &str> = cache.get_or_try_insert_with(key(&["x"]), || Err("boom"));
        assert!(failed.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache: MemoCache<ContentKey, u32> = MemoCache::new("test", 2);
        cache.insert(key(&["a"]), 1);
        cache.insert(key(&["b"]), 2);
        assert_eq!(cache.get(&key(&["a"])), Some(1));
        cache.insert(key(&["c"]), 3);
        assert_eq!(cache.get(&key(&["b"])), None);
        assert_eq!(cache.get(&key(&["a"])), Some(1));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let cache: MemoCache<ContentKey, u32> = MemoCache::new("test", 0);
        assert_eq!(cache.stats().capacity, 1);
    }
}
