//! In-process result cache for discovery searches.
//!
//! Maps a normalized (query, location) key to the canonical posting list
//! from a previous pass. Entries expire lazily after a fixed TTL; the entry
//! count is soft-bounded with insertion-order eviction. Only latency depends
//! on this cache, never correctness, and it holds unscored postings only.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::models::posting::JobPosting;

pub const CACHE_TTL: Duration = Duration::from_secs(15 * 60);
pub const CACHE_CAPACITY: usize = 100;

/// Builds the normalized cache key. Query and location are lowercased
/// independently; an absent location normalizes to the empty string so
/// "query, no location" is stable and distinct from any literal location.
pub fn cache_key(query: &str, location: Option<&str>) -> String {
    format!(
        "{}_{}",
        query.trim().to_lowercase(),
        location.unwrap_or("").trim().to_lowercase()
    )
}

struct CacheEntry {
    postings: Vec<JobPosting>,
    created_at: Instant,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order, oldest at the front. Drives capacity eviction.
    order: VecDeque<String>,
}

pub struct ResultCache {
    ttl: Duration,
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CACHE_TTL, CACHE_CAPACITY)
    }
}

impl ResultCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Returns the cached postings for the key, or `None` when absent or
    /// expired. Expired entries are evicted on read (lazy expiry).
    pub fn get(&self, query: &str, location: Option<&str>) -> Option<Vec<JobPosting>> {
        self.get_at(query, location, Instant::now())
    }

    pub fn set(&self, query: &str, location: Option<&str>, postings: Vec<JobPosting>) {
        self.set_at(query, location, postings, Instant::now());
    }

    fn get_at(&self, query: &str, location: Option<&str>, now: Instant) -> Option<Vec<JobPosting>> {
        let key = cache_key(query, location);
        let mut inner = self.inner.lock().expect("cache mutex poisoned");

        let expired = match inner.entries.get(&key) {
            None => return None,
            Some(entry) => now.duration_since(entry.created_at) >= self.ttl,
        };

        if expired {
            inner.entries.remove(&key);
            inner.order.retain(|k| k != &key);
            return None;
        }

        inner.entries.get(&key).map(|e| e.postings.clone())
    }

    fn set_at(
        &self,
        query: &str,
        location: Option<&str>,
        postings: Vec<JobPosting>,
        now: Instant,
    ) {
        let key = cache_key(query, location);
        let mut inner = self.inner.lock().expect("cache mutex poisoned");

        // Re-setting a key counts as a fresh insertion for eviction order.
        if inner.entries.contains_key(&key) {
            inner.order.retain(|k| k != &key);
        } else if inner.entries.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }

        inner.order.push_back(key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                postings,
                created_at: now,
            },
        );
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }
}
