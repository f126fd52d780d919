//! Cross-request value cache
//!
//! Entries are keyed by loader key plus numeric id and shared by every session
//! of a runtime. [`LruTtlCache`] bounds the entry count by least-recent access
//! and expires entries a fixed time after insertion. Callers treat any
//! [`CacheError`] as a miss so a broken cache never fails a request.

use ahash::AHashMap;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use super::loader::CachedValue;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub loader: Arc<str>,
    pub id: i64,
}

impl CacheKey {
    pub fn new(loader: impl Into<Arc<str>>, id: i64) -> Self {
        Self {
            loader: loader.into(),
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("Cache storage unavailable: {0}")]
    Unavailable(String),
}

/// Storage beneath the per-request collector
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<CachedValue>, CacheError>;

    fn put(&self, key: CacheKey, value: CachedValue) -> Result<(), CacheError>;

    /// Returns whether an entry was removed
    fn invalidate(&self, key: &CacheKey) -> Result<bool, CacheError>;

    fn clear(&self) -> Result<(), CacheError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Entry {
    value: CachedValue,
    inserted_at: Instant,
    tick: u64,
}

#[derive(Default)]
struct State {
    entries: AHashMap<CacheKey, Entry>,
    /// Access tick -> key, oldest first
    recency: BTreeMap<u64, CacheKey>,
    next_tick: u64,
}

impl State {
    fn touch(&mut self, key: &CacheKey) {
        let tick = self.next_tick;
        self.next_tick += 1;
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.tick);
            entry.tick = tick;
            self.recency.insert(tick, key.clone());
        }
    }

    fn remove(&mut self, key: &CacheKey) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.recency.remove(&entry.tick);
                true
            }
            None => false,
        }
    }

    fn evict_lru(&mut self) -> Option<CacheKey> {
        let (_, key) = self.recency.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }
}

/// In-process LRU cache with a fixed time-to-live
pub struct LruTtlCache {
    max_size: usize,
    ttl: Duration,
    state: Mutex<State>,
}

impl LruTtlCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            max_size,
            ttl,
            state: Mutex::new(State::default()),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, CacheError> {
        self.state
            .lock()
            .map_err(|_| CacheError::Unavailable("cache lock poisoned".to_string()))
    }

    pub(crate) fn get_at(&self, key: &CacheKey, now: Instant) -> Result<Option<CachedValue>, CacheError> {
        let mut state = self.lock()?;
        let expired = match state.entries.get(key) {
            None => {
                debug!(loader = %key.loader, id = key.id, "Cache miss");
                return Ok(None);
            }
            Some(entry) => now.saturating_duration_since(entry.inserted_at) >= self.ttl,
        };

        if expired {
            state.remove(key);
            debug!(loader = %key.loader, id = key.id, "Cache entry expired");
            return Ok(None);
        }

        state.touch(key);
        debug!(loader = %key.loader, id = key.id, "Cache hit");
        Ok(state.entries.get(key).map(|entry| Arc::clone(&entry.value)))
    }

    pub(crate) fn put_at(&self, key: CacheKey, value: CachedValue, now: Instant) -> Result<(), CacheError> {
        if self.max_size == 0 {
            return Ok(());
        }
        let mut state = self.lock()?;
        state.remove(&key);
        while state.entries.len() >= self.max_size {
            match state.evict_lru() {
                Some(evicted) => debug!(loader = %evicted.loader, id = evicted.id, "Evicted cache entry"),
                None => break,
            }
        }

        let tick = state.next_tick;
        state.next_tick += 1;
        state.recency.insert(tick, key.clone());
        state.entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
                tick,
            },
        );
        Ok(())
    }
}

impl CacheStore for LruTtlCache {
    fn get(&self, key: &CacheKey) -> Result<Option<CachedValue>, CacheError> {
        self.get_at(key, Instant::now())
    }

    fn put(&self, key: CacheKey, value: CachedValue) -> Result<(), CacheError> {
        self.put_at(key, value, Instant::now())
    }

    fn invalidate(&self, key: &CacheKey) -> Result<bool, CacheError> {
        Ok(self.lock()?.remove(key))
    }

    fn clear(&self) -> Result<(), CacheError> {
        let mut state = self.lock()?;
        state.entries.clear();
        state.recency.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.lock().map(|state| state.entries.len()).unwrap_or(0)
    }
}
