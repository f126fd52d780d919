//! Request-scoped collection and dispatch of batch loads
//!
//! The first load for a key in a fresh collection window owns that window. The
//! owner keeps yielding until a yield passes without new loads for the key, so
//! loads joined on the same task (`join!`, `load_many`) always land in its
//! window whatever the runtime flavor. It then drains the window inline,
//! deduplicated by id and ordered ascending, in chunks of at most
//! `max_batch_size` ids.

use dashmap::DashMap;
use futures::future::join_all;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;
use std::mem;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::cache::{CacheKey, CacheStore};
use super::loader::{downcast, BatchResult, CachedValue, ErasedLoader, LoadError};
use super::registry::LoaderRegistry;
use super::LoaderOptions;

type Outcome = Result<Option<CachedValue>, LoadError>;
type Waiter = oneshot::Sender<Outcome>;

/// Upper bound on owner yields while loads keep arriving
const MAX_COLLECT_YIELDS: usize = 16;

/// Collector state of one loader key within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Collecting,
    Dispatching,
}

#[derive(Default)]
struct Queue {
    pending: BTreeMap<i64, SmallVec<[Waiter; 1]>>,
    scheduled: bool,
    in_flight: usize,
    fetches: usize,
    enqueued: usize,
}

struct Inner {
    registry: Arc<LoaderRegistry>,
    options: LoaderOptions,
    cache: Option<Arc<dyn CacheStore>>,
    queues: DashMap<String, Queue>,
}

/// Per-request handle onto the batching runtime
#[derive(Clone)]
pub struct LoaderSession {
    inner: Arc<Inner>,
}

impl LoaderSession {
    pub(crate) fn new(
        registry: Arc<LoaderRegistry>,
        options: LoaderOptions,
        cache: Option<Arc<dyn CacheStore>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                options,
                cache,
                queues: DashMap::new(),
            }),
        }
    }

    /// Load one id; `Ok(None)` is an explicit miss
    pub async fn load<V: Clone + Send + Sync + 'static>(
        &self,
        key: &str,
        id: i64,
    ) -> Result<Option<V>, LoadError> {
        let loader = self.inner.registry.get(key)?;

        if let Some(value) = self.cached(key, id) {
            return downcast::<V>(key, &value).map(Some);
        }

        let (tx, rx) = oneshot::channel();
        let opened = {
            let mut queue = self.inner.queues.entry(key.to_string()).or_default();
            queue.pending.entry(id).or_default().push(tx);
            queue.enqueued += 1;
            !mem::replace(&mut queue.scheduled, true)
        };

        if opened {
            debug!(loader = key, "Opening collection window");
            Window {
                session: self.clone(),
                key: key.to_string(),
                loader: Some(loader),
            }
            .drive()
            .await;
        }

        match rx.await {
            Ok(outcome) => outcome?.map(|value| downcast::<V>(key, &value)).transpose(),
            Err(_) => Err(LoadError::Abandoned(key.to_string())),
        }
    }

    /// Load several ids in one collection window, answers in input order
    pub async fn load_many<V: Clone + Send + Sync + 'static>(
        &self,
        key: &str,
        ids: &[i64],
    ) -> Vec<Result<Option<V>, LoadError>> {
        join_all(ids.iter().map(|id| self.load::<V>(key, *id))).await
    }

    pub fn phase(&self, key: &str) -> Phase {
        match self.inner.queues.get(key) {
            Some(queue) if queue.scheduled => Phase::Collecting,
            Some(queue) if queue.in_flight > 0 => Phase::Dispatching,
            _ => Phase::Idle,
        }
    }

    /// Number of underlying multi-id fetches issued for `key` by this session
    pub fn fetch_count(&self, key: &str) -> usize {
        self.inner
            .queues
            .get(key)
            .map(|queue| queue.fetches)
            .unwrap_or(0)
    }

    fn enqueued(&self, key: &str) -> usize {
        self.inner
            .queues
            .get(key)
            .map(|queue| queue.enqueued)
            .unwrap_or(0)
    }

    /// Fail every waiter of an undrained window
    fn abandon(&self, key: &str) {
        if let Some(mut queue) = self.inner.queues.get_mut(key) {
            warn!(loader = key, ids = queue.pending.len(), "Abandoning collection window");
            queue.scheduled = false;
            queue.pending.clear();
        }
    }

    fn cached(&self, key: &str, id: i64) -> Option<CachedValue> {
        let cache = self.inner.cache.as_ref()?;
        match cache.get(&CacheKey::new(key, id)) {
            Ok(value) => value,
            Err(e) => {
                warn!(loader = key, id, error = %e, "Bypassing cache on read");
                None
            }
        }
    }

    fn store(&self, key: &Arc<str>, id: i64, value: &CachedValue) {
        if let Some(cache) = &self.inner.cache {
            if let Err(e) = cache.put(CacheKey::new(Arc::clone(key), id), Arc::clone(value)) {
                warn!(loader = %key, id, error = %e, "Bypassing cache on write");
            }
        }
    }

    async fn dispatch(self, key: String, loader: Arc<dyn ErasedLoader>) {
        let mut pending = {
            let mut queue = self.inner.queues.entry(key.clone()).or_default();
            queue.scheduled = false;
            queue.in_flight += 1;
            mem::take(&mut queue.pending)
        };

        let ids: Vec<i64> = pending.keys().copied().collect();
        let chunks: Vec<&[i64]> = ids.chunks(self.inner.options.max_batch_size.max(1)).collect();
        if let Some(mut queue) = self.inner.queues.get_mut(&key) {
            queue.fetches += chunks.len();
        }
        debug!(loader = %key, ids = ids.len(), chunks = chunks.len(), "Dispatching batch");

        let flight = InFlight {
            session: &self,
            key: &key,
        };
        let results: Vec<BatchResult<CachedValue>> =
            join_all(chunks.iter().map(|chunk| loader.load_erased(chunk))).await;
        drop(flight);

        let cache_key: Arc<str> = Arc::from(key.as_str());
        for (chunk, result) in chunks.iter().zip(results) {
            if let Err(e) = &result {
                warn!(loader = %key, ids = chunk.len(), error = %e, "Batch fetch failed");
            }
            for id in chunk.iter() {
                let outcome: Outcome = match &result {
                    Ok(values) => match values.get(id) {
                        Some(Ok(value)) => {
                            self.store(&cache_key, *id, value);
                            Ok(Some(Arc::clone(value)))
                        }
                        Some(Err(e)) => Err(e.clone()),
                        None => Ok(None),
                    },
                    Err(e) => Err(e.clone()),
                };
                for waiter in pending.remove(id).unwrap_or_default() {
                    // receiver gone means the caller was cancelled
                    let _ = waiter.send(outcome.clone());
                }
            }
        }
    }
}

/// Collection window held by the load that opened it
///
/// Dropping the owner before it drains hands the window to a spawned task so
/// the other waiters still get answers.
struct Window {
    session: LoaderSession,
    key: String,
    loader: Option<Arc<dyn ErasedLoader>>,
}

impl Window {
    async fn drive(mut self) {
        for _ in 0..MAX_COLLECT_YIELDS {
            let before = self.session.enqueued(&self.key);
            tokio::task::yield_now().await;
            if self.session.enqueued(&self.key) == before {
                break;
            }
        }

        if let Some(loader) = self.loader.take() {
            let key = mem::take(&mut self.key);
            self.session.clone().dispatch(key, loader).await;
        }
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        let Some(loader) = self.loader.take() else {
            return;
        };
        let key = mem::take(&mut self.key);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(loader = %key, "Window owner dropped, dispatching in the background");
                handle.spawn(self.session.clone().dispatch(key, loader));
            }
            Err(_) => self.session.abandon(&key),
        }
    }
}

/// Keeps the key in [`Phase::Dispatching`] while a fetch is outstanding
struct InFlight<'a> {
    session: &'a LoaderSession,
    key: &'a str,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(mut queue) = self.session.inner.queues.get_mut(self.key) {
            queue.in_flight -= 1;
        }
    }
}

impl fmt::Debug for LoaderSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderSession")
            .field("registry", &self.inner.registry)
            .field("options", &self.inner.options)
            .field("cached", &self.inner.cache.is_some())
            .finish()
    }
}
