//! Batching and caching runtime consumed by generated loaders
//!
//! One [`BatchingRuntime`] is built at process start from an explicit
//! [`LoaderRegistry`]. Each request opens a [`LoaderSession`]; sessions collect
//! loads per loader key and share the runtime's cache.

pub mod cache;
pub mod context;
pub mod loader;
pub mod registry;
pub mod session;

pub use cache::{CacheError, CacheKey, CacheStore, LruTtlCache};
pub use context::RequestContext;
pub use loader::{BatchLoader, BatchResult, CachedValue, LoadError, RuntimeError};
pub use registry::LoaderRegistry;
pub use session::{LoaderSession, Phase};

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Global batch loader options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Upper bound on ids per underlying fetch
    pub max_batch_size: usize,
    pub cache_ttl: Duration,
    /// Zero disables the cross-request cache
    pub cache_max_size: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            cache_ttl: Duration::from_secs(60),
            cache_max_size: 1_000,
        }
    }
}

/// Process-wide batching runtime
pub struct BatchingRuntime {
    registry: Arc<LoaderRegistry>,
    options: LoaderOptions,
    cache: Option<Arc<dyn CacheStore>>,
}

impl BatchingRuntime {
    pub fn new(registry: LoaderRegistry, options: LoaderOptions) -> Self {
        let cache = (options.cache_max_size > 0).then(|| {
            Arc::new(LruTtlCache::new(options.cache_max_size, options.cache_ttl)) as Arc<dyn CacheStore>
        });

        info!(
            loaders = registry.len(),
            max_batch_size = options.max_batch_size,
            cache_max_size = options.cache_max_size,
            cache_ttl_ms = options.cache_ttl.as_millis() as u64,
            "Batching runtime started"
        );

        Self {
            registry: Arc::new(registry),
            options,
            cache,
        }
    }

    /// Replace the in-process cache with another store
    pub fn with_cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(store);
        self
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    pub fn registry(&self) -> &LoaderRegistry {
        &self.registry
    }

    pub fn cache(&self) -> Option<&dyn CacheStore> {
        self.cache.as_deref()
    }

    /// Open a request-scoped session
    pub fn session(&self) -> LoaderSession {
        LoaderSession::new(Arc::clone(&self.registry), self.options, self.cache.clone())
    }

    pub fn context(&self) -> RequestContext {
        RequestContext::new(self.session())
    }

    /// Drop a cached value, typically after a mutation
    pub fn invalidate(&self, key: &str, id: i64) -> bool {
        let Some(cache) = &self.cache else {
            return false;
        };
        cache.invalidate(&CacheKey::new(key, id)).unwrap_or_else(|e| {
            warn!(loader = key, id, error = %e, "Cache invalidation failed");
            false
        })
    }

    pub fn shutdown(&self) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.clear() {
                warn!(error = %e, "Failed to clear cache on shutdown");
            }
        }
        info!("Batching runtime stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryLoader;

    struct BrokenCache;

    impl CacheStore for BrokenCache {
        fn get(&self, _key: &CacheKey) -> Result<Option<CachedValue>, CacheError> {
            Err(CacheError::Unavailable("offline".to_string()))
        }

        fn put(&self, _key: CacheKey, _value: CachedValue) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("offline".to_string()))
        }

        fn invalidate(&self, _key: &CacheKey) -> Result<bool, CacheError> {
            Err(CacheError::Unavailable("offline".to_string()))
        }

        fn clear(&self) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("offline".to_string()))
        }

        fn len(&self) -> usize {
            0
        }
    }

    fn registry(loader: MemoryLoader<String>) -> LoaderRegistry {
        let mut registry = LoaderRegistry::new();
        registry.register("WIDGET", loader).unwrap();
        registry
    }

    #[tokio::test]
    async fn test_cache_hit_skips_dispatch() {
        let loader = MemoryLoader::with_values([(7, "seven".to_string())]);
        let runtime = BatchingRuntime::new(registry(loader.clone()), LoaderOptions::default());

        let first = runtime.session();
        assert_eq!(first.load::<String>("WIDGET", 7).await.unwrap().as_deref(), Some("seven"));

        let second = runtime.session();
        assert_eq!(second.load::<String>("WIDGET", 7).await.unwrap().as_deref(), Some("seven"));
        assert_eq!(second.fetch_count("WIDGET"), 0);
        assert_eq!(loader.batches().len(), 1);

        assert!(runtime.invalidate("WIDGET", 7));
        second.load::<String>("WIDGET", 7).await.unwrap();
        assert_eq!(loader.batches().len(), 2);
    }

    #[tokio::test]
    async fn test_broken_cache_is_bypassed() {
        let loader = MemoryLoader::with_values([(1, "one".to_string())]);
        let runtime = BatchingRuntime::new(registry(loader.clone()), LoaderOptions::default())
            .with_cache_store(Arc::new(BrokenCache));

        let session = runtime.session();
        assert_eq!(session.load::<String>("WIDGET", 1).await.unwrap().as_deref(), Some("one"));
        assert!(!runtime.invalidate("WIDGET", 1));
        runtime.shutdown();
    }

    #[tokio::test]
    async fn test_zero_cache_size_disables_cache() {
        let options = LoaderOptions {
            cache_max_size: 0,
            ..Default::default()
        };
        let runtime = BatchingRuntime::new(registry(MemoryLoader::new()), options);
        assert!(runtime.cache().is_none());
        assert!(!runtime.invalidate("WIDGET", 1));
    }

    #[tokio::test]
    async fn test_shutdown_clears_cache() {
        let loader = MemoryLoader::with_values([(1, "one".to_string())]);
        let runtime = BatchingRuntime::new(registry(loader), LoaderOptions::default());
        runtime.context().load::<String>("WIDGET", 1).await.unwrap();
        assert_eq!(runtime.cache().map(|c| c.len()), Some(1));

        runtime.shutdown();
        assert_eq!(runtime.cache().map(|c| c.len()), Some(0));
    }
}
