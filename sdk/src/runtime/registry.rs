//! Explicit registry of batch loaders, built once at startup

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::loader::{BatchLoader, Erased, ErasedLoader, RuntimeError};

/// Batch loaders by their stable string key
#[derive(Clone, Default)]
pub struct LoaderRegistry {
    loaders: BTreeMap<String, Arc<dyn ErasedLoader>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loader; each key may be registered once
    pub fn register<L: BatchLoader>(
        &mut self,
        key: impl Into<String>,
        loader: L,
    ) -> Result<&mut Self, RuntimeError> {
        let key = key.into();
        if self.loaders.contains_key(&key) {
            return Err(RuntimeError::DuplicateLoader(key));
        }
        debug!(key = %key, value = std::any::type_name::<L::Value>(), "Registered batch loader");
        self.loaders.insert(key, Arc::new(Erased(loader)));
        Ok(self)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.loaders.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    pub(crate) fn get(&self, key: &str) -> Result<Arc<dyn ErasedLoader>, RuntimeError> {
        self.loaders
            .get(key)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownLoader(key.to_string()))
    }
}

impl fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("keys", &self.loaders.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryLoader;

    #[test]
    fn test_duplicate_key_rejected() {
        let mut registry = LoaderRegistry::new();
        registry
            .register("WIDGET", MemoryLoader::<String>::new())
            .unwrap()
            .register("GADGET", MemoryLoader::<String>::new())
            .unwrap();

        let err = registry
            .register("WIDGET", MemoryLoader::<String>::new())
            .unwrap_err();
        assert_eq!(err, RuntimeError::DuplicateLoader("WIDGET".to_string()));
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["GADGET", "WIDGET"]);
    }

    #[test]
    fn test_unknown_key() {
        let registry = LoaderRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.get("WIDGET"),
            Err(RuntimeError::UnknownLoader(key)) if key == "WIDGET"
        ));
    }
}
