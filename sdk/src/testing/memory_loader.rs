// In-memory batch loader for testing
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::runtime::{BatchLoader, BatchResult, LoadError};

/// A [`BatchLoader`] over an in-memory table that records every batch it serves
///
/// Clones share the same table and call log.
#[derive(Debug, Clone)]
pub struct MemoryLoader<V> {
    // id -> value
    values: Arc<DashMap<i64, V>>,
    // id -> failure message
    failures: Arc<DashMap<i64, String>>,
    batch_failure: Arc<Mutex<Option<String>>>,
    batches: Arc<Mutex<Vec<Vec<i64>>>>,
}

impl<V: Clone + Send + Sync + 'static> MemoryLoader<V> {
    pub fn new() -> Self {
        Self {
            values: Arc::new(DashMap::new()),
            failures: Arc::new(DashMap::new()),
            batch_failure: Arc::new(Mutex::new(None)),
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_values<I: IntoIterator<Item = (i64, V)>>(values: I) -> Self {
        let loader = Self::new();
        for (id, value) in values {
            loader.insert(id, value);
        }
        loader
    }

    pub fn insert(&self, id: i64, value: V) {
        self.values.insert(id, value);
    }

    pub fn remove(&self, id: i64) -> Option<V> {
        self.values.remove(&id).map(|(_, value)| value)
    }

    /// Make every fetch that includes `id` fail for that id only
    pub fn fail_id(&self, id: i64, message: impl Into<String>) {
        self.failures.insert(id, message.into());
    }

    /// Make every subsequent fetch fail as a whole
    pub fn fail_batches(&self, message: impl Into<String>) {
        *self.batch_failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(message.into());
    }

    pub fn reset_failures(&self) {
        self.failures.clear();
        *self.batch_failure.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Ids of every fetch served so far, in call order
    pub fn batches(&self) -> Vec<Vec<i64>> {
        self.batches.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.batches.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl<V: Clone + Send + Sync + 'static> Default for MemoryLoader<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> BatchLoader for MemoryLoader<V> {
    type Value = V;

    async fn load(&self, ids: &[i64]) -> BatchResult<V> {
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ids.to_vec());

        if let Some(message) = self.batch_failure.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            return Err(LoadError::failed(message));
        }

        let mut found = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(message) = self.failures.get(id) {
                found.insert(*id, Err(LoadError::failed(message.value())));
            } else if let Some(value) = self.values.get(id) {
                found.insert(*id, Ok(value.value().clone()));
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_batches() {
        let loader = MemoryLoader::with_values([(1, "one"), (2, "two")]);
        let found = loader.load(&[1, 3]).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[&1], Ok("one"));
        assert_eq!(loader.batches(), vec![vec![1, 3]]);
    }

    #[tokio::test]
    async fn test_failures() {
        let loader = MemoryLoader::with_values([(1, 10), (2, 20)]);
        loader.fail_id(2, "bad row");
        let found = loader.load(&[1, 2]).await.unwrap();
        assert_eq!(found[&2], Err(LoadError::failed("bad row")));

        loader.fail_batches("offline");
        assert!(loader.load(&[1]).await.is_err());

        loader.reset_failures();
        assert_eq!(loader.load(&[2]).await.unwrap()[&2], Ok(20));
        assert_eq!(loader.call_count(), 3);
    }
}
