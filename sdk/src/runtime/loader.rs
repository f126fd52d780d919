//! Batch loader contract implemented by generated loaders

use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

/// Type-erased value as stored by the session and the cache
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// Outcome of one multi-id fetch
///
/// An id missing from the map is a miss. A per-id `Err` fails that id only; an
/// outer `Err` fails every id of the chunk that was being fetched.
pub type BatchResult<V> = Result<HashMap<i64, Result<V, LoadError>>, LoadError>;

/// Wiring errors of the runtime itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("Loader '{0}' is already registered")]
    DuplicateLoader(String),

    #[error("No loader registered under '{0}'")]
    UnknownLoader(String),

    #[error("Loader '{key}' does not produce values of type {expected}")]
    TypeMismatch { key: String, expected: &'static str },
}

/// Failure to load a single id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The backing fetch failed; the message is shared by every waiter
    #[error("{0}")]
    Failed(Arc<str>),

    /// The dispatcher went away before answering
    #[error("Batch for loader '{0}' was abandoned before completion")]
    Abandoned(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl LoadError {
    pub fn failed(message: impl Display) -> Self {
        Self::Failed(Arc::from(message.to_string()))
    }
}

/// Resolves many ids of one entity in a single call
#[async_trait]
pub trait BatchLoader: Send + Sync + 'static {
    type Value: Clone + Send + Sync + 'static;

    /// Fetch one chunk; ids are distinct and ascending
    async fn load(&self, ids: &[i64]) -> BatchResult<Self::Value>;
}

/// Object-safe view of a [`BatchLoader`] used by the registry
#[async_trait]
pub(crate) trait ErasedLoader: Send + Sync {
    async fn load_erased(&self, ids: &[i64]) -> BatchResult<CachedValue>;
}

pub(crate) struct Erased<L>(pub(crate) L);

#[async_trait]
impl<L: BatchLoader> ErasedLoader for Erased<L> {
    async fn load_erased(&self, ids: &[i64]) -> BatchResult<CachedValue> {
        let values = self.0.load(ids).await?;
        Ok(values
            .into_iter()
            .map(|(id, value)| (id, value.map(|v| Arc::new(v) as CachedValue)))
            .collect())
    }
}

/// Recover a concrete value from its erased form
pub(crate) fn downcast<V: Clone + 'static>(key: &str, value: &CachedValue) -> Result<V, LoadError> {
    value
        .downcast_ref::<V>()
        .cloned()
        .ok_or_else(|| {
            RuntimeError::TypeMismatch {
                key: key.to_string(),
                expected: std::any::type_name::<V>(),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;

    #[async_trait]
    impl BatchLoader for Doubler {
        type Value = i64;

        async fn load(&self, ids: &[i64]) -> BatchResult<i64> {
            Ok(ids
                .iter()
                .map(|id| {
                    let value = if *id < 0 {
                        Err(LoadError::failed("negative id"))
                    } else {
                        Ok(id * 2)
                    };
                    (*id, value)
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_erased_loader_round_trip() {
        let loader = Erased(Doubler);
        let values = loader.load_erased(&[-1, 3]).await.unwrap();
        let three = values[&3].as_ref().unwrap();
        assert_eq!(downcast::<i64>("doubler", three).unwrap(), 6);
        assert_eq!(values[&-1].as_ref().unwrap_err().to_string(), "negative id");
    }

    #[tokio::test]
    async fn test_downcast_mismatch() {
        let values = Erased(Doubler).load_erased(&[1]).await.unwrap();
        let err = downcast::<String>("doubler", values[&1].as_ref().unwrap()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Runtime(RuntimeError::TypeMismatch { ref key, .. }) if key == "doubler"
        ));
    }
}
