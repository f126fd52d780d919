//! Test support for generated code and for the generator itself
//!
//! - [`MemoryLoader`]: an in-memory [`BatchLoader`](crate::runtime::BatchLoader) that
//!   records every batch it serves, for asserting on batching behaviour
//! - [`fixtures`]: a small sample project (config plus catalog)
//!
//! # Usage
//!
//! ```rust
//! use servgraph_sdk::runtime::{BatchingRuntime, LoaderOptions, LoaderRegistry};
//! use servgraph_sdk::testing::MemoryLoader;
//!
//! #[tokio::test]
//! async fn test_loads_are_batched() {
//!     let loader = MemoryLoader::with_values([(1, "one"), (2, "two")]);
//!     let mut registry = LoaderRegistry::new();
//!     registry.register("Widget", loader.clone()).unwrap();
//!
//!     let runtime = BatchingRuntime::new(registry, LoaderOptions::default());
//!     let session = runtime.session();
//!     let (a, b) = tokio::join!(session.load::<&str>("Widget", 1), session.load::<&str>("Widget", 2));
//!     assert_eq!(loader.call_count(), 1);
//! }
//! ```

pub mod fixtures;
pub mod memory_loader;

pub use memory_loader::*;
