pub mod codegen;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod introspect;
pub mod runtime;
pub mod scalars;
pub mod testing;

// Re-export async_trait macro for generated contracts and loaders
pub use async_trait::async_trait;

// Re-export the generator entry points
pub use config::{find_config, GeneratorConfig};
pub use error::{GenerationError, GenerationResult};
pub use codegen::{GenerationReport, Generator};

// Re-export runtime components consumed by generated code
pub use runtime::{BatchLoader, BatchingRuntime, LoadError, LoaderOptions, LoaderRegistry, RequestContext};
pub use engine::{FieldError, FieldResult};

// Re-export testing framework components
pub use testing::MemoryLoader;

// Re-export codegen components for build scripts
pub use codegen::{codegen, Codegen, CodeGenerator, CodegenResult};
