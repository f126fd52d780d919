//! Error types for generation runs

use std::path::PathBuf;
use thiserror::Error;

use crate::descriptor::MethodKind;

/// Errors raised while describing entities or producing artifacts
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The entity class or its backing service is not in the catalog
    #[error("Class '{class}' for entity '{entity}' not found in the service catalog")]
    ClassNotFound { entity: String, class: String },

    /// The classes exist but expose nothing usable
    #[error("Introspection failed for entity '{entity}': {reason}")]
    Introspection { entity: String, reason: String },

    /// A field or parameter type has no scalar or entity mapping
    #[error("Unmappable type '{ty}' on '{member}' of entity '{entity}'")]
    UnmappableType {
        entity: String,
        member: String,
        ty: String,
    },

    /// Two methods compete for the same operation kind
    #[error("Ambiguous {kind} classification for entity '{entity}': {}", methods.join(", "))]
    AmbiguousClassification {
        entity: String,
        kind: MethodKind,
        methods: Vec<String>,
    },

    /// An entity reference that never resolves against the generated set
    #[error("Entity '{entity}' references unknown entity '{target}'")]
    DanglingReference { entity: String, target: String },

    /// Two entities contribute the same root field
    #[error("Duplicate {root} field '{field}' declared by {}", entities.join(" and "))]
    DuplicateRootField {
        field: String,
        root: &'static str,
        entities: Vec<String>,
    },

    /// Invalid generator configuration
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// The service catalog could not be loaded
    #[error("Catalog error: {reason}")]
    Catalog { reason: String },

    /// A rendered artifact failed its own consistency check
    #[error("Render error: {reason}")]
    Render { reason: String },

    /// Filesystem failure while writing an artifact
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenerationError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    pub fn catalog(reason: impl Into<String>) -> Self {
        Self::Catalog {
            reason: reason.into(),
        }
    }

    /// Whether the error only invalidates the entity it was raised for.
    pub fn is_entity_scoped(&self) -> bool {
        matches!(
            self,
            Self::ClassNotFound { .. }
                | Self::Introspection { .. }
                | Self::UnmappableType { .. }
                | Self::AmbiguousClassification { .. }
        )
    }
}

pub type GenerationResult<T> = std::result::Result<T, GenerationError>;
