//! Introspection: from catalog classes to entity descriptors

pub mod classifier;
pub mod introspector;
pub mod scalar;

pub use classifier::{Basis, Classification, ClassifiedSet, MethodClassifier, RawMethod};
pub use introspector::{Introspection, TypeIntrospector};
pub use scalar::{scalar_for, ScalarTypeMapper, UnmappableType};
