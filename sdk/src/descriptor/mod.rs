//! Entity descriptors and the catalog they are built from

pub mod catalog;
pub mod naming;
pub mod types;

pub use catalog::{ClassDef, MemberDef, ParamDef, ServiceCatalog};
pub use types::{
    AccessorKind, EntityDescriptor, FieldDescriptor, GraphType, GraphTypeKind, IdDescriptor,
    MethodDescriptor, MethodKind, ParamDescriptor, Primitive, ScalarRef, ServiceRef, SourceType,
    Target, TypeSyntaxError,
};
