//! Mapping from source types to query-language types

use std::collections::BTreeSet;
use thiserror::Error;

use crate::descriptor::{GraphType, Primitive, ScalarRef, SourceType};

/// The source type has neither a scalar nor an entity mapping
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no scalar or entity mapping for '{0}'")]
pub struct UnmappableType(pub String);

/// Scalar behind a primitive kind, shared by the primitive and boxed forms
pub fn scalar_for(primitive: Primitive) -> ScalarRef {
    match primitive {
        Primitive::Int => ScalarRef::Int,
        Primitive::Long => ScalarRef::Long,
        Primitive::Double => ScalarRef::Float,
        Primitive::Boolean => ScalarRef::Boolean,
    }
}

/// Maps parameter, return and field types
///
/// Any named type found in `known_types` becomes a pending entity reference; the
/// set coordinator resolves it once every entity has been described, which is
/// what allows forward references between entities.
#[derive(Debug, Clone, Default)]
pub struct ScalarTypeMapper {
    known_types: BTreeSet<String>,
}

impl ScalarTypeMapper {
    pub fn new<I, S>(known_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_types: known_types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.known_types.contains(name)
    }

    pub fn map(&self, ty: &SourceType) -> Result<GraphType, UnmappableType> {
        match ty {
            SourceType::Primitive(p) => Ok(GraphType::scalar(scalar_for(*p), false)),
            SourceType::Boxed(p) => Ok(GraphType::scalar(scalar_for(*p), true)),
            SourceType::String => Ok(GraphType::scalar(ScalarRef::String, true)),
            SourceType::Named(name) if self.is_known(name) => Ok(GraphType::entity(name.clone())),
            SourceType::Array(inner) => match inner.as_ref() {
                SourceType::Array(_) | SourceType::Void => Err(UnmappableType(ty.to_string())),
                item => self.map(item).map(GraphType::list),
            },
            SourceType::Named(_) | SourceType::Void => Err(UnmappableType(ty.to_string())),
        }
    }

    /// Return types: `void` becomes a non-null `Boolean` acknowledgement
    pub fn map_return(&self, ty: &SourceType) -> Result<GraphType, UnmappableType> {
        match ty {
            SourceType::Void => Ok(GraphType::scalar(ScalarRef::Boolean, false)),
            other => self.map(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::GraphTypeKind;

    fn scalar_name(ty: &GraphType) -> String {
        match &ty.kind {
            GraphTypeKind::Scalar(s) => s.name().to_string(),
            GraphTypeKind::List(inner) => format!("list of {}", scalar_name(inner)),
            GraphTypeKind::Entity(name) => name.clone(),
        }
    }

    #[test]
    fn test_scalar_table() {
        let table = [
            ("int", "Int"),
            ("Integer", "Int"),
            ("long", "Long"),
            ("Long", "Long"),
            ("double", "Float"),
            ("Double", "Float"),
            ("boolean", "Boolean"),
            ("Boolean", "Boolean"),
            ("String", "String"),
            ("int[]", "list of Int"),
            ("Integer[]", "list of Int"),
            ("long[]", "list of Long"),
            ("Long[]", "list of Long"),
            ("double[]", "list of Float"),
            ("Double[]", "list of Float"),
            ("boolean[]", "list of Boolean"),
            ("Boolean[]", "list of Boolean"),
            ("String[]", "list of String"),
        ];

        let mapper = ScalarTypeMapper::default();
        for (source, expected) in table {
            let ty: SourceType = source.parse().unwrap();
            let mapped = mapper.map(&ty).unwrap();
            assert_eq!(scalar_name(&mapped), expected, "mapping of {source}");
        }
    }

    #[test]
    fn test_nullability() {
        let mapper = ScalarTypeMapper::default();
        assert!(!mapper.map(&"int".parse().unwrap()).unwrap().nullable);
        assert!(mapper.map(&"Integer".parse().unwrap()).unwrap().nullable);
        assert_eq!(mapper.map(&"long[]".parse().unwrap()).unwrap().to_string(), "[Long!]");
        assert_eq!(mapper.map(&"Long[]".parse().unwrap()).unwrap().to_string(), "[Long]");
    }

    #[test]
    fn test_entity_references() {
        let mapper = ScalarTypeMapper::new(["Widget"]);
        let mapped = mapper.map(&"Widget".parse().unwrap()).unwrap();
        assert_eq!(mapped.entity_ref(), Some("Widget"));

        let list = mapper.map(&"List<Widget>".parse().unwrap()).unwrap();
        assert!(list.is_list());
        assert_eq!(list.entity_ref(), Some("Widget"));
    }

    #[test]
    fn test_unmappable_types() {
        let mapper = ScalarTypeMapper::new(["Widget"]);
        for source in ["Date", "Map", "int[][]", "void"] {
            let ty: SourceType = source.parse().unwrap();
            assert_eq!(mapper.map(&ty), Err(UnmappableType(source.to_string())));
        }
    }

    #[test]
    fn test_void_return() {
        let mapper = ScalarTypeMapper::default();
        assert_eq!(mapper.map_return(&SourceType::Void).unwrap().to_string(), "Boolean!");
    }
}
