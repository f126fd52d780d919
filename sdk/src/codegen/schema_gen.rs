//! Schema documents built as `graphql_parser` syntax trees

use graphql_parser::schema::{
    Definition, Document, Field, InputValue, ObjectType, ObjectTypeExtension, ScalarType,
    Type, TypeDefinition, TypeExtension,
};
use graphql_parser::Pos;
use std::collections::BTreeSet;

use crate::descriptor::{EntityDescriptor, GraphType, GraphTypeKind, MethodDescriptor, ScalarRef};
use crate::error::GenerationError;

pub type SchemaDocument = Document<'static, String>;

const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

fn pos() -> Pos {
    Pos { line: 1, column: 1 }
}

pub fn graph_type(ty: &GraphType) -> Type<'static, String> {
    let inner = match &ty.kind {
        GraphTypeKind::Scalar(scalar) => Type::NamedType(scalar.name().to_string()),
        GraphTypeKind::Entity(name) => Type::NamedType(name.clone()),
        GraphTypeKind::List(item) => Type::ListType(Box::new(graph_type(item))),
    };
    if ty.nullable {
        inner
    } else {
        Type::NonNullType(Box::new(inner))
    }
}

pub fn object_type(entity: &EntityDescriptor) -> ObjectType<'static, String> {
    let mut object = ObjectType::new(entity.name().to_string());
    object.fields = entity
        .fields()
        .iter()
        .map(|field| Field {
            position: pos(),
            description: None,
            name: field.name.clone(),
            arguments: Vec::new(),
            field_type: graph_type(&field.graph_type),
            directives: Vec::new(),
        })
        .collect();
    object
}

/// Root field contributed by one classified method
pub fn root_field(entity: &EntityDescriptor, method: &MethodDescriptor) -> Field<'static, String> {
    Field {
        position: pos(),
        description: None,
        name: method.root_field(entity.name()),
        arguments: method
            .params
            .iter()
            .map(|param| InputValue {
                position: pos(),
                description: None,
                name: param.name.clone(),
                value_type: graph_type(&param.graph_type),
                default_value: None,
                directives: Vec::new(),
            })
            .collect(),
        field_type: graph_type(&method.returns),
        directives: Vec::new(),
    }
}

/// Query and mutation fields of one entity, in discovery order
pub fn root_fields(
    entity: &EntityDescriptor,
) -> (Vec<Field<'static, String>>, Vec<Field<'static, String>>) {
    let (mutations, queries): (Vec<_>, Vec<_>) = entity
        .methods()
        .iter()
        .partition(|method| method.kind.is_mutation());
    (
        queries.into_iter().map(|m| root_field(entity, m)).collect(),
        mutations.into_iter().map(|m| root_field(entity, m)).collect(),
    )
}

/// Per-entity fragment: the object type plus `extend type Query/Mutation`
pub fn fragment(entity: &EntityDescriptor) -> SchemaDocument {
    let (queries, mutations) = root_fields(entity);
    let mut definitions = vec![Definition::TypeDefinition(TypeDefinition::Object(
        object_type(entity),
    ))];

    for (root, fields) in [("Query", queries), ("Mutation", mutations)] {
        if fields.is_empty() {
            continue;
        }
        let mut extension = ObjectTypeExtension::new(root.to_string());
        extension.fields = fields;
        definitions.push(Definition::TypeExtension(TypeExtension::Object(extension)));
    }

    Document { definitions }
}

/// Merged document over every entity, with the root types fully assembled
pub fn merged(
    entities: &[EntityDescriptor],
    queries: Vec<Field<'static, String>>,
    mutations: Vec<Field<'static, String>>,
) -> SchemaDocument {
    let mut definitions = Vec::new();

    let uses_long = entities
        .iter()
        .any(|entity| entity.scalars().contains(&ScalarRef::Long));
    if uses_long {
        definitions.push(Definition::TypeDefinition(TypeDefinition::Scalar(
            ScalarType::new(ScalarRef::Long.name().to_string()),
        )));
    }

    for entity in entities {
        definitions.push(Definition::TypeDefinition(TypeDefinition::Object(
            object_type(entity),
        )));
    }

    for (root, fields) in [("Query", queries), ("Mutation", mutations)] {
        if fields.is_empty() {
            continue;
        }
        let mut object = ObjectType::new(root.to_string());
        object.fields = fields;
        definitions.push(Definition::TypeDefinition(TypeDefinition::Object(object)));
    }

    Document { definitions }
}

fn named_type<'a>(ty: &'a Type<'_, String>) -> &'a str {
    match ty {
        Type::NamedType(name) => name,
        Type::ListType(inner) | Type::NonNullType(inner) => named_type(inner),
    }
}

fn render_error(reason: impl Into<String>) -> GenerationError {
    GenerationError::Render {
        reason: reason.into(),
    }
}

/// Parse rendered SDL back and check it is a servable schema
///
/// Every referenced type must be declared, arguments must not be object
/// types, every object type needs at least one field and `Query` must exist.
pub fn check_schema(sdl: &str) -> Result<(), GenerationError> {
    let document = graphql_parser::parse_schema::<String>(sdl)
        .map_err(|e| render_error(format!("merged schema does not parse: {e}")))?;

    let mut declared: BTreeSet<&str> = BUILTIN_SCALARS.into_iter().collect();
    let mut objects = BTreeSet::new();
    let mut referenced = BTreeSet::new();
    let mut arguments = Vec::new();
    let mut query_fields = 0;

    for definition in &document.definitions {
        let (name, fields) = match definition {
            Definition::TypeDefinition(TypeDefinition::Scalar(scalar)) => {
                declared.insert(scalar.name.as_str());
                continue;
            }
            Definition::TypeDefinition(TypeDefinition::Object(object)) => {
                if !declared.insert(object.name.as_str()) {
                    return Err(render_error(format!(
                        "type '{}' is declared more than once",
                        object.name
                    )));
                }
                objects.insert(object.name.as_str());
                (object.name.as_str(), &object.fields)
            }
            Definition::TypeExtension(TypeExtension::Object(extension)) => {
                (extension.name.as_str(), &extension.fields)
            }
            _ => continue,
        };

        if fields.is_empty() {
            return Err(render_error(format!("type '{name}' has no fields")));
        }
        if name == "Query" {
            query_fields += fields.len();
        }
        for field in fields {
            referenced.insert(named_type(&field.field_type));
            for argument in &field.arguments {
                referenced.insert(named_type(&argument.value_type));
                arguments.push((name, field.name.as_str(), argument));
            }
        }
    }

    let missing: Vec<&str> = referenced.difference(&declared).copied().collect();
    if !missing.is_empty() {
        return Err(render_error(format!(
            "merged schema references undeclared types: {}",
            missing.join(", ")
        )));
    }

    if let Some((owner, field, argument)) = arguments
        .iter()
        .find(|(_, _, argument)| objects.contains(named_type(&argument.value_type)))
    {
        return Err(render_error(format!(
            "argument '{}' of {owner}.{field} has object type '{}', which is not an input type",
            argument.name,
            named_type(&argument.value_type)
        )));
    }

    if query_fields == 0 {
        return Err(render_error("merged schema has no Query fields"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_type_wrapping() {
        let ty = GraphType::list(GraphType::scalar(ScalarRef::Long, false));
        assert_eq!(
            graph_type(&ty),
            Type::ListType(Box::new(Type::NonNullType(Box::new(Type::NamedType(
                "Long".to_string()
            )))))
        );
    }

    #[test]
    fn test_check_schema_accepts_complete_document() {
        let sdl = r#"
scalar Long

type Widget {
  widgetId: Long!
  parts: [Part]
}

type Part {
  name: String
}

type Query {
  widget(widgetId: Long!): Widget
}
"#;
        check_schema(sdl).unwrap();
    }

    #[test]
    fn test_check_schema_rejects_undeclared_type() {
        let sdl = "type Query {\n  widget(widgetId: Long!): Widget\n}\n";
        let err = check_schema(sdl).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Long"));
        assert!(message.contains("Widget"));
    }

    #[test]
    fn test_check_schema_rejects_object_argument() {
        let sdl = r#"
type Widget {
  name: String
}

type Query {
  widgets: [Widget]
}

type Mutation {
  updateWidget(widget: Widget): Widget
}
"#;
        let err = check_schema(sdl).unwrap_err();
        assert!(matches!(err, GenerationError::Render { .. }));
        assert!(err.to_string().contains("Mutation.updateWidget"));
    }

    #[test]
    fn test_check_schema_requires_query_fields() {
        let mutations_only = r#"
type Widget {
  name: String
}

type Mutation {
  addWidget(name: String): Widget
}
"#;
        let err = check_schema(mutations_only).unwrap_err();
        assert!(err.to_string().contains("no Query fields"));
    }

    #[test]
    fn test_check_schema_rejects_empty_object_type() {
        let sdl = "type Part\n\ntype Query {\n  part: Part\n}\n";
        assert!(matches!(
            check_schema(sdl),
            Err(GenerationError::Render { .. })
        ));
    }

    #[test]
    fn test_check_schema_rejects_invalid_sdl() {
        assert!(matches!(
            check_schema("type Widget {"),
            Err(GenerationError::Render { .. })
        ));
    }
}
