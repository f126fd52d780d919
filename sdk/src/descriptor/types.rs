//! Descriptor types produced by introspection and consumed by the generators

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::config::OverwritePolicy;

/// Primitive value kinds of the source type vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    Int,
    Long,
    Double,
    Boolean,
}

/// A parameter, return or accessor type as written in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    /// `int`, `long`, `double`, `boolean`
    Primitive(Primitive),
    /// `Integer`, `Long`, `Double`, `Boolean`
    Boxed(Primitive),
    String,
    /// `T[]` or `List<T>`
    Array(Box<SourceType>),
    Void,
    /// Any other class name
    Named(String),
}

/// Raised for type strings that do not follow the catalog grammar
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid type syntax: '{0}'")]
pub struct TypeSyntaxError(pub String);

impl FromStr for SourceType {
    type Err = TypeSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(TypeSyntaxError(s.to_string()));
        }

        if let Some(inner) = text.strip_suffix("[]") {
            return Ok(Self::Array(Box::new(inner.parse()?)));
        }

        if let Some(rest) = text.strip_prefix("List<") {
            let inner = rest
                .strip_suffix('>')
                .ok_or_else(|| TypeSyntaxError(s.to_string()))?;
            return Ok(Self::Array(Box::new(inner.parse()?)));
        }

        let parsed = match text {
            "int" | "i32" => Self::Primitive(Primitive::Int),
            "long" | "i64" => Self::Primitive(Primitive::Long),
            "double" | "f64" => Self::Primitive(Primitive::Double),
            "boolean" | "bool" => Self::Primitive(Primitive::Boolean),
            "Integer" => Self::Boxed(Primitive::Int),
            "Long" => Self::Boxed(Primitive::Long),
            "Double" => Self::Boxed(Primitive::Double),
            "Boolean" => Self::Boxed(Primitive::Boolean),
            "String" => Self::String,
            "void" => Self::Void,
            name if is_identifier(name) => Self::Named(name.to_string()),
            _ => return Err(TypeSyntaxError(s.to_string())),
        };
        Ok(parsed)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

impl SourceType {
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(
            self,
            Self::Primitive(Primitive::Boolean) | Self::Boxed(Primitive::Boolean)
        )
    }

    /// Whether this is a single integral value usable as an identifier
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            Self::Primitive(Primitive::Int | Primitive::Long)
                | Self::Boxed(Primitive::Int | Primitive::Long)
        )
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(Primitive::Int) => write!(f, "int"),
            Self::Primitive(Primitive::Long) => write!(f, "long"),
            Self::Primitive(Primitive::Double) => write!(f, "double"),
            Self::Primitive(Primitive::Boolean) => write!(f, "boolean"),
            Self::Boxed(Primitive::Int) => write!(f, "Integer"),
            Self::Boxed(Primitive::Long) => write!(f, "Long"),
            Self::Boxed(Primitive::Double) => write!(f, "Double"),
            Self::Boxed(Primitive::Boolean) => write!(f, "Boolean"),
            Self::String => write!(f, "String"),
            Self::Array(inner) => write!(f, "{inner}[]"),
            Self::Void => write!(f, "void"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Scalars of the target query language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScalarRef {
    Int,
    Long,
    Float,
    Boolean,
    String,
}

impl ScalarRef {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int => "Int",
            Self::Long => "Long",
            Self::Float => "Float",
            Self::Boolean => "Boolean",
            Self::String => "String",
        }
    }

    /// Get the Rust type name for code generation
    pub fn rust_type(&self) -> &'static str {
        match self {
            Self::Int => "i32",
            Self::Long => "i64",
            Self::Float => "f64",
            Self::Boolean => "bool",
            Self::String => "String",
        }
    }

    /// Check if this is a custom scalar (not built into GraphQL)
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Long)
    }
}

impl fmt::Display for ScalarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape of a mapped type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphTypeKind {
    Scalar(ScalarRef),
    /// Reference to another entity, resolved by the set coordinator
    Entity(String),
    List(Box<GraphType>),
}

/// A type in the target query language
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphType {
    pub kind: GraphTypeKind,
    pub nullable: bool,
}

impl GraphType {
    pub fn scalar(scalar: ScalarRef, nullable: bool) -> Self {
        Self {
            kind: GraphTypeKind::Scalar(scalar),
            nullable,
        }
    }

    pub fn entity(name: impl Into<String>) -> Self {
        Self {
            kind: GraphTypeKind::Entity(name.into()),
            nullable: true,
        }
    }

    pub fn list(item: GraphType) -> Self {
        Self {
            kind: GraphTypeKind::List(Box::new(item)),
            nullable: true,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, GraphTypeKind::List(_))
    }

    /// Scalar at the leaf of this type, if any
    pub fn leaf_scalar(&self) -> Option<ScalarRef> {
        match &self.kind {
            GraphTypeKind::Scalar(s) => Some(*s),
            GraphTypeKind::List(inner) => inner.leaf_scalar(),
            GraphTypeKind::Entity(_) => None,
        }
    }

    /// Entity name at the leaf of this type, if any
    pub fn entity_ref(&self) -> Option<&str> {
        match &self.kind {
            GraphTypeKind::Entity(name) => Some(name),
            GraphTypeKind::List(inner) => inner.entity_ref(),
            GraphTypeKind::Scalar(_) => None,
        }
    }
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            GraphTypeKind::Scalar(s) => write!(f, "{s}")?,
            GraphTypeKind::Entity(name) => write!(f, "{name}")?,
            GraphTypeKind::List(inner) => write!(f, "[{inner}]")?,
        }
        if !self.nullable {
            write!(f, "!")?;
        }
        Ok(())
    }
}

/// CRUD-style operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Create,
    ReadOne,
    ReadAll,
    Update,
    Delete,
    CustomFinder,
}

impl MethodKind {
    pub const ALL: [MethodKind; 6] = [
        Self::Create,
        Self::ReadOne,
        Self::ReadAll,
        Self::Update,
        Self::Delete,
        Self::CustomFinder,
    ];

    /// Mutations change state; everything else is a query
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }

    /// Kinds that may be claimed by at most one method per entity
    pub fn is_unique(&self) -> bool {
        !matches!(self, Self::CustomFinder)
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::ReadOne => "read-one",
            Self::ReadAll => "read-all",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::CustomFinder => "custom-finder",
        };
        f.write_str(name)
    }
}

/// How a field was exposed on the entity class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessorKind {
    Getter,
    BooleanGetter,
}

/// One field of an entity, derived from its accessors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub accessor: String,
    pub accessor_kind: AccessorKind,
    pub source_type: SourceType,
    pub graph_type: GraphType,
}

impl FieldDescriptor {
    pub fn is_nullable(&self) -> bool {
        self.graph_type.nullable
    }
}

/// One parameter of a classified method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    pub source_type: SourceType,
    pub graph_type: GraphType,
}

/// Whether an operation targets one entity or a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Single,
    Collection,
}

/// A classified service operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub kind: MethodKind,
    pub method_name: String,
    pub operation_override: Option<String>,
    pub params: Vec<ParamDescriptor>,
    pub return_source: SourceType,
    pub returns: GraphType,
    pub target: Target,
    pub asynchronous: bool,
}

impl MethodDescriptor {
    /// Root field name, honouring the configured override
    pub fn root_field(&self, entity: &str) -> String {
        match &self.operation_override {
            Some(name) => name.clone(),
            None => super::naming::default_root_field(self.kind, entity, &self.method_name),
        }
    }

    pub fn returns_void(&self) -> bool {
        self.return_source == SourceType::Void
    }
}

/// Identifier of an entity, used to key its batch loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdDescriptor {
    pub name: String,
    pub scalar: ScalarRef,
}

/// Backing service of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRef {
    /// Catalog class name
    pub class: String,
    /// Rust path used by generated code
    pub path: String,
}

/// Normalized description of one entity, immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    name: String,
    service: ServiceRef,
    fields: Vec<FieldDescriptor>,
    methods: Vec<MethodDescriptor>,
    id: Option<IdDescriptor>,
    overwrite: OverwritePolicy,
    ignored_fields: BTreeSet<String>,
}

impl EntityDescriptor {
    pub fn new(
        name: impl Into<String>,
        service: ServiceRef,
        fields: Vec<FieldDescriptor>,
        methods: Vec<MethodDescriptor>,
        overwrite: OverwritePolicy,
        ignored_fields: BTreeSet<String>,
    ) -> Self {
        let name = name.into();
        let id = derive_id(&name, &fields, &methods);
        Self {
            name,
            service,
            fields,
            methods,
            id,
            overwrite,
            ignored_fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> &ServiceRef {
        &self.service
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    pub fn id(&self) -> Option<&IdDescriptor> {
        self.id.as_ref()
    }

    pub fn overwrite(&self) -> &OverwritePolicy {
        &self.overwrite
    }

    pub fn ignored_fields(&self) -> &BTreeSet<String> {
        &self.ignored_fields
    }

    pub fn method(&self, kind: MethodKind) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.kind == kind)
    }

    /// Every entity name referenced by fields, parameters or return types
    pub fn entity_refs(&self) -> BTreeSet<&str> {
        let field_refs = self.fields.iter().filter_map(|f| f.graph_type.entity_ref());
        let method_refs = self.methods.iter().flat_map(|m| {
            m.params
                .iter()
                .filter_map(|p| p.graph_type.entity_ref())
                .chain(m.returns.entity_ref())
        });
        field_refs.chain(method_refs).collect()
    }

    /// Every scalar used anywhere in the descriptor
    pub fn scalars(&self) -> BTreeSet<ScalarRef> {
        let field_scalars = self.fields.iter().filter_map(|f| f.graph_type.leaf_scalar());
        let method_scalars = self.methods.iter().flat_map(|m| {
            m.params
                .iter()
                .filter_map(|p| p.graph_type.leaf_scalar())
                .chain(m.returns.leaf_scalar())
        });
        field_scalars.chain(method_scalars).collect()
    }
}

/// The read-one parameter wins; otherwise an `id` or `<entity>Id` field
fn derive_id(
    entity: &str,
    fields: &[FieldDescriptor],
    methods: &[MethodDescriptor],
) -> Option<IdDescriptor> {
    let from_read_one = methods
        .iter()
        .find(|m| m.kind == MethodKind::ReadOne && m.params.len() == 1)
        .and_then(|m| {
            let param = &m.params[0];
            match param.graph_type.kind {
                GraphTypeKind::Scalar(s @ (ScalarRef::Int | ScalarRef::Long)) => Some(IdDescriptor {
                    name: param.name.clone(),
                    scalar: s,
                }),
                _ => None,
            }
        });

    from_read_one.or_else(|| {
        let entity_id = super::naming::id_field_name(entity);
        fields
            .iter()
            .find(|f| f.name == "id" || f.name == entity_id)
            .and_then(|f| match f.graph_type.kind {
                GraphTypeKind::Scalar(s @ (ScalarRef::Int | ScalarRef::Long)) => Some(IdDescriptor {
                    name: f.name.clone(),
                    scalar: s,
                }),
                _ => None,
            })
    })
}
