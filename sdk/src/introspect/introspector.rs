//! Builds an [`EntityDescriptor`] from the service catalog

use std::collections::HashSet;
use tracing::{debug, warn};

use super::classifier::{MethodClassifier, RawMethod};
use super::scalar::ScalarTypeMapper;
use crate::config::{EntityConfig, ModulePaths};
use crate::descriptor::naming::field_from_accessor;
use crate::descriptor::{
    AccessorKind, ClassDef, EntityDescriptor, FieldDescriptor, MemberDef, MethodDescriptor,
    MethodKind, ParamDescriptor, ServiceCatalog, ServiceRef, SourceType, Target,
};
use crate::error::GenerationError;

/// Descriptor plus the non-fatal findings made while building it
#[derive(Debug)]
pub struct Introspection {
    pub descriptor: EntityDescriptor,
    pub warnings: Vec<String>,
}

/// Reads one entity and its backing service out of the catalog
pub struct TypeIntrospector<'a> {
    catalog: &'a ServiceCatalog,
    mapper: &'a ScalarTypeMapper,
    modules: &'a ModulePaths,
}

/// Unparseable types are kept as named types so they surface as unmappable
fn parse_type(text: &str) -> SourceType {
    text.parse()
        .unwrap_or_else(|_| SourceType::Named(text.trim().to_string()))
}

impl<'a> TypeIntrospector<'a> {
    pub fn new(
        catalog: &'a ServiceCatalog,
        mapper: &'a ScalarTypeMapper,
        modules: &'a ModulePaths,
    ) -> Self {
        Self {
            catalog,
            mapper,
            modules,
        }
    }

    pub fn introspect(
        &self,
        entity: &str,
        config: &EntityConfig,
    ) -> Result<Introspection, GenerationError> {
        let service = self.service_ref(&config.service);

        let entity_class = self
            .catalog
            .class(entity)
            .ok_or_else(|| GenerationError::ClassNotFound {
                entity: entity.to_string(),
                class: entity.to_string(),
            })?;
        let service_class =
            self.catalog
                .class(&service.class)
                .ok_or_else(|| GenerationError::ClassNotFound {
                    entity: entity.to_string(),
                    class: service.class.clone(),
                })?;

        let mut warnings = Vec::new();
        let fields = self.fields(entity, entity_class, config, &mut warnings)?;
        let methods = self.methods(entity, service_class, config, &mut warnings)?;

        debug!(
            entity,
            fields = fields.len(),
            methods = methods.len(),
            "Introspected entity"
        );

        Ok(Introspection {
            descriptor: EntityDescriptor::new(
                entity,
                service,
                fields,
                methods,
                config.overwrite,
                config.ignored_fields.clone(),
            ),
            warnings,
        })
    }

    /// `WidgetService` resolves under the service module; a full path is kept as is
    fn service_ref(&self, service: &str) -> ServiceRef {
        match service.rsplit_once("::") {
            Some((_, class)) => ServiceRef {
                class: class.to_string(),
                path: service.to_string(),
            },
            None => ServiceRef {
                class: service.to_string(),
                path: format!("{}::{}", self.modules.service, service),
            },
        }
    }

    fn fields(
        &self,
        entity: &str,
        class: &ClassDef,
        config: &EntityConfig,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<FieldDescriptor>, GenerationError> {
        let mut fields = Vec::new();
        let mut seen = HashSet::new();

        for member in class.accessible_members() {
            let Some((name, accessor_kind)) = accessor_field(member) else {
                continue;
            };
            if !seen.insert(name.clone()) {
                debug!(entity, field = %name, accessor = %member.name, "Skipping duplicate accessor");
                continue;
            }

            let source_type = parse_type(&member.returns);
            let mapped = self.mapper.map(&source_type);

            if config.ignored_fields.contains(&name) {
                if mapped.is_err() {
                    warn!(entity, field = %name, ty = %member.returns, "Dropping ignored field with unmappable type");
                    warnings.push(format!(
                        "{entity}: dropped ignored field '{name}' of unmappable type '{}'",
                        member.returns
                    ));
                } else {
                    debug!(entity, field = %name, "Skipping ignored field");
                }
                continue;
            }

            let graph_type = mapped.map_err(|e| GenerationError::UnmappableType {
                entity: entity.to_string(),
                member: member.name.clone(),
                ty: e.0,
            })?;

            fields.push(FieldDescriptor {
                name,
                accessor: member.name.clone(),
                accessor_kind,
                source_type,
                graph_type,
            });
        }

        Ok(fields)
    }

    fn methods(
        &self,
        entity: &str,
        class: &ClassDef,
        config: &EntityConfig,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<MethodDescriptor>, GenerationError> {
        let raw: Vec<RawMethod> = class
            .accessible_members()
            .map(|member| {
                RawMethod::new(
                    member.name.clone(),
                    member
                        .params
                        .iter()
                        .map(|p| (p.name.clone(), parse_type(&p.ty)))
                        .collect(),
                    parse_type(&member.returns),
                )
            })
            .collect();

        if raw.is_empty() {
            return Err(GenerationError::Introspection {
                entity: entity.to_string(),
                reason: format!("service '{}' exposes no public operations", class.name),
            });
        }

        let classified = MethodClassifier::new(config).classify_all(entity, raw)?;
        warnings.extend(classified.warnings);

        if classified.methods.is_empty() {
            return Err(GenerationError::Introspection {
                entity: entity.to_string(),
                reason: format!("service '{}' has no classifiable operations", class.name),
            });
        }

        let mut methods = Vec::with_capacity(classified.methods.len());
        for (method, kind) in classified.methods {
            // object types are not valid GraphQL input types
            if let Some((param, ty)) = self.object_param(&method) {
                warn!(entity, method = %method.name, param = %param, ty = %ty, "Dropping operation with an entity-typed argument");
                warnings.push(format!(
                    "{entity}: dropped '{}', argument '{param}' has entity type '{ty}'",
                    method.name
                ));
                continue;
            }
            methods.push(self.describe_method(entity, method, kind, config)?);
        }

        if methods.is_empty() {
            return Err(GenerationError::Introspection {
                entity: entity.to_string(),
                reason: format!("service '{}' has no operations with mappable arguments", class.name),
            });
        }
        Ok(methods)
    }

    /// First parameter whose mapped type is (a list of) an entity
    fn object_param(&self, method: &RawMethod) -> Option<(String, String)> {
        method.params.iter().find_map(|(name, source_type)| {
            let graph_type = self.mapper.map(source_type).ok()?;
            graph_type
                .entity_ref()
                .map(|entity| (name.clone(), entity.to_string()))
        })
    }

    fn describe_method(
        &self,
        entity: &str,
        method: RawMethod,
        kind: MethodKind,
        config: &EntityConfig,
    ) -> Result<MethodDescriptor, GenerationError> {
        let unmappable = |ty: String| GenerationError::UnmappableType {
            entity: entity.to_string(),
            member: method.name.clone(),
            ty,
        };

        let params = method
            .params
            .iter()
            .map(|(name, source_type)| {
                let graph_type = self.mapper.map(source_type).map_err(|e| unmappable(e.0))?;
                Ok(ParamDescriptor {
                    name: name.clone(),
                    source_type: source_type.clone(),
                    graph_type,
                })
            })
            .collect::<Result<Vec<_>, GenerationError>>()?;

        let returns = self
            .mapper
            .map_return(&method.returns)
            .map_err(|e| unmappable(e.0))?;

        let target = if returns.is_list() {
            Target::Collection
        } else {
            Target::Single
        };

        Ok(MethodDescriptor {
            kind,
            operation_override: config.operation_names.get(&method.name).cloned(),
            params,
            return_source: method.returns.clone(),
            returns,
            target,
            asynchronous: kind == MethodKind::ReadOne,
            method_name: method.name,
        })
    }
}

/// Field name and accessor kind for zero-argument getters
fn accessor_field(member: &MemberDef) -> Option<(String, AccessorKind)> {
    if !member.params.is_empty() || member.name == "getClass" || member.returns == "void" {
        return None;
    }
    let name = field_from_accessor(&member.name)?;
    if member.name.starts_with("is") {
        let returns = parse_type(&member.returns);
        return returns
            .is_boolean()
            .then_some((name, AccessorKind::BooleanGetter));
    }
    Some((name, AccessorKind::Getter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MethodOverrides;
    use crate::descriptor::{GraphTypeKind, ScalarRef};

    fn catalog() -> ServiceCatalog {
        ServiceCatalog::new(vec![
            ClassDef::new("Widget")
                .member(MemberDef::new("getWidgetId", "long"))
                .member(MemberDef::new("getName", "String"))
                .member(MemberDef::new("isActive", "boolean"))
                .member(MemberDef::new("isTemplate", "String"))
                .member(MemberDef::new("getTags", "String[]"))
                .member(MemberDef::new("getOwner", "User"))
                .member(MemberDef::new("getCreateDate", "Date"))
                .member(MemberDef::new("getClass", "Class")),
            ClassDef::new("WidgetService")
                .member(MemberDef::new("getWidget", "Widget").param("widgetId", "long"))
                .member(MemberDef::new("getWidgets", "List<Widget>"))
                .member(MemberDef::new("addWidget", "Widget").param("name", "String"))
                .member(MemberDef::new("deleteWidget", "void").param("widgetId", "long"))
                .member(MemberDef::new("reindex", "void")),
            ClassDef::new("User"),
            ClassDef::new("EmptyService"),
        ])
        .unwrap()
    }

    fn config() -> EntityConfig {
        EntityConfig {
            ignored_fields: ["createDate".to_string()].into_iter().collect(),
            ..EntityConfig::new("WidgetService")
        }
    }

    fn mapper(catalog: &ServiceCatalog) -> ScalarTypeMapper {
        ScalarTypeMapper::new(catalog.class_names())
    }

    #[test]
    fn test_introspect_entity() {
        let catalog = catalog();
        let mapper = mapper(&catalog);
        let modules = ModulePaths::default();
        let introspector = TypeIntrospector::new(&catalog, &mapper, &modules);

        let result = introspector.introspect("Widget", &config()).unwrap();
        let descriptor = result.descriptor;

        let fields: Vec<_> = descriptor.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["widgetId", "name", "active", "tags", "owner"]);
        assert_eq!(descriptor.fields()[2].accessor_kind, AccessorKind::BooleanGetter);
        assert!(!descriptor.fields()[0].is_nullable());
        assert!(descriptor.fields()[1].is_nullable());

        let kinds: Vec<_> = descriptor.methods().iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MethodKind::ReadOne,
                MethodKind::ReadAll,
                MethodKind::Create,
                MethodKind::Delete
            ]
        );

        let read_one = descriptor.method(MethodKind::ReadOne).unwrap();
        assert!(read_one.asynchronous);
        assert_eq!(read_one.target, Target::Single);
        assert!(!descriptor.method(MethodKind::ReadAll).unwrap().asynchronous);
        assert_eq!(descriptor.method(MethodKind::ReadAll).unwrap().target, Target::Collection);

        let id = descriptor.id().unwrap();
        assert_eq!(id.name, "widgetId");
        assert_eq!(id.scalar, ScalarRef::Long);

        assert_eq!(descriptor.service().path, "crate::service::WidgetService");
        assert!(descriptor.entity_refs().contains("User"));
        // ignored createDate plus the unclassified reindex
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_missing_classes() {
        let catalog = catalog();
        let mapper = mapper(&catalog);
        let modules = ModulePaths::default();
        let introspector = TypeIntrospector::new(&catalog, &mapper, &modules);

        let err = introspector.introspect("Gadget", &config()).unwrap_err();
        assert!(matches!(err, GenerationError::ClassNotFound { ref class, .. } if class == "Gadget"));

        let err = introspector
            .introspect("Widget", &EntityConfig::new("GadgetService"))
            .unwrap_err();
        assert!(matches!(err, GenerationError::ClassNotFound { ref class, .. } if class == "GadgetService"));
    }

    #[test]
    fn test_no_operations() {
        let catalog = catalog();
        let mapper = mapper(&catalog);
        let modules = ModulePaths::default();
        let introspector = TypeIntrospector::new(&catalog, &mapper, &modules);

        let config = EntityConfig {
            ignored_fields: config().ignored_fields,
            ..EntityConfig::new("EmptyService")
        };
        let err = introspector.introspect("Widget", &config).unwrap_err();
        assert!(matches!(err, GenerationError::Introspection { .. }));
    }

    #[test]
    fn test_unmappable_field_aborts_entity() {
        let catalog = catalog();
        let mapper = mapper(&catalog);
        let modules = ModulePaths::default();
        let introspector = TypeIntrospector::new(&catalog, &mapper, &modules);

        let err = introspector
            .introspect("Widget", &EntityConfig::new("WidgetService"))
            .unwrap_err();
        match err {
            GenerationError::UnmappableType { member, ty, .. } => {
                assert_eq!(member, "getCreateDate");
                assert_eq!(ty, "Date");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_operation_name_override() {
        let catalog = catalog();
        let mapper = mapper(&catalog);
        let modules = ModulePaths::default();
        let introspector = TypeIntrospector::new(&catalog, &mapper, &modules);

        let mut config = config();
        config
            .operation_names
            .insert("getWidgets".to_string(), "allWidgets".to_string());
        config.methods = MethodOverrides::default();

        let descriptor = introspector.introspect("Widget", &config).unwrap().descriptor;
        let read_all = descriptor.method(MethodKind::ReadAll).unwrap();
        assert_eq!(read_all.root_field("Widget"), "allWidgets");
        assert_eq!(descriptor.method(MethodKind::ReadOne).unwrap().root_field("Widget"), "widget");
    }

    #[test]
    fn test_entity_argument_drops_operation() {
        let catalog = ServiceCatalog::new(vec![
            ClassDef::new("Widget").member(MemberDef::new("getWidgetId", "long")),
            ClassDef::new("WidgetService")
                .member(MemberDef::new("getWidget", "Widget").param("widgetId", "long"))
                .member(MemberDef::new("updateWidget", "Widget").param("widget", "Widget"))
                .member(MemberDef::new("addWidgets", "List<Widget>").param("widgets", "List<Widget>")),
            ClassDef::new("BulkService")
                .member(MemberDef::new("updateWidget", "Widget").param("widget", "Widget")),
        ])
        .unwrap();
        let mapper = mapper(&catalog);
        let modules = ModulePaths::default();
        let introspector = TypeIntrospector::new(&catalog, &mapper, &modules);

        let result = introspector
            .introspect("Widget", &EntityConfig::new("WidgetService"))
            .unwrap();
        let names: Vec<_> = result
            .descriptor
            .methods()
            .iter()
            .map(|m| m.method_name.as_str())
            .collect();
        assert_eq!(names, vec!["getWidget"]);
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].contains("argument 'widget' has entity type 'Widget'"));

        let err = introspector
            .introspect("Widget", &EntityConfig::new("BulkService"))
            .unwrap_err();
        assert!(matches!(err, GenerationError::Introspection { .. }));
    }

    #[test]
    fn test_full_service_path() {
        let catalog = catalog();
        let mapper = mapper(&catalog);
        let modules = ModulePaths::default();
        let introspector = TypeIntrospector::new(&catalog, &mapper, &modules);

        let config = EntityConfig {
            ignored_fields: config().ignored_fields,
            ..EntityConfig::new("my_app::services::WidgetService")
        };
        let descriptor = introspector.introspect("Widget", &config).unwrap().descriptor;
        assert_eq!(descriptor.service().class, "WidgetService");
        assert_eq!(descriptor.service().path, "my_app::services::WidgetService");

        let delete = descriptor.method(MethodKind::Delete).unwrap();
        assert!(delete.returns_void());
        assert!(matches!(delete.returns.kind, GraphTypeKind::Scalar(ScalarRef::Boolean)));
    }
}
