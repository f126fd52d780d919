//! Per-entity artifacts: schema fragment, operation contract, implementation stub
//! and batch loader
//!
//! Everything is rendered from the descriptor alone, in discovery order, so the
//! same descriptor always yields the same bytes. Rust artifacts are built with
//! `rust_codegen`; attributes on traits and impl blocks are prepended as raw
//! text since the builder has no notion of them.

use rust_codegen::{Field, Function, Impl, Scope, Struct, Trait, Type};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::schema_gen;
use super::{Artifact, ArtifactCategory};
use crate::config::GeneratorConfig;
use crate::descriptor::naming::{constant_name, id_field_name, module_name, snake};
use crate::descriptor::{
    EntityDescriptor, GraphType, GraphTypeKind, IdDescriptor, MethodDescriptor, MethodKind,
    ScalarRef,
};

const GENERATED_NOTICE: &str = "// This file is auto-generated. Do not edit manually.";
const STUB_NOTICE: &str = "// Generated as a starting point. Edits are kept unless overwrite is enabled.";

const RUST_KEYWORDS: [&str; 50] = [
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield", "union", "macro_rules",
];

/// Snake-case Rust identifier, escaping keywords
pub(crate) fn rust_ident(name: &str) -> String {
    let ident = snake(name);
    match ident.as_str() {
        "self" | "super" | "crate" | "ctx" => format!("{ident}_"),
        other if RUST_KEYWORDS.contains(&other) => format!("r#{ident}"),
        _ => ident,
    }
}

/// Rust spelling of a query-language type, entities by their bare model name
pub(crate) fn rust_type(ty: &GraphType) -> String {
    let inner = match &ty.kind {
        GraphTypeKind::Scalar(scalar) => scalar.rust_type().to_string(),
        GraphTypeKind::Entity(name) => name.clone(),
        GraphTypeKind::List(item) => format!("Vec<{}>", rust_type(item)),
    };
    if ty.nullable {
        format!("Option<{inner}>")
    } else {
        inner
    }
}

pub(crate) fn contract_module(entity: &str) -> String {
    format!("{}_resolver", module_name(entity))
}

pub(crate) fn implementation_module(entity: &str) -> String {
    format!("{}_resolver_impl", module_name(entity))
}

pub(crate) fn loader_module(entity: &str) -> String {
    format!("{}_loader", module_name(entity))
}

pub(crate) fn resolver_trait(entity: &str) -> String {
    format!("{entity}Resolver")
}

pub(crate) fn resolver_impl(entity: &str) -> String {
    format!("{entity}ResolverImpl")
}

pub(crate) fn batch_loader(entity: &str) -> String {
    format!("{entity}BatchLoader")
}

pub(crate) fn loader_key(entity: &str) -> String {
    format!("{}_LOADER_KEY", constant_name(entity))
}

/// `crate::service::WidgetService` -> (`crate::service`, `WidgetService`)
pub(crate) fn split_path(path: &str) -> (Option<&str>, &str) {
    match path.rsplit_once("::") {
        Some((module, name)) if !module.is_empty() => (Some(module), name),
        Some((_, name)) => (None, name),
        None => (None, path),
    }
}

/// How a batch loader reaches the backing service
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Fetch {
    /// One read-all call taking the whole chunk of ids
    Batch {
        method: String,
        keys_nullable: bool,
        accessor: String,
        accessor_nullable: bool,
    },
    /// One read-one call per id of the chunk
    PerId { method: String, param_nullable: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoaderPlan {
    pub id: IdDescriptor,
    pub fetch: Fetch,
}

fn returns_entity(method: &MethodDescriptor, entity: &str) -> bool {
    method.returns.entity_ref() == Some(entity)
}

/// Read-one methods that can be answered by the entity's batch loader
fn loads_by_id(entity: &EntityDescriptor, method: &MethodDescriptor) -> bool {
    let Some(id) = entity.id() else {
        return false;
    };
    method.kind == MethodKind::ReadOne
        && matches!(method.params.as_slice(), [param] if param.graph_type.kind == GraphTypeKind::Scalar(id.scalar))
        && !method.returns.is_list()
        && returns_entity(method, entity.name())
}

pub(crate) fn loader_plan(entity: &EntityDescriptor) -> Option<LoaderPlan> {
    let id = entity.id()?.clone();
    let id_scalar = GraphTypeKind::Scalar(id.scalar);

    let batch = entity.method(MethodKind::ReadAll).and_then(|method| {
        let [param] = method.params.as_slice() else {
            return None;
        };
        let GraphTypeKind::List(item) = &param.graph_type.kind else {
            return None;
        };
        if item.kind != id_scalar || !method.returns.is_list() || !returns_entity(method, entity.name()) {
            return None;
        }
        let conventional = id_field_name(entity.name());
        let field = entity.fields().iter().find(|f| {
            f.graph_type.kind == id_scalar
                && (f.name == id.name || f.name == "id" || f.name == conventional)
        })?;
        Some(Fetch::Batch {
            method: rust_ident(&method.method_name),
            keys_nullable: item.nullable,
            accessor: rust_ident(&field.accessor),
            accessor_nullable: field.graph_type.nullable,
        })
    });

    let fetch = batch.or_else(|| {
        let method = entity.method(MethodKind::ReadOne)?;
        loads_by_id(entity, method).then(|| Fetch::PerId {
            method: rust_ident(&method.method_name),
            param_nullable: method.params[0].graph_type.nullable,
        })
    })?;

    Some(LoaderPlan { id, fetch })
}

/// Entity names used by operation signatures
fn operation_entities(entity: &EntityDescriptor) -> BTreeSet<&str> {
    entity
        .methods()
        .iter()
        .flat_map(|m| {
            m.params
                .iter()
                .filter_map(|p| p.graph_type.entity_ref())
                .chain(m.returns.entity_ref())
        })
        .collect()
}

fn operation_doc(entity: &EntityDescriptor, method: &MethodDescriptor) -> String {
    let root = if method.kind.is_mutation() { "Mutation" } else { "Query" };
    format!(
        "{root} field `{}` ({}), served by `{}`",
        method.root_field(entity.name()),
        method.kind,
        method.method_name
    )
}

fn render(header: &[&str], scope: &Scope) -> String {
    let mut out = header.join("\n");
    out.push_str("\n\n");
    out.push_str(&scope.to_string());
    out.push('\n');
    out
}

fn attributed(attribute: &str, item: &Scope) -> String {
    format!("{attribute}\n{}", item.to_string())
}

/// Rendered artifacts of one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityArtifacts {
    pub entity: String,
    pub artifacts: Vec<Artifact>,
    pub warnings: Vec<String>,
}

/// Renders the per-entity artifacts from one descriptor
pub struct ArtifactGenerator<'a> {
    config: &'a GeneratorConfig,
}

impl<'a> ArtifactGenerator<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn generate(&self, entity: &EntityDescriptor) -> EntityArtifacts {
        let plan = loader_plan(entity);
        let mut artifacts = vec![
            self.schema_fragment(entity),
            self.contract(entity),
            self.implementation(entity, plan.as_ref()),
        ];
        let mut warnings = Vec::new();

        match &plan {
            Some(plan) => artifacts.push(self.loader(entity, plan)),
            None => {
                warn!(entity = entity.name(), "No id-keyed read operation, skipping batch loader");
                warnings.push(format!(
                    "{}: no identifier with an id-keyed read operation, batch loader not generated",
                    entity.name()
                ));
            }
        }

        debug!(entity = entity.name(), artifacts = artifacts.len(), "Rendered entity artifacts");
        EntityArtifacts {
            entity: entity.name().to_string(),
            artifacts,
            warnings,
        }
    }

    pub fn schema_fragment(&self, entity: &EntityDescriptor) -> Artifact {
        let path = self
            .config
            .dir(ArtifactCategory::Schema)
            .join(format!("{}.graphql", module_name(entity.name())));
        let contents = format!(
            "# Generated schema fragment: {}\n# This file is auto-generated. Do not edit manually.\n\n{}",
            entity.name(),
            schema_gen::fragment(entity)
        );
        Artifact::new(ArtifactCategory::Schema, path, contents)
    }

    pub fn contract(&self, entity: &EntityDescriptor) -> Artifact {
        let sdk = &self.config.modules.sdk;
        let mut scope = Scope::new();
        scope.import(sdk, "async_trait");
        scope.import(&format!("{sdk}::engine"), "FieldResult");
        scope.import(&format!("{sdk}::runtime"), "RequestContext");
        for name in operation_entities(entity) {
            scope.import(&self.config.modules.model, name);
        }

        let mut contract = Trait::new(&resolver_trait(entity.name()));
        contract
            .vis("pub")
            .parent("Send + Sync")
            .doc(&format!("Operations exposed for `{}`", entity.name()));

        for method in entity.methods() {
            let function = contract.new_fn(&rust_ident(&method.root_field(entity.name())));
            function
                .doc(&operation_doc(entity, method))
                .set_async(method.asynchronous)
                .arg_ref_self()
                .arg("ctx", "&RequestContext");
            for param in &method.params {
                function.arg(&rust_ident(&param.name), &rust_type(&param.graph_type));
            }
            function.ret(&format!("FieldResult<{}>", rust_type(&method.returns)));
        }

        let mut item = Scope::new();
        item.push_trait(contract);
        scope.raw(&attributed("#[async_trait]", &item));

        let title = format!("//! Generated operation contract: {}", entity.name());
        let path = self
            .config
            .dir(ArtifactCategory::Contract)
            .join(format!("{}.rs", contract_module(entity.name())));
        Artifact::new(ArtifactCategory::Contract, path, render(&[title.as_str(), GENERATED_NOTICE], &scope))
    }

    pub(crate) fn implementation(&self, entity: &EntityDescriptor, plan: Option<&LoaderPlan>) -> Artifact {
        let modules = &self.config.modules;
        let sdk = &modules.sdk;
        let name = entity.name();
        let (service_module, service_class) = split_path(&entity.service().path);
        let via_loader = |method: &MethodDescriptor| plan.is_some() && loads_by_id(entity, method);
        let any_loader = entity.methods().iter().any(|m| via_loader(m));
        let any_service = entity.methods().iter().any(|m| !via_loader(m));

        let mut scope = Scope::new();
        scope.import("std::sync", "Arc");
        scope.import(sdk, "async_trait");
        if any_service {
            scope.import(&format!("{sdk}::engine"), "FieldError");
        }
        scope.import(&format!("{sdk}::engine"), "FieldResult");
        scope.import(&format!("{sdk}::runtime"), "RequestContext");
        for model in operation_entities(entity) {
            scope.import(&modules.model, model);
        }
        if let Some(module) = service_module {
            scope.import(module, service_class);
        }
        scope.import(
            &format!("{}::{}", modules.contract, contract_module(name)),
            &resolver_trait(name),
        );
        if any_loader {
            scope.import(
                &format!("{}::{}", modules.loader, loader_module(name)),
                &loader_key(name),
            );
        }

        let impl_name = resolver_impl(name);
        let service_type = format!("Arc<{service_class}>");
        push_service_struct(
            &mut scope,
            &impl_name,
            &format!("Resolves `{name}` operations against `{service_class}`"),
            &service_type,
        );

        let mut resolver = Impl::new(&impl_name);
        resolver.impl_trait(&resolver_trait(name));
        for method in entity.methods() {
            let loader = via_loader(method);
            let mut function = Function::new(&rust_ident(&method.root_field(name)));
            function
                .set_async(method.asynchronous)
                .arg_ref_self()
                .arg(if loader { "ctx" } else { "_ctx" }, "&RequestContext");
            for param in &method.params {
                function.arg(&rust_ident(&param.name), &rust_type(&param.graph_type));
            }
            function.ret(&format!("FieldResult<{}>", rust_type(&method.returns)));

            let body = if loader {
                load_body(name, method)
            } else {
                service_body(method)
            };
            for line in body {
                function.line(&line);
            }
            resolver.push_fn(function);
        }

        let mut item = Scope::new();
        item.push_impl(resolver);
        scope.raw(&attributed("#[async_trait]", &item));

        let title = format!("//! Operation implementation: {name}");
        let path = self
            .config
            .dir(ArtifactCategory::Implementation)
            .join(format!("{}.rs", implementation_module(name)));
        Artifact::new(ArtifactCategory::Implementation, path, render(&[title.as_str(), STUB_NOTICE], &scope))
    }

    pub(crate) fn loader(&self, entity: &EntityDescriptor, plan: &LoaderPlan) -> Artifact {
        let modules = &self.config.modules;
        let sdk = &modules.sdk;
        let name = entity.name();
        let (service_module, service_class) = split_path(&entity.service().path);

        let mut scope = Scope::new();
        scope.import("std::collections", "HashMap");
        scope.import("std::sync", "Arc");
        scope.import(sdk, "async_trait");
        scope.import(&format!("{sdk}::runtime"), "BatchLoader");
        scope.import(&format!("{sdk}::runtime"), "BatchResult");
        scope.import(&format!("{sdk}::runtime"), "LoadError");
        scope.import(&modules.model, name);
        if let Some(module) = service_module {
            scope.import(module, service_class);
        }

        scope.raw(&format!(
            "/// Registry key of the `{name}` batch loader\npub const {}: &str = \"{name}\";",
            loader_key(name)
        ));

        let loader_name = batch_loader(name);
        let service_type = format!("Arc<{service_class}>");
        push_service_struct(
            &mut scope,
            &loader_name,
            &format!("Loads `{name}` values by `{}`, many ids per call", plan.id.name),
            &service_type,
        );

        let mut load = Function::new("load");
        load.set_async(true)
            .arg_ref_self()
            .arg("ids", "&[i64]")
            .ret(&format!("BatchResult<{name}>"));
        for line in fetch_body(plan) {
            load.line(&line);
        }

        let mut batch = Impl::new(&loader_name);
        batch
            .impl_trait("BatchLoader")
            .associate_type("Value", name)
            .push_fn(load);

        let mut item = Scope::new();
        item.push_impl(batch);
        scope.raw(&attributed("#[async_trait]", &item));

        let title = format!("//! Generated batch loader: {name}");
        let path = self
            .config
            .dir(ArtifactCategory::Loader)
            .join(format!("{}.rs", loader_module(name)));
        Artifact::new(ArtifactCategory::Loader, path, render(&[title.as_str(), GENERATED_NOTICE], &scope))
    }
}

/// `pub struct X { service: Arc<S> }` plus its constructor
fn push_service_struct(scope: &mut Scope, name: &str, doc: &str, service_type: &str) {
    let mut holder = Struct::new(name);
    holder.vis("pub").doc(doc);
    holder.push_field(Field {
        name: "service".to_string(),
        ty: Type::new(service_type),
        documentation: vec![],
        annotation: vec![],
    });
    scope.push_struct(holder);

    let mut constructor = Function::new("new");
    constructor
        .vis("pub")
        .arg("service", service_type)
        .ret("Self")
        .line("Self { service }");
    let mut inherent = Impl::new(name);
    inherent.push_fn(constructor);
    scope.push_impl(inherent);
}

fn load_body(entity: &str, method: &MethodDescriptor) -> Vec<String> {
    let param = rust_ident(&method.params[0].name);
    let load = |id: &str| format!("ctx.load::<{entity}>({}, i64::from({id})).await?", loader_key(entity));
    if method.params[0].graph_type.nullable {
        vec![
            format!("match {param} {{"),
            format!("    Some(id) => Ok({}),", load("id")),
            "    None => Ok(None),".to_string(),
            "}".to_string(),
        ]
    } else {
        vec![format!("Ok({})", load(&param))]
    }
}

fn service_body(method: &MethodDescriptor) -> Vec<String> {
    let args: Vec<String> = method.params.iter().map(|p| rust_ident(&p.name)).collect();
    let call = format!(
        "self.service.{}({})",
        rust_ident(&method.method_name),
        args.join(", ")
    );
    if method.returns_void() {
        vec![
            format!("{call}.map_err(FieldError::service)?;"),
            "Ok(true)".to_string(),
        ]
    } else {
        vec![format!("{call}.map_err(FieldError::service)")]
    }
}

fn fetch_body(plan: &LoaderPlan) -> Vec<String> {
    let narrow = plan.id.scalar == ScalarRef::Int;
    let mut lines = Vec::new();

    match &plan.fetch {
        Fetch::Batch {
            method,
            keys_nullable,
            accessor,
            accessor_nullable,
        } => {
            if narrow {
                lines.push(
                    "let keys = ids.iter().map(|id| i32::try_from(*id)).collect::<Result<Vec<_>, _>>().map_err(LoadError::failed)?;"
                        .to_string(),
                );
            } else {
                lines.push("let keys = ids.to_vec();".to_string());
            }
            let keys = if *keys_nullable {
                "Some(keys.into_iter().map(Some).collect())"
            } else {
                "Some(keys)"
            };
            lines.push(format!(
                "let items = self.service.{method}({keys}).map_err(LoadError::failed)?;"
            ));
            lines.push("let mut found = HashMap::with_capacity(ids.len());".to_string());
            lines.push("for item in items.into_iter().flatten().flatten() {".to_string());
            if *accessor_nullable {
                lines.push(format!("    if let Some(id) = item.{accessor}() {{"));
                lines.push("        found.insert(i64::from(id), Ok(item));".to_string());
                lines.push("    }".to_string());
            } else {
                lines.push(format!("    found.insert(i64::from(item.{accessor}()), Ok(item));"));
            }
            lines.push("}".to_string());
        }
        Fetch::PerId {
            method,
            param_nullable,
        } => {
            lines.push("let mut found = HashMap::with_capacity(ids.len());".to_string());
            lines.push("for id in ids {".to_string());
            if narrow {
                lines.extend(
                    [
                        "    let key = match i32::try_from(*id) {",
                        "        Ok(key) => key,",
                        "        Err(e) => {",
                        "            found.insert(*id, Err(LoadError::failed(e)));",
                        "            continue;",
                        "        }",
                        "    };",
                    ]
                    .map(String::from),
                );
            } else {
                lines.push("    let key = *id;".to_string());
            }
            let key = if *param_nullable { "Some(key)" } else { "key" };
            lines.push(format!("    match self.service.{method}({key}) {{"));
            lines.extend(
                [
                    "        Ok(Some(value)) => {",
                    "            found.insert(*id, Ok(value));",
                    "        }",
                    "        Ok(None) => {}",
                    "        Err(e) => {",
                    "            found.insert(*id, Err(LoadError::failed(e)));",
                    "        }",
                    "    }",
                    "}",
                ]
                .map(String::from),
            );
        }
    }

    lines.push("Ok(found)".to_string());
    lines
}
