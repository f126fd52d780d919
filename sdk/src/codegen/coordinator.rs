//! Cross-entity aggregation
//!
//! Runs only after every entity rendered successfully. Resolves pending entity
//! references, checks root field uniqueness and renders the merged schema, the
//! loader registry wiring, the engine wiring and one `mod.rs` per Rust output
//! directory. Nothing here touches the filesystem; the generator writes the result
//! only when the whole set rendered.

use rust_codegen::{Function, Impl, Scope, Struct};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{debug, info};

use super::artifacts::{
    batch_loader, contract_module, implementation_module, loader_key, loader_module, loader_plan,
    resolver_impl, resolver_trait, split_path,
};
use super::schema_gen;
use super::{Artifact, ArtifactCategory};
use crate::config::GeneratorConfig;
use crate::descriptor::naming::module_name;
use crate::descriptor::{EntityDescriptor, MethodKind};
use crate::error::GenerationError;

const GENERATED_NOTICE: &str = "// This file is auto-generated. Do not edit manually.";

pub const MERGED_SCHEMA_FILE: &str = "schema.graphql";
pub const REGISTRY_FILE: &str = "registry.rs";
pub const ENGINE_FILE: &str = "engine.rs";

fn variant(kind: MethodKind) -> &'static str {
    match kind {
        MethodKind::Create => "Create",
        MethodKind::ReadOne => "ReadOne",
        MethodKind::ReadAll => "ReadAll",
        MethodKind::Update => "Update",
        MethodKind::Delete => "Delete",
        MethodKind::CustomFinder => "CustomFinder",
    }
}

pub struct SetCoordinator<'a> {
    config: &'a GeneratorConfig,
}

impl<'a> SetCoordinator<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self { config }
    }

    /// Render every aggregate artifact, or fail without producing any
    pub fn coordinate(&self, entities: &[EntityDescriptor]) -> Result<Vec<Artifact>, GenerationError> {
        self.resolve_references(entities)?;
        self.check_root_fields(entities)?;

        let mut artifacts = vec![
            self.merged_schema(entities)?,
            self.registry(entities),
            self.engine(entities),
        ];
        let modules = self.module_indexes(entities);
        artifacts.extend(modules);

        info!(
            entities = entities.len(),
            artifacts = artifacts.len(),
            "Rendered aggregate artifacts"
        );
        Ok(artifacts)
    }

    /// Every pending entity reference must name an entity of this run
    pub fn resolve_references(&self, entities: &[EntityDescriptor]) -> Result<(), GenerationError> {
        let known: BTreeSet<&str> = entities.iter().map(EntityDescriptor::name).collect();
        for entity in entities {
            if let Some(target) = entity.entity_refs().into_iter().find(|r| !known.contains(r)) {
                return Err(GenerationError::DanglingReference {
                    entity: entity.name().to_string(),
                    target: target.to_string(),
                });
            }
        }
        debug!(entities = known.len(), "Entity references resolved");
        Ok(())
    }

    /// Root field names must be unique within `Query` and within `Mutation`
    pub fn check_root_fields(&self, entities: &[EntityDescriptor]) -> Result<(), GenerationError> {
        let mut owners: BTreeMap<(&'static str, String), Vec<String>> = BTreeMap::new();
        for entity in entities {
            for method in entity.methods() {
                let root = if method.kind.is_mutation() { "Mutation" } else { "Query" };
                owners
                    .entry((root, method.root_field(entity.name())))
                    .or_default()
                    .push(entity.name().to_string());
            }
        }

        match owners.into_iter().find(|(_, declared_by)| declared_by.len() > 1) {
            Some(((root, field), declared_by)) => Err(GenerationError::DuplicateRootField {
                field,
                root,
                entities: declared_by,
            }),
            None => Ok(()),
        }
    }

    fn merged_schema(&self, entities: &[EntityDescriptor]) -> Result<Artifact, GenerationError> {
        let mut queries = Vec::new();
        let mut mutations = Vec::new();
        for entity in entities {
            let (q, m) = schema_gen::root_fields(entity);
            queries.extend(q);
            mutations.extend(m);
        }

        let document = schema_gen::merged(entities, queries, mutations);
        let contents = format!(
            "# Generated merged schema\n# This file is auto-generated. Do not edit manually.\n\n{document}"
        );
        schema_gen::check_schema(&contents)?;

        Ok(Artifact::aggregate(
            ArtifactCategory::Schema,
            self.config.dir(ArtifactCategory::Schema).join(MERGED_SCHEMA_FILE),
            contents,
        ))
    }

    fn registry(&self, entities: &[EntityDescriptor]) -> Artifact {
        let modules = &self.config.modules;
        let sdk = &modules.sdk;
        let loaded: Vec<&EntityDescriptor> = entities
            .iter()
            .filter(|entity| loader_plan(entity).is_some())
            .collect();

        let mut scope = Scope::new();
        if !loaded.is_empty() {
            scope.import("std::sync", "Arc");
        }
        scope.import("std::time", "Duration");
        for name in ["BatchingRuntime", "LoaderOptions", "LoaderRegistry", "RuntimeError"] {
            scope.import(&format!("{sdk}::runtime"), name);
        }
        scope.import(&format!("{}::engine", modules.contract), "ServiceSet");
        for entity in &loaded {
            let path = format!("{}::{}", modules.loader, loader_module(entity.name()));
            scope.import(&path, &batch_loader(entity.name()));
            scope.import(&path, &loader_key(entity.name()));
        }

        let keys: Vec<String> = loaded.iter().map(|e| loader_key(e.name())).collect();
        scope.raw(&format!(
            "/// Registry keys of every generated loader\npub const LOADER_KEYS: &[&str] = &[{}];",
            keys.join(", ")
        ));

        let settings = self.config.loader.to_options();
        let mut options = Function::new("loader_options");
        options
            .doc("Batch loader options the generator was configured with")
            .vis("pub")
            .ret("LoaderOptions")
            .line("LoaderOptions {")
            .line(&format!("    max_batch_size: {},", settings.max_batch_size))
            .line(&format!(
                "    cache_ttl: Duration::from_millis({}),",
                settings.cache_ttl.as_millis()
            ))
            .line(&format!("    cache_max_size: {},", settings.cache_max_size))
            .line("}");
        scope.push_fn(options);

        let mut build = Function::new("build_registry");
        build
            .doc("Register one batch loader per entity under its stable key")
            .vis("pub")
            .arg(if loaded.is_empty() { "_services" } else { "services" }, "&ServiceSet")
            .ret("Result<LoaderRegistry, RuntimeError>");
        if loaded.is_empty() {
            build.line("Ok(LoaderRegistry::new())");
        } else {
            build.line("let mut registry = LoaderRegistry::new();");
            for entity in &loaded {
                build.line(&format!(
                    "registry.register({}, {}::new(Arc::clone(&services.{})))?;",
                    loader_key(entity.name()),
                    batch_loader(entity.name()),
                    module_name(entity.name())
                ));
            }
            build.line("Ok(registry)");
        }
        scope.push_fn(build);

        let mut runtime = Function::new("build_runtime");
        runtime
            .vis("pub")
            .arg("services", "&ServiceSet")
            .ret("Result<BatchingRuntime, RuntimeError>")
            .line("Ok(BatchingRuntime::new(build_registry(services)?, loader_options()))");
        scope.push_fn(runtime);

        Artifact::aggregate(
            ArtifactCategory::Loader,
            self.config.dir(ArtifactCategory::Loader).join(REGISTRY_FILE),
            render("//! Generated loader registry wiring", &scope),
        )
    }

    fn engine(&self, entities: &[EntityDescriptor]) -> Artifact {
        let modules = &self.config.modules;
        let sdk = &modules.sdk;

        let mut scope = Scope::new();
        scope.import("std::sync", "Arc");
        scope.import(&format!("{sdk}::descriptor"), "MethodKind");
        scope.import(&format!("{sdk}::engine"), "RootField");
        for entity in entities {
            let name = entity.name();
            if let (Some(module), class) = split_path(&entity.service().path) {
                scope.import(module, class);
            }
            scope.import(
                &format!("{}::{}", modules.contract, contract_module(name)),
                &resolver_trait(name),
            );
            scope.import(
                &format!("{}::{}", modules.implementation, implementation_module(name)),
                &resolver_impl(name),
            );
        }

        let mut services = Struct::new("ServiceSet");
        services.vis("pub").doc("Backing services of every generated entity");
        let mut bindings = Struct::new("Bindings");
        bindings
            .vis("pub")
            .doc("Operation contracts bound to their implementations");
        let mut new_bindings = Function::new("new");
        new_bindings
            .vis("pub")
            .arg("services", "&ServiceSet")
            .ret("Self")
            .line("Self {");

        for entity in entities {
            let name = entity.name();
            let field = module_name(name);
            let (_, class) = split_path(&entity.service().path);
            services.field(&format!("pub {field}"), &format!("Arc<{class}>"));
            bindings.field(
                &format!("pub {field}"),
                &format!("Arc<dyn {}>", resolver_trait(name)),
            );
            new_bindings.line(&format!(
                "    {field}: Arc::new({}::new(Arc::clone(&services.{field}))),",
                resolver_impl(name)
            ));
        }
        new_bindings.line("}");

        scope.push_struct(services);
        scope.push_struct(bindings);
        let mut constructor = Impl::new("Bindings");
        constructor.push_fn(new_bindings);
        scope.push_impl(constructor);

        let mut query_fields = Vec::new();
        let mut mutation_fields = Vec::new();
        for entity in entities {
            for method in entity.methods() {
                let entry = format!(
                    "    RootField {{ name: \"{}\", entity: \"{}\", kind: MethodKind::{} }},",
                    method.root_field(entity.name()),
                    entity.name(),
                    variant(method.kind)
                );
                if method.kind.is_mutation() {
                    mutation_fields.push(entry);
                } else {
                    query_fields.push(entry);
                }
            }
        }
        for (name, fields) in [("QUERY_FIELDS", query_fields), ("MUTATION_FIELDS", mutation_fields)] {
            let body = if fields.is_empty() {
                "&[]".to_string()
            } else {
                format!("&[\n{}\n]", fields.join("\n"))
            };
            scope.raw(&format!("pub const {name}: &[RootField] = {body};"));
        }

        Artifact::aggregate(
            ArtifactCategory::Contract,
            self.config.dir(ArtifactCategory::Contract).join(ENGINE_FILE),
            render("//! Generated execution engine wiring", &scope),
        )
    }

    /// One `mod.rs` per Rust output directory, listing everything generated into it
    fn module_indexes(&self, entities: &[EntityDescriptor]) -> Vec<Artifact> {
        let mut directories: BTreeMap<PathBuf, (ArtifactCategory, BTreeSet<String>)> = BTreeMap::new();
        let mut add = |category: ArtifactCategory, module: String| {
            directories
                .entry(self.config.dir(category).to_path_buf())
                .or_insert_with(|| (category, BTreeSet::new()))
                .1
                .insert(module);
        };

        add(ArtifactCategory::Contract, "engine".to_string());
        add(ArtifactCategory::Loader, "registry".to_string());
        for entity in entities {
            let name = entity.name();
            add(ArtifactCategory::Contract, contract_module(name));
            add(ArtifactCategory::Implementation, implementation_module(name));
            if loader_plan(entity).is_some() {
                add(ArtifactCategory::Loader, loader_module(name));
            }
        }

        directories
            .into_iter()
            .map(|(dir, (category, modules))| {
                let mut contents = format!("//! Generated module index\n{GENERATED_NOTICE}\n\n");
                for module in modules {
                    contents.push_str(&format!("pub mod {module};\n"));
                }
                Artifact::aggregate(category, dir.join("mod.rs"), contents)
            })
            .collect()
    }
}

fn render(title: &str, scope: &Scope) -> String {
    format!("{title}\n{GENERATED_NOTICE}\n\n{}\n", scope.to_string())
}
