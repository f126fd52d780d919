//! Generator configuration
//!
//! Produced by the build-tool host (a `servgraph.yaml` or `servgraph.toml` next to
//! the project) and consumed read-only by every stage of a generation run.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::descriptor::MethodKind;
use crate::error::GenerationError;
use crate::runtime::LoaderOptions;

/// Configuration file names looked up in a project directory, in order
pub const CONFIG_FILE_NAMES: [&str; 3] = ["servgraph.yaml", "servgraph.yml", "servgraph.toml"];

/// First configuration file present in `project_dir`
pub fn find_config(project_dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|path| path.is_file())
}

/// Top-level configuration of one generation run
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Path of the service catalog
    pub catalog: PathBuf,
    #[serde(default)]
    pub output: OutputDirs,
    #[serde(default)]
    pub modules: ModulePaths,
    #[serde(default)]
    pub loader: LoaderSettings,
    #[serde(default)]
    pub entities: BTreeMap<String, EntityConfig>,
}

/// Where each artifact category is written
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputDirs {
    pub schema_dir: Option<PathBuf>,
    pub contract_dir: Option<PathBuf>,
    pub implementation_dir: Option<PathBuf>,
    pub loader_dir: Option<PathBuf>,
}

/// Rust module paths referenced from generated code
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ModulePaths {
    pub model: String,
    pub service: String,
    pub contract: String,
    pub implementation: String,
    pub loader: String,
    pub sdk: String,
}

impl Default for ModulePaths {
    fn default() -> Self {
        Self {
            model: "crate::model".to_string(),
            service: "crate::service".to_string(),
            contract: "crate::graphql::contract".to_string(),
            implementation: "crate::graphql::resolvers".to_string(),
            loader: "crate::graphql::loaders".to_string(),
            sdk: "servgraph_sdk".to_string(),
        }
    }
}

/// Global batch loader options as written in the config file
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct LoaderSettings {
    pub max_batch_size: usize,
    pub cache_ttl_ms: u64,
    pub cache_max_size: usize,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            cache_ttl_ms: 60_000,
            cache_max_size: 1_000,
        }
    }
}

impl LoaderSettings {
    pub fn to_options(&self) -> LoaderOptions {
        LoaderOptions {
            max_batch_size: self.max_batch_size,
            cache_ttl: Duration::from_millis(self.cache_ttl_ms),
            cache_max_size: self.cache_max_size,
        }
    }
}

/// Per-category overwrite flags
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct OverwritePolicy {
    pub schema: bool,
    pub contract: bool,
    pub implementation: bool,
    pub loader: bool,
}

impl Default for OverwritePolicy {
    fn default() -> Self {
        Self {
            schema: true,
            contract: true,
            implementation: false,
            loader: true,
        }
    }
}

impl OverwritePolicy {
    pub fn all() -> Self {
        Self {
            schema: true,
            contract: true,
            implementation: true,
            loader: true,
        }
    }

    pub fn none() -> Self {
        Self {
            schema: false,
            contract: false,
            implementation: false,
            loader: false,
        }
    }

    /// Whether an existing file of this category may be replaced
    pub fn allows(&self, category: crate::codegen::ArtifactCategory) -> bool {
        use crate::codegen::ArtifactCategory;
        match category {
            ArtifactCategory::Schema => self.schema,
            ArtifactCategory::Contract => self.contract,
            ArtifactCategory::Implementation => self.implementation,
            ArtifactCategory::Loader => self.loader,
        }
    }
}

/// Method-name overrides per operation kind
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct MethodOverrides {
    pub create: Option<String>,
    pub read_one: Option<String>,
    pub read_all: Option<String>,
    pub update: Option<String>,
    pub delete: Option<String>,
}

impl MethodOverrides {
    /// Overrides as `(method name, kind)` pairs
    pub fn pairs(&self) -> Vec<(&str, MethodKind)> {
        [
            (&self.create, MethodKind::Create),
            (&self.read_one, MethodKind::ReadOne),
            (&self.read_all, MethodKind::ReadAll),
            (&self.update, MethodKind::Update),
            (&self.delete, MethodKind::Delete),
        ]
        .into_iter()
        .filter_map(|(name, kind)| name.as_deref().map(|n| (n, kind)))
        .collect()
    }
}

/// Configuration of a single entity
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct EntityConfig {
    /// Catalog class name of the backing service
    pub service: String,
    pub ignored_fields: BTreeSet<String>,
    pub methods: MethodOverrides,
    /// Method name -> root field name
    pub operation_names: BTreeMap<String, String>,
    pub overwrite: OverwritePolicy,
}

impl EntityConfig {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Default::default()
        }
    }
}

impl GeneratorConfig {
    /// Load a configuration file, resolving relative paths against its directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let mut config: GeneratorConfig = if is_toml {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        };

        let base = path
            .parent()
            .ok_or_else(|| anyhow!("Config path has no parent: {}", path.display()))?;
        config.resolve_relative_to(base);
        Ok(config)
    }

    /// Make every relative path absolute with respect to `base`
    pub fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.catalog);
        for dir in [
            &mut self.output.schema_dir,
            &mut self.output.contract_dir,
            &mut self.output.implementation_dir,
            &mut self.output.loader_dir,
        ]
        .into_iter()
        .flatten()
        {
            resolve(dir);
        }
    }

    /// Check everything a run needs before any entity is touched
    pub fn validate(&self) -> Result<(), GenerationError> {
        let missing: Vec<&str> = [
            ("schema_dir", &self.output.schema_dir),
            ("contract_dir", &self.output.contract_dir),
            ("implementation_dir", &self.output.implementation_dir),
            ("loader_dir", &self.output.loader_dir),
        ]
        .into_iter()
        .filter(|(_, dir)| dir.as_ref().is_none_or(|d| d.as_os_str().is_empty()))
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(GenerationError::config(format!(
                "output directories not set: {}",
                missing.join(", ")
            )));
        }

        if self.entities.is_empty() {
            return Err(GenerationError::config("no entities configured"));
        }

        if self.loader.max_batch_size == 0 {
            return Err(GenerationError::config("loader.max_batch_size must be at least 1"));
        }

        for (name, entity) in &self.entities {
            if entity.service.trim().is_empty() {
                return Err(GenerationError::config(format!(
                    "entity '{name}' has no backing service"
                )));
            }
        }

        Ok(())
    }

    /// Output directory for a category; only valid after `validate`
    pub fn dir(&self, category: crate::codegen::ArtifactCategory) -> &Path {
        use crate::codegen::ArtifactCategory;
        let dir = match category {
            ArtifactCategory::Schema => &self.output.schema_dir,
            ArtifactCategory::Contract => &self.output.contract_dir,
            ArtifactCategory::Implementation => &self.output.implementation_dir,
            ArtifactCategory::Loader => &self.output.loader_dir,
        };
        dir.as_deref().unwrap_or_else(|| Path::new("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
catalog: catalog.yaml
output:
  schema_dir: graphql
  contract_dir: src/graphql/contract
  implementation_dir: src/graphql/resolvers
  loader_dir: src/graphql/loaders
loader:
  max_batch_size: 25
  cache_ttl_ms: 5000
entities:
  Widget:
    service: WidgetService
    ignored_fields: [internalNotes]
    methods:
      read_one: fetchWidget
    operation_names:
      findByColor: widgetsByColor
    overwrite:
      implementation: true
"#;

    #[test]
    fn test_load_yaml_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("servgraph.yaml");
        fs::write(&path, CONFIG).unwrap();

        let config = GeneratorConfig::load(&path).unwrap();
        assert_eq!(config.catalog, temp_dir.path().join("catalog.yaml"));
        assert_eq!(
            config.output.loader_dir.as_deref(),
            Some(temp_dir.path().join("src/graphql/loaders").as_path())
        );
        assert_eq!(config.loader.max_batch_size, 25);
        assert_eq!(config.loader.cache_max_size, 1_000);
        assert_eq!(config.loader.to_options().cache_ttl, Duration::from_secs(5));

        let widget = &config.entities["Widget"];
        assert!(widget.ignored_fields.contains("internalNotes"));
        assert_eq!(widget.methods.pairs(), vec![("fetchWidget", MethodKind::ReadOne)]);
        assert!(widget.overwrite.implementation);
        assert!(widget.overwrite.schema);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("servgraph.toml");
        fs::write(
            &path,
            r#"
catalog = "catalog.json"

[output]
schema_dir = "graphql"
contract_dir = "src/contract"
implementation_dir = "src/resolvers"
loader_dir = "src/loaders"

[entities.Gadget]
service = "GadgetService"
"#,
        )
        .unwrap();

        let config = GeneratorConfig::load(&path).unwrap();
        assert_eq!(config.entities["Gadget"].service, "GadgetService");
        assert!(!config.entities["Gadget"].overwrite.implementation);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_missing_output_dirs() {
        let mut config: GeneratorConfig = serde_yaml::from_str(CONFIG).unwrap();
        config.output.loader_dir = None;
        config.output.schema_dir = None;

        let err = config.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("schema_dir"));
        assert!(message.contains("loader_dir"));
    }

    #[test]
    fn test_validate_empty_entities() {
        let mut config: GeneratorConfig = serde_yaml::from_str(CONFIG).unwrap();
        config.entities.clear();
        assert!(matches!(config.validate(), Err(GenerationError::Config { .. })));
    }

    #[test]
    fn test_find_config_prefers_yaml() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(find_config(temp_dir.path()), None);

        fs::write(temp_dir.path().join("servgraph.toml"), "").unwrap();
        fs::write(temp_dir.path().join("servgraph.yaml"), "").unwrap();
        assert_eq!(
            find_config(temp_dir.path()),
            Some(temp_dir.path().join("servgraph.yaml"))
        );
    }

    #[test]
    fn test_validate_zero_batch_size() {
        let mut config: GeneratorConfig = serde_yaml::from_str(CONFIG).unwrap();
        config.loader.max_batch_size = 0;
        assert!(config.validate().is_err());
    }
}
