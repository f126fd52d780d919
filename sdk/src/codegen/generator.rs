//! Generation run: describe, render and write every configured entity, then the aggregates

use std::fmt;
use std::path::PathBuf;
use tracing::{error, info, warn};

use super::{Artifact, ArtifactCategory, ArtifactGenerator, ArtifactWriter, SetCoordinator, WriteOutcome};
use crate::config::{GeneratorConfig, OverwritePolicy};
use crate::descriptor::{EntityDescriptor, ServiceCatalog};
use crate::error::GenerationError;
use crate::introspect::{ScalarTypeMapper, TypeIntrospector};

/// Non-fatal finding of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Target exists and its category's overwrite flag is off
    FileWriteSkipped {
        path: PathBuf,
        category: ArtifactCategory,
    },
    /// Dropped method, dropped ignored field, missing loader
    Entity { entity: String, message: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileWriteSkipped { path, category } => write!(
                f,
                "Skipped {}: file exists and {category} overwrite is disabled",
                path.display()
            ),
            Self::Entity { message, .. } => f.write_str(message),
        }
    }
}

/// An entity that could not be generated
#[derive(Debug)]
pub struct EntityFailure {
    pub entity: String,
    pub error: GenerationError,
}

impl fmt::Display for EntityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity, self.error)
    }
}

/// Outcome of a generation run
#[derive(Debug, Default)]
pub struct GenerationReport {
    /// Entities described successfully, in processing order
    pub entities: Vec<String>,
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
    pub failures: Vec<EntityFailure>,
    /// Whether the aggregate stage ran and its files are in place
    pub aggregates_written: bool,
}

impl GenerationReport {
    /// A run succeeds when no entity failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, artifact: &Artifact, outcome: WriteOutcome) {
        let path = artifact.path.clone();
        match outcome {
            WriteOutcome::Written => self.written.push(path),
            WriteOutcome::Unchanged => self.unchanged.push(path),
            WriteOutcome::Skipped => {
                self.warnings.push(Warning::FileWriteSkipped {
                    path: path.clone(),
                    category: artifact.category,
                });
                self.skipped.push(path);
            }
        }
    }

    fn entity_warnings(&mut self, entity: &str, messages: Vec<String>) {
        self.warnings.extend(messages.into_iter().map(|message| Warning::Entity {
            entity: entity.to_string(),
            message,
        }));
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        format!(
            "{} entities, {} files written, {} unchanged, {} skipped, {} failed",
            self.entities.len(),
            self.written.len(),
            self.unchanged.len(),
            self.skipped.len(),
            self.failures.len()
        )
    }

    /// Print a summary of the generation results
    pub fn print_summary(&self) {
        if self.is_success() {
            println!("✅ Code generation completed successfully");
        } else {
            println!("❌ Code generation failed for {} entities", self.failures.len());
        }
        println!("   Described {} entities", self.entities.len());
        println!(
            "   Wrote {} files ({} unchanged)",
            self.written.len(),
            self.unchanged.len()
        );
        if !self.skipped.is_empty() {
            println!("   Skipped {} existing files", self.skipped.len());
        }
        for warning in &self.warnings {
            println!("   ⚠️  {warning}");
        }
        for failure in &self.failures {
            println!("   ❌ {failure}");
        }
        if !self.aggregates_written {
            println!("   Aggregate artifacts were not written");
        }
    }
}

/// Drives one generation run over a validated configuration
pub struct Generator {
    config: GeneratorConfig,
    writer: ArtifactWriter,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            writer: ArtifactWriter::new(),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn load_catalog(&self) -> Result<ServiceCatalog, GenerationError> {
        ServiceCatalog::load(&self.config.catalog).map_err(|e| GenerationError::catalog(format!("{e:#}")))
    }

    /// Describe every configured entity; failures are recorded, not returned
    pub fn describe_all(&self) -> Result<(Vec<EntityDescriptor>, GenerationReport), GenerationError> {
        self.config.validate()?;
        let catalog = self.load_catalog()?;

        let known = self
            .config
            .entities
            .keys()
            .map(String::as_str)
            .chain(catalog.class_names());
        let mapper = ScalarTypeMapper::new(known);
        let introspector = TypeIntrospector::new(&catalog, &mapper, &self.config.modules);

        let mut report = GenerationReport::default();
        let mut descriptors = Vec::with_capacity(self.config.entities.len());
        for (entity, entity_config) in &self.config.entities {
            match introspector.introspect(entity, entity_config) {
                Ok(introspection) => {
                    report.entity_warnings(entity, introspection.warnings);
                    report.entities.push(entity.clone());
                    descriptors.push(introspection.descriptor);
                }
                Err(e) => {
                    error!(entity = %entity, error = %e, "Failed to describe entity");
                    report.failures.push(EntityFailure {
                        entity: entity.clone(),
                        error: e,
                    });
                }
            }
        }
        Ok((descriptors, report))
    }

    /// Full run: per-entity artifacts, then aggregates when every entity succeeded
    pub fn run(&self) -> Result<GenerationReport, GenerationError> {
        info!(entities = self.config.entities.len(), "Starting generation run");
        let (descriptors, mut report) = self.describe_all()?;
        let renderer = ArtifactGenerator::new(&self.config);

        for descriptor in &descriptors {
            let rendered = renderer.generate(descriptor);
            report.entity_warnings(descriptor.name(), rendered.warnings);

            for artifact in &rendered.artifacts {
                match self.writer.write(artifact, descriptor.overwrite()) {
                    Ok(outcome) => report.record(artifact, outcome),
                    Err(e) => {
                        error!(entity = descriptor.name(), error = %e, "Failed to write entity artifact");
                        report.failures.push(EntityFailure {
                            entity: descriptor.name().to_string(),
                            error: e,
                        });
                        break;
                    }
                }
            }
        }

        if !report.is_success() {
            warn!(failed = report.failures.len(), "Entities failed, aggregate artifacts not written");
            return Ok(report);
        }

        let aggregates = SetCoordinator::new(&self.config).coordinate(&descriptors)?;
        let policy = OverwritePolicy::all();
        for artifact in &aggregates {
            let outcome = self.writer.write(artifact, &policy)?;
            report.record(artifact, outcome);
        }
        report.aggregates_written = true;

        info!(summary = %report.summary(), "Generation run finished");
        Ok(report)
    }

    /// Everything `run` checks, without writing a file
    pub fn check(&self) -> Result<GenerationReport, GenerationError> {
        let (descriptors, mut report) = self.describe_all()?;
        let renderer = ArtifactGenerator::new(&self.config);
        for descriptor in &descriptors {
            let rendered = renderer.generate(descriptor);
            report.entity_warnings(descriptor.name(), rendered.warnings);
        }
        if report.is_success() {
            SetCoordinator::new(&self.config).coordinate(&descriptors)?;
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use std::fs;
    use tempfile::TempDir;

    fn generator(dir: &TempDir) -> Generator {
        let config_path = fixtures::write_project(dir.path()).unwrap();
        Generator::new(GeneratorConfig::load(config_path).unwrap())
    }

    #[test]
    fn test_run_writes_everything() {
        let temp_dir = TempDir::new().unwrap();
        let report = generator(&temp_dir).run().unwrap();

        assert!(report.is_success());
        assert!(report.aggregates_written);
        assert_eq!(report.entities, vec!["Part".to_string(), "Widget".to_string()]);
        assert!(report.skipped.is_empty());

        let root = temp_dir.path();
        for file in [
            "graphql/part.graphql",
            "graphql/widget.graphql",
            "graphql/schema.graphql",
            "src/graphql/contract/widget_resolver.rs",
            "src/graphql/contract/engine.rs",
            "src/graphql/contract/mod.rs",
            "src/graphql/resolvers/widget_resolver_impl.rs",
            "src/graphql/loaders/widget_loader.rs",
            "src/graphql/loaders/part_loader.rs",
            "src/graphql/loaders/registry.rs",
        ] {
            assert!(root.join(file).is_file(), "missing {file}");
        }
        assert_eq!(report.written.len(), 14);
    }

    #[test]
    fn test_second_run_skips_edited_stub() {
        let temp_dir = TempDir::new().unwrap();
        let generator = generator(&temp_dir);
        generator.run().unwrap();

        let stub = temp_dir.path().join("src/graphql/resolvers/widget_resolver_impl.rs");
        fs::write(&stub, "// hand written\n").unwrap();

        let report = generator.run().unwrap();
        assert!(report.is_success());
        assert!(report.written.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped.contains(&stub));
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::FileWriteSkipped { category: ArtifactCategory::Implementation, .. })));
        assert_eq!(fs::read_to_string(&stub).unwrap(), "// hand written\n");
    }

    #[test]
    fn test_failed_entity_blocks_aggregates() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = fixtures::write_project(temp_dir.path()).unwrap();
        let mut config = GeneratorConfig::load(config_path).unwrap();
        config
            .entities
            .insert("Ghost".to_string(), crate::config::EntityConfig::new("GhostService"));

        let report = Generator::new(config).run().unwrap();
        assert!(!report.is_success());
        assert!(!report.aggregates_written);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].entity, "Ghost");
        assert!(matches!(report.failures[0].error, GenerationError::ClassNotFound { .. }));

        assert!(temp_dir.path().join("graphql/widget.graphql").is_file());
        assert!(!temp_dir.path().join("graphql/schema.graphql").exists());
    }

    #[test]
    fn test_missing_catalog_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = fixtures::write_project(temp_dir.path()).unwrap();
        fs::remove_file(temp_dir.path().join(fixtures::CATALOG_FILE)).unwrap();

        let config = GeneratorConfig::load(config_path).unwrap();
        let err = Generator::new(config).run().unwrap_err();
        assert!(matches!(err, GenerationError::Catalog { .. }));
    }

    #[test]
    fn test_check_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let report = generator(&temp_dir).check().unwrap();
        assert!(report.is_success());
        assert!(report.written.is_empty());
        assert!(!temp_dir.path().join("graphql").exists());
    }

    #[test]
    fn test_summary() {
        let report = GenerationReport {
            entities: vec!["Widget".to_string()],
            written: vec![PathBuf::from("a"), PathBuf::from("b")],
            ..Default::default()
        };
        assert_eq!(report.summary(), "1 entities, 2 files written, 0 unchanged, 0 skipped, 0 failed");
    }
}
