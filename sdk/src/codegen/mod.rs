//! Unified code generation interface for build scripts and the CLI
//!
//! The service-graph generator is registered by default; further generators can
//! be plugged into [`Codegen`] through the [`CodeGenerator`] trait.

pub mod artifacts;
pub mod coordinator;
pub mod generator;
pub mod schema_gen;
pub mod writer;

pub use artifacts::{ArtifactGenerator, EntityArtifacts};
pub use coordinator::SetCoordinator;
pub use generator::{EntityFailure, GenerationReport, Generator, Warning};
pub use writer::{ArtifactWriter, WriteOutcome};

use anyhow::Result;
use derive_builder::Builder;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{find_config, GeneratorConfig};

/// Output category of a generated file, each with its own directory and overwrite flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactCategory {
    Schema,
    Contract,
    Implementation,
    Loader,
}

impl ArtifactCategory {
    pub const ALL: [ArtifactCategory; 4] = [
        Self::Schema,
        Self::Contract,
        Self::Implementation,
        Self::Loader,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Contract => "contract",
            Self::Implementation => "implementation",
            Self::Loader => "loader",
        }
    }
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One rendered file, not yet written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub category: ArtifactCategory,
    pub path: PathBuf,
    pub contents: String,
    /// Aggregate artifacts are rewritten on every successful run
    pub aggregate: bool,
}

impl Artifact {
    pub fn new(category: ArtifactCategory, path: PathBuf, contents: String) -> Self {
        Self {
            category,
            path,
            contents,
            aggregate: false,
        }
    }

    pub fn aggregate(category: ArtifactCategory, path: PathBuf, contents: String) -> Self {
        Self {
            category,
            path,
            contents,
            aggregate: true,
        }
    }
}

/// Result of a code generation operation
#[derive(Debug, Clone, Builder)]
pub struct CodegenResult {
    pub generator_name: String,
    pub files_generated: Vec<PathBuf>,
    #[builder(default)]
    pub warnings: Vec<String>,
    pub success: bool,
    pub message: String,
}

/// Trait for all code generators
pub trait CodeGenerator {
    /// Name of this generator (e.g. "service-graph")
    fn generator_name(&self) -> &str;

    /// Check if this generator should run for the given project directory
    fn should_generate(&self, project_dir: &Path) -> bool;

    /// Generate code for the project
    fn generate(&self, project_dir: &Path) -> Result<CodegenResult>;
}

/// Generator driven by the project's `servgraph` configuration file
pub struct ServiceGraphGenerator;

impl CodeGenerator for ServiceGraphGenerator {
    fn generator_name(&self) -> &str {
        "service-graph"
    }

    fn should_generate(&self, project_dir: &Path) -> bool {
        find_config(project_dir).is_some()
    }

    fn generate(&self, project_dir: &Path) -> Result<CodegenResult> {
        let config_path = find_config(project_dir).ok_or_else(|| {
            anyhow::anyhow!("No servgraph configuration in {}", project_dir.display())
        })?;
        let config = GeneratorConfig::load(&config_path)?;
        let report = Generator::new(config).run()?;

        let result = CodegenResultBuilder::default()
            .generator_name(self.generator_name().to_string())
            .files_generated(report.written.clone())
            .warnings(
                report
                    .warnings
                    .iter()
                    .map(ToString::to_string)
                    .chain(report.failures.iter().map(ToString::to_string))
                    .collect(),
            )
            .success(report.is_success())
            .message(report.summary())
            .build()?;
        Ok(result)
    }
}

/// Unified code generation runner
pub struct Codegen {
    generators: Vec<Box<dyn CodeGenerator>>,
}

impl Codegen {
    /// Create a new codegen runner with default generators
    pub fn new() -> Self {
        let mut codegen = Self {
            generators: Vec::new(),
        };
        codegen.register_generator(Box::new(ServiceGraphGenerator));
        codegen
    }

    /// Register a custom generator
    pub fn register_generator(&mut self, generator: Box<dyn CodeGenerator>) {
        self.generators.push(generator);
    }

    /// Run all applicable generators for the project directory
    pub fn generate_all(&self, project_dir: &Path) -> Vec<CodegenResult> {
        let mut results = Vec::new();

        for generator in &self.generators {
            if generator.should_generate(project_dir) {
                match generator.generate(project_dir) {
                    Ok(result) => results.push(result),
                    Err(e) => results.push(CodegenResult {
                        generator_name: generator.generator_name().to_string(),
                        files_generated: vec![],
                        warnings: vec![],
                        success: false,
                        message: format!("Generation failed: {:#}", e),
                    }),
                }
            }
        }

        results
    }
}

impl Default for Codegen {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple synchronous codegen function for build scripts
pub fn codegen<P: AsRef<Path>>(project_dir: P) -> Vec<CodegenResult> {
    Codegen::new().generate_all(project_dir.as_ref())
}
