//! Code generation entry points for build scripts

use anyhow::{ensure, Result};
use std::path::Path;

pub use servgraph_sdk::CodegenResult as GeneratorResult;

/// Run every applicable generator for the project, synchronously
///
/// An empty result means the project has no servgraph configuration.
pub fn run_generation_sync<P: AsRef<Path>>(project_dir: P) -> Result<Vec<GeneratorResult>> {
    let project_dir = project_dir.as_ref();
    ensure!(
        project_dir.is_dir(),
        "Project directory not found: {}",
        project_dir.display()
    );
    Ok(servgraph_sdk::codegen(project_dir))
}
