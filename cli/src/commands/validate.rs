use anyhow::{bail, Result};
use async_trait::async_trait;
use servgraph_sdk::{GenerationReport, Generator};
use std::path::PathBuf;

use super::Command;
use crate::utils::config::load_config;

/// Describes every entity and runs the cross-entity checks without writing files
pub struct ValidateCommand {
    pub project_dir: PathBuf,
    pub config: Option<PathBuf>,
}

impl ValidateCommand {
    pub async fn run(&self) -> Result<GenerationReport> {
        let config = load_config(&self.project_dir, self.config.as_deref())?;
        let report = Generator::new(config).check()?;

        for warning in &report.warnings {
            println!("   ⚠️  {warning}");
        }
        for failure in &report.failures {
            println!("   ❌ {failure}");
        }
        if !report.is_success() {
            bail!("Validation failed for {} entities", report.failures.len());
        }

        println!("✅ Configuration is valid ({} entities)", report.entities.len());
        Ok(report)
    }
}

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self) -> Result<()> {
        self.run().await.map(|_| ())
    }
}
