use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use servgraph_sdk::{GenerationReport, Generator};
use std::path::PathBuf;
use tracing::info;

use super::Command;
use crate::utils::config::load_config;

pub struct GenerateCommand {
    pub project_dir: PathBuf,
    pub config: Option<PathBuf>,
}

impl GenerateCommand {
    /// Run the generator and hand back its report, failing when any entity failed
    pub async fn run(&self) -> Result<GenerationReport> {
        let config = load_config(&self.project_dir, self.config.as_deref())?;
        info!(entities = config.entities.len(), "Loaded configuration");

        let report = tokio::task::spawn_blocking(move || Generator::new(config).run())
            .await
            .context("Generation task panicked")??;

        report.print_summary();
        if !report.is_success() {
            bail!("Code generation failed: {}", report.summary());
        }
        Ok(report)
    }
}

#[async_trait]
impl Command for GenerateCommand {
    async fn execute(&self) -> Result<()> {
        self.run().await.map(|_| ())
    }
}
