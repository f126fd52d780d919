use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use super::Command;
use crate::utils::templates::{TemplateEngine, STARTER_TEMPLATES};

const DEFAULT_PROJECT_NAME: &str = "servgraph-project";

/// Writes a starter configuration and catalog into a directory
pub struct InitCommand {
    pub dir: PathBuf,
}

impl InitCommand {
    fn project_name(&self) -> String {
        self.dir
            .canonicalize()
            .ok()
            .and_then(|dir| dir.file_name().map(|name| name.to_string_lossy().into_owned()))
            .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string())
    }

    /// Paths written, in template order
    pub fn run(&self) -> Result<Vec<PathBuf>> {
        let existing: Vec<String> = STARTER_TEMPLATES
            .iter()
            .map(|template| self.dir.join(template.file_name))
            .filter(|path| path.exists())
            .map(|path| path.display().to_string())
            .collect();
        if !existing.is_empty() {
            bail!("Refusing to overwrite existing files: {}", existing.join(", "));
        }

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;

        let project_name = self.project_name();
        let variables = HashMap::from([("project_name".to_string(), project_name.clone())]);
        let engine = TemplateEngine::new();

        let mut written = Vec::with_capacity(STARTER_TEMPLATES.len());
        for template in STARTER_TEMPLATES {
            let path = self.dir.join(template.file_name);
            let contents = engine.render_template(template.contents, &variables)?;
            fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
            written.push(path);
        }

        info!(project = %project_name, dir = %self.dir.display(), "Initialized project");
        Ok(written)
    }
}

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self) -> Result<()> {
        let written = self.run()?;
        println!("✅ Initialized servgraph project in {}", self.dir.display());
        for path in written {
            println!("   Created {}", path.display());
        }
        println!("   Run `cargo servgraph generate` to generate the GraphQL layer");
        Ok(())
    }
}
