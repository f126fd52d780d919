use anyhow::{anyhow, Context, Result};
use servgraph_sdk::config::CONFIG_FILE_NAMES;
use servgraph_sdk::{find_config, GeneratorConfig};
use std::path::{Path, PathBuf};

/// Config file for a project: the explicit path when given, else the first
/// well-known file name present in `project_dir`
pub fn resolve_config_path(project_dir: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(anyhow!("Configuration file not found at: {}", path.display()));
        }
        return Ok(path.to_path_buf());
    }

    find_config(project_dir).ok_or_else(|| {
        anyhow!(
            "No servgraph configuration in {} (looked for {})",
            project_dir.display(),
            CONFIG_FILE_NAMES.join(", ")
        )
    })
}

pub fn load_config(project_dir: &Path, explicit: Option<&Path>) -> Result<GeneratorConfig> {
    let path = resolve_config_path(project_dir, explicit)?;
    GeneratorConfig::load(&path)
        .with_context(|| format!("Failed to load configuration: {}", path.display()))
}

/// Files whose change must re-run generation: the config and the catalog it names
pub fn watched_inputs(project_dir: &Path) -> Vec<PathBuf> {
    let Some(config_path) = find_config(project_dir) else {
        return Vec::new();
    };
    let mut inputs = vec![config_path.clone()];
    // an unreadable config is reported by the run itself
    if let Ok(config) = GeneratorConfig::load(&config_path) {
        inputs.push(config.catalog);
    }
    inputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use servgraph_sdk::testing::fixtures;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_prefers_explicit_path() {
        let temp_dir = TempDir::new().unwrap();
        fixtures::write_project(temp_dir.path()).unwrap();
        let other = temp_dir.path().join("other.toml");
        fs::write(&other, "catalog = \"catalog.yaml\"\n").unwrap();

        assert_eq!(resolve_config_path(temp_dir.path(), Some(&other)).unwrap(), other);
        assert_eq!(
            resolve_config_path(temp_dir.path(), None).unwrap(),
            temp_dir.path().join(fixtures::CONFIG_FILE)
        );
        assert!(resolve_config_path(temp_dir.path(), Some(&temp_dir.path().join("missing.yaml"))).is_err());
    }

    #[test]
    fn test_missing_config_names_candidates() {
        let temp_dir = TempDir::new().unwrap();
        let err = resolve_config_path(temp_dir.path(), None).unwrap_err();
        assert!(err.to_string().contains("servgraph.toml"));
    }

    #[test]
    fn test_watched_inputs() {
        let temp_dir = TempDir::new().unwrap();
        assert!(watched_inputs(temp_dir.path()).is_empty());

        fixtures::write_project(temp_dir.path()).unwrap();
        assert_eq!(
            watched_inputs(temp_dir.path()),
            vec![
                temp_dir.path().join(fixtures::CONFIG_FILE),
                temp_dir.path().join(fixtures::CATALOG_FILE)
            ]
        );
    }
}
