// Sample project used by tests and the CLI `init` command
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "servgraph.yaml";
pub const CATALOG_FILE: &str = "catalog.yaml";

/// Two entities: `Widget` with a batch read-all, `Part` loaded one id at a time
pub const SAMPLE_CATALOG: &str = r#"classes:
  - name: Widget
    members:
      - { name: getWidgetId, returns: long }
      - { name: getName, returns: String }
      - { name: isActive, returns: boolean }
      - { name: getParts, returns: "List<Part>" }
  - name: WidgetService
    members:
      - name: getWidget
        params: [{ name: widgetId, type: long }]
        returns: Widget
      - name: getWidgets
        params: [{ name: widgetIds, type: "long[]" }]
        returns: "List<Widget>"
      - name: addWidget
        params: [{ name: name, type: String }]
        returns: Widget
      - name: deleteWidget
        params: [{ name: widgetId, type: long }]
        returns: void
  - name: Part
    members:
      - { name: getPartId, returns: Long }
      - { name: getLabel, returns: String }
  - name: PartService
    members:
      - name: getPart
        params: [{ name: partId, type: long }]
        returns: Part
      - name: findByLabel
        params: [{ name: label, type: String }]
        returns: "Part[]"
"#;

pub const SAMPLE_CONFIG: &str = r#"catalog: catalog.yaml
output:
  schema_dir: graphql
  contract_dir: src/graphql/contract
  implementation_dir: src/graphql/resolvers
  loader_dir: src/graphql/loaders
loader:
  max_batch_size: 100
  cache_ttl_ms: 60000
  cache_max_size: 1000
entities:
  Part:
    service: PartService
  Widget:
    service: WidgetService
"#;

/// Write the sample config and catalog into `dir`, returning the config path
pub fn write_project(dir: &Path) -> io::Result<PathBuf> {
    write_project_with(dir, SAMPLE_CONFIG, SAMPLE_CATALOG)
}

pub fn write_project_with(dir: &Path, config: &str, catalog: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(CATALOG_FILE), catalog)?;
    let config_path = dir.join(CONFIG_FILE);
    fs::write(&config_path, config)?;
    Ok(config_path)
}
