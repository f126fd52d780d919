//! Declarative service catalog
//!
//! The catalog enumerates, ahead of time, every class the generator may look at:
//! entity models with their accessors and backing services with their operations.
//! It stands in for runtime reflection, so member order in the file is the
//! discovery order used for every generated artifact.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// One parameter of a catalog member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// A method or accessor declared on a class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDef {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamDef>,
    #[serde(default = "default_returns")]
    pub returns: String,
    #[serde(default = "default_public")]
    pub public: bool,
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

fn default_returns() -> String {
    "void".to_string()
}

fn default_public() -> bool {
    true
}

impl MemberDef {
    pub fn new(name: impl Into<String>, returns: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: returns.into(),
            public: true,
            is_static: false,
        }
    }

    /// Append a parameter, builder style
    pub fn param(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.params.push(ParamDef {
            name: name.into(),
            ty: ty.into(),
        });
        self
    }

    /// Whether the member can be seen by the generator
    pub fn is_accessible(&self) -> bool {
        self.public && !self.is_static
    }
}

/// A class known to the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    #[serde(default)]
    pub members: Vec<MemberDef>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn member(mut self, member: MemberDef) -> Self {
        self.members.push(member);
        self
    }

    /// Members visible to introspection, in declaration order
    pub fn accessible_members(&self) -> impl Iterator<Item = &MemberDef> {
        self.members.iter().filter(|m| m.is_accessible())
    }
}

/// The full set of introspectable classes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCatalog {
    #[serde(default)]
    pub classes: Vec<ClassDef>,
}

impl ServiceCatalog {
    pub fn new(classes: Vec<ClassDef>) -> Result<Self> {
        let catalog = Self { classes };
        catalog.check_unique()?;
        Ok(catalog)
    }

    /// Load a catalog file; `.json` is read as JSON, anything else as YAML
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read service catalog: {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
        .with_context(|| format!("Failed to parse service catalog: {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let catalog: Self = serde_yaml::from_str(content)?;
        catalog.check_unique()?;
        Ok(catalog)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(content)?;
        catalog.check_unique()?;
        Ok(catalog)
    }

    fn check_unique(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for class in &self.classes {
            if !seen.insert(class.name.as_str()) {
                return Err(anyhow!("Class '{}' is declared more than once", class.name));
            }
        }
        Ok(())
    }

    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.class(name).is_some()
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
classes:
  - name: Widget
    members:
      - { name: getWidgetId, returns: long }
      - { name: isActive, returns: boolean }
      - { name: getSecret, returns: String, public: false }
  - name: WidgetService
    members:
      - name: getWidget
        params: [{ name: widgetId, type: long }]
        returns: Widget
      - name: deleteWidget
        params: [{ name: widgetId, type: long }]
"#;

    #[test]
    fn test_parse_yaml_catalog() {
        let catalog = ServiceCatalog::from_yaml_str(CATALOG).unwrap();
        assert_eq!(catalog.classes.len(), 2);
        assert!(catalog.contains("WidgetService"));

        let widget = catalog.class("Widget").unwrap();
        let visible: Vec<_> = widget.accessible_members().map(|m| m.name.as_str()).collect();
        assert_eq!(visible, vec!["getWidgetId", "isActive"]);

        let service = catalog.class("WidgetService").unwrap();
        assert_eq!(service.members[1].returns, "void");
        assert_eq!(service.members[0].params[0].ty, "long");
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let content = r#"
classes:
  - name: Widget
  - name: Widget
"#;
        let err = ServiceCatalog::from_yaml_str(content).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_parse_json_catalog() {
        let content = r#"{"classes":[{"name":"Gadget","members":[{"name":"getGadgets","returns":"List<Gadget>"}]}]}"#;
        let catalog = ServiceCatalog::from_json_str(content).unwrap();
        assert_eq!(catalog.class("Gadget").unwrap().members[0].returns, "List<Gadget>");
    }
}
