use anyhow::{anyhow, Result};
use std::collections::HashMap;

/// A file of the starter project
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub file_name: &'static str,
    pub contents: &'static str,
}

pub const STARTER_TEMPLATES: [Template; 2] = [
    Template {
        file_name: "servgraph.yaml",
        contents: include_str!("../../templates/starter/servgraph.yaml"),
    },
    Template {
        file_name: "catalog.yaml",
        contents: include_str!("../../templates/starter/catalog.yaml"),
    },
];

/// Substitutes `{{name}}` placeholders
pub struct TemplateEngine;

impl TemplateEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn render_template(&self, template: &str, variables: &HashMap<String, String>) -> Result<String> {
        let mut rendered = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| anyhow!("Unclosed placeholder in template"))?;
            let name = after[..end].trim();
            let value = variables
                .get(name)
                .ok_or_else(|| anyhow!("No value for template variable '{name}'"))?;
            rendered.push_str(value);
            rest = &after[end + 2..];
        }

        rendered.push_str(rest);
        Ok(rendered)
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_template() {
        let engine = TemplateEngine::new();
        let rendered = engine
            .render_template("# {{project_name}} / {{ owner }}", &vars(&[("project_name", "shop"), ("owner", "ops")]))
            .unwrap();
        assert_eq!(rendered, "# shop / ops");
    }

    #[test]
    fn test_missing_variable_and_unclosed_placeholder() {
        let engine = TemplateEngine::new();
        assert!(engine.render_template("{{unknown}}", &HashMap::new()).is_err());
        assert!(engine.render_template("{{project_name", &vars(&[("project_name", "shop")])).is_err());
    }

    #[test]
    fn test_starter_templates_render() {
        let engine = TemplateEngine::new();
        let variables = vars(&[("project_name", "shop")]);
        for template in STARTER_TEMPLATES {
            let rendered = engine.render_template(template.contents, &variables).unwrap();
            assert!(rendered.starts_with("# "));
            assert!(rendered.contains("shop"));
            assert!(!rendered.contains("{{"));
        }

        let config = engine.render_template(STARTER_TEMPLATES[0].contents, &variables).unwrap();
        let config: servgraph_sdk::GeneratorConfig = serde_yaml::from_str(&config).unwrap();
        assert_eq!(config.entities.len(), 2);
        assert_eq!(config.entities["Widget"].service, "WidgetService");
    }
}
