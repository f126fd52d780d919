//! Operation classification
//!
//! An explicit per-entity override always wins; otherwise the method name prefix
//! decides. Methods matching neither are dropped with a warning and never reach
//! the generated artifacts.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::EntityConfig;
use crate::descriptor::{MethodKind, SourceType};
use crate::error::GenerationError;

/// A service operation before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMethod {
    pub name: String,
    pub params: Vec<(String, SourceType)>,
    pub returns: SourceType,
}

impl RawMethod {
    pub fn new(name: impl Into<String>, params: Vec<(String, SourceType)>, returns: SourceType) -> Self {
        Self {
            name: name.into(),
            params,
            returns,
        }
    }
}

/// Why a kind was assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basis {
    Override,
    Convention,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Kind(MethodKind, Basis),
    Unclassified(String),
}

/// Methods kept after classification, in declaration order
#[derive(Debug, Default)]
pub struct ClassifiedSet {
    pub methods: Vec<(RawMethod, MethodKind)>,
    pub warnings: Vec<String>,
}

/// Classifies the operations of one entity's backing service
#[derive(Debug, Clone)]
pub struct MethodClassifier {
    overrides: BTreeMap<String, MethodKind>,
    conflicts: Vec<(String, MethodKind, MethodKind)>,
}

/// `prefix` followed by an upper-case letter, or the bare prefix
fn has_prefix(name: &str, prefix: &str) -> bool {
    match name.strip_prefix(prefix) {
        Some(rest) => rest.chars().next().is_none_or(|c| c.is_ascii_uppercase()),
        None => false,
    }
}

impl MethodClassifier {
    pub fn new(config: &EntityConfig) -> Self {
        let mut overrides = BTreeMap::new();
        let mut conflicts = Vec::new();
        for (name, kind) in config.methods.pairs() {
            if let Some(previous) = overrides.insert(name.to_string(), kind) {
                conflicts.push((name.to_string(), previous, kind));
            }
        }
        Self {
            overrides,
            conflicts,
        }
    }

    /// Classify one signature; pure in the method and the configuration
    pub fn classify(&self, method: &RawMethod) -> Classification {
        if let Some(kind) = self.overrides.get(&method.name) {
            return Classification::Kind(*kind, Basis::Override);
        }

        let name = method.name.as_str();
        let kind = if has_prefix(name, "get") {
            match method.params.as_slice() {
                [] => MethodKind::ReadAll,
                [(_, ty)] if ty.is_array() => MethodKind::ReadAll,
                [(_, ty)] if ty.is_integral() => MethodKind::ReadOne,
                _ => MethodKind::CustomFinder,
            }
        } else if ["find", "search", "count"].iter().any(|p| has_prefix(name, p)) {
            MethodKind::CustomFinder
        } else if has_prefix(name, "add") || has_prefix(name, "create") {
            MethodKind::Create
        } else if has_prefix(name, "update") {
            MethodKind::Update
        } else if has_prefix(name, "delete") || has_prefix(name, "remove") {
            MethodKind::Delete
        } else {
            return Classification::Unclassified(format!(
                "'{name}' matches no override and no naming convention"
            ));
        };

        Classification::Kind(kind, Basis::Convention)
    }

    /// Classify every method and enforce one method per unique kind
    pub fn classify_all(
        &self,
        entity: &str,
        methods: Vec<RawMethod>,
    ) -> Result<ClassifiedSet, GenerationError> {
        if let Some((name, first, second)) = self.conflicts.first() {
            return Err(GenerationError::Introspection {
                entity: entity.to_string(),
                reason: format!("method '{name}' is overridden as both {first} and {second}"),
            });
        }

        for (name, kind) in &self.overrides {
            let matches = methods.iter().filter(|m| &m.name == name).count();
            if matches == 0 {
                return Err(GenerationError::Introspection {
                    entity: entity.to_string(),
                    reason: format!("{kind} override names unknown method '{name}'"),
                });
            }
            if matches > 1 {
                return Err(GenerationError::AmbiguousClassification {
                    entity: entity.to_string(),
                    kind: *kind,
                    methods: vec![name.clone(); matches],
                });
            }
        }

        let mut set = ClassifiedSet::default();
        let mut classified = Vec::with_capacity(methods.len());
        for method in methods {
            match self.classify(&method) {
                Classification::Kind(kind, basis) => {
                    debug!(entity, method = %method.name, %kind, ?basis, "Classified operation");
                    classified.push((method, kind, basis));
                }
                Classification::Unclassified(reason) => {
                    warn!(entity, method = %method.name, "Dropping unclassified operation");
                    set.warnings.push(format!("{entity}: dropped {reason}"));
                }
            }
        }

        for kind in MethodKind::ALL.into_iter().filter(MethodKind::is_unique) {
            let pinned = classified
                .iter()
                .any(|(_, k, basis)| *k == kind && *basis == Basis::Override);
            let contenders: Vec<&str> = classified
                .iter()
                .filter(|(_, k, basis)| *k == kind && *basis == Basis::Convention)
                .map(|(m, _, _)| m.name.as_str())
                .collect();

            if pinned {
                for name in &contenders {
                    warn!(entity, method = %name, %kind, "Dropping operation superseded by override");
                    set.warnings
                        .push(format!("{entity}: dropped '{name}', {kind} is pinned by an override"));
                }
            } else if contenders.len() > 1 {
                return Err(GenerationError::AmbiguousClassification {
                    entity: entity.to_string(),
                    kind,
                    methods: contenders.into_iter().map(str::to_string).collect(),
                });
            }
        }

        set.methods = classified
            .into_iter()
            .filter(|(_, kind, basis)| {
                !(kind.is_unique()
                    && *basis == Basis::Convention
                    && self.overrides.values().any(|k| k == kind))
            })
            .map(|(method, kind, _)| (method, kind))
            .collect();

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MethodOverrides;

    fn method(name: &str, params: &[&str], returns: &str) -> RawMethod {
        RawMethod::new(
            name,
            params
                .iter()
                .enumerate()
                .map(|(i, ty)| (format!("arg{i}"), ty.parse().unwrap()))
                .collect(),
            returns.parse().unwrap(),
        )
    }

    fn kind_of(classifier: &MethodClassifier, m: &RawMethod) -> Option<MethodKind> {
        match classifier.classify(m) {
            Classification::Kind(kind, _) => Some(kind),
            Classification::Unclassified(_) => None,
        }
    }

    #[test]
    fn test_naming_conventions() {
        let classifier = MethodClassifier::new(&EntityConfig::new("WidgetService"));

        let cases = [
            (method("getWidget", &["long"], "Widget"), Some(MethodKind::ReadOne)),
            (method("getWidgets", &[], "List<Widget>"), Some(MethodKind::ReadAll)),
            (method("getWidgets", &["long[]"], "List<Widget>"), Some(MethodKind::ReadAll)),
            (method("addWidget", &["String"], "Widget"), Some(MethodKind::Create)),
            (method("createWidget", &["String"], "Widget"), Some(MethodKind::Create)),
            (method("updateWidget", &["long", "String"], "Widget"), Some(MethodKind::Update)),
            (method("deleteWidget", &["long"], "void"), Some(MethodKind::Delete)),
            (method("removeWidget", &["long"], "void"), Some(MethodKind::Delete)),
            (method("getWidgetsByColor", &["String"], "List<Widget>"), Some(MethodKind::CustomFinder)),
            (method("findByColor", &["String"], "List<Widget>"), Some(MethodKind::CustomFinder)),
            (method("fetchWidget", &["long"], "Widget"), None),
            (method("getaway", &[], "void"), None),
        ];

        for (m, expected) in cases {
            assert_eq!(kind_of(&classifier, &m), expected, "classification of {}", m.name);
        }
    }

    #[test]
    fn test_override_beats_convention() {
        let config = EntityConfig {
            methods: MethodOverrides {
                read_one: Some("fetchWidget".to_string()),
                delete: Some("getWidget".to_string()),
                ..Default::default()
            },
            ..EntityConfig::new("WidgetService")
        };
        let classifier = MethodClassifier::new(&config);

        assert_eq!(
            classifier.classify(&method("fetchWidget", &["long"], "Widget")),
            Classification::Kind(MethodKind::ReadOne, Basis::Override)
        );
        assert_eq!(
            classifier.classify(&method("getWidget", &["long"], "Widget")),
            Classification::Kind(MethodKind::Delete, Basis::Override)
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = MethodClassifier::new(&EntityConfig::new("WidgetService"));
        let m = method("getWidget", &["long"], "Widget");
        assert_eq!(classifier.classify(&m), classifier.classify(&m));
    }

    #[test]
    fn test_ambiguous_read_one() {
        let classifier = MethodClassifier::new(&EntityConfig::new("WidgetService"));
        let err = classifier
            .classify_all(
                "Widget",
                vec![
                    method("getWidget", &["long"], "Widget"),
                    method("getWidgetByCode", &["int"], "Widget"),
                ],
            )
            .unwrap_err();

        match err {
            GenerationError::AmbiguousClassification { kind, methods, .. } => {
                assert_eq!(kind, MethodKind::ReadOne);
                assert_eq!(methods, vec!["getWidget", "getWidgetByCode"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_override_resolves_ambiguity() {
        let config = EntityConfig {
            methods: MethodOverrides {
                read_one: Some("getWidgetByCode".to_string()),
                ..Default::default()
            },
            ..EntityConfig::new("WidgetService")
        };
        let set = MethodClassifier::new(&config)
            .classify_all(
                "Widget",
                vec![
                    method("getWidget", &["long"], "Widget"),
                    method("getWidgetByCode", &["int"], "Widget"),
                    method("toString", &[], "String"),
                ],
            )
            .unwrap();

        let kept: Vec<_> = set.methods.iter().map(|(m, k)| (m.name.as_str(), *k)).collect();
        assert_eq!(kept, vec![("getWidgetByCode", MethodKind::ReadOne)]);
        assert_eq!(set.warnings.len(), 2);
    }

    #[test]
    fn test_override_for_missing_method() {
        let config = EntityConfig {
            methods: MethodOverrides {
                update: Some("patchWidget".to_string()),
                ..Default::default()
            },
            ..EntityConfig::new("WidgetService")
        };
        let err = MethodClassifier::new(&config)
            .classify_all("Widget", vec![method("getWidget", &["long"], "Widget")])
            .unwrap_err();
        assert!(matches!(err, GenerationError::Introspection { .. }));
    }

    #[test]
    fn test_custom_finders_may_repeat() {
        let classifier = MethodClassifier::new(&EntityConfig::new("WidgetService"));
        let set = classifier
            .classify_all(
                "Widget",
                vec![
                    method("findByColor", &["String"], "List<Widget>"),
                    method("findBySize", &["int"], "List<Widget>"),
                ],
            )
            .unwrap();
        assert_eq!(set.methods.len(), 2);
        assert!(set.warnings.is_empty());
    }
}
