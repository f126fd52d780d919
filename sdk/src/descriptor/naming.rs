//! Naming conventions shared by introspection and rendering

use convert_case::{Case, Casing};

use super::MethodKind;

/// `WidgetType` -> `widget_type`, used for file and module names
pub fn module_name(entity: &str) -> String {
    entity.to_case(Case::Snake)
}

/// `WidgetType` -> `WIDGET_TYPE`
pub fn constant_name(entity: &str) -> String {
    module_name(entity).to_uppercase()
}

/// `WidgetType` -> `widgetType`
pub fn lower_camel(name: &str) -> String {
    name.to_case(Case::Camel)
}

pub fn pascal(name: &str) -> String {
    name.to_case(Case::Pascal)
}

pub fn snake(name: &str) -> String {
    name.to_case(Case::Snake)
}

/// English plural good enough for entity names
pub fn plural(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with('y')
        && !lower.ends_with("ay")
        && !lower.ends_with("ey")
        && !lower.ends_with("oy")
        && !lower.ends_with("uy")
    {
        format!("{}ies", &name[..name.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| lower.ends_with(suffix)) {
        format!("{name}es")
    } else {
        format!("{name}s")
    }
}

/// Conventional identifier field of an entity: `Widget` -> `widgetId`
pub fn id_field_name(entity: &str) -> String {
    format!("{}Id", lower_camel(entity))
}

/// Field name behind an accessor: `getDisplayName` -> `displayName`, `isActive` -> `active`
pub fn field_from_accessor(accessor: &str) -> Option<String> {
    let rest = accessor
        .strip_prefix("get")
        .or_else(|| accessor.strip_prefix("is"))?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    if !first.is_ascii_uppercase() {
        return None;
    }
    Some(first.to_ascii_lowercase().to_string() + chars.as_str())
}

/// Root field used when no operation name override is configured
pub fn default_root_field(kind: MethodKind, entity: &str, method: &str) -> String {
    match kind {
        MethodKind::ReadOne => lower_camel(entity),
        MethodKind::ReadAll => lower_camel(&plural(entity)),
        MethodKind::Create => format!("create{}", pascal(entity)),
        MethodKind::Update => format!("update{}", pascal(entity)),
        MethodKind::Delete => format!("delete{}", pascal(entity)),
        MethodKind::CustomFinder => method.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural() {
        assert_eq!(plural("Widget"), "Widgets");
        assert_eq!(plural("Category"), "Categories");
        assert_eq!(plural("Key"), "Keys");
        assert_eq!(plural("Box"), "Boxes");
        assert_eq!(plural("Address"), "Addresses");
    }

    #[test]
    fn test_accessor_names() {
        assert_eq!(field_from_accessor("getDisplayName").as_deref(), Some("displayName"));
        assert_eq!(field_from_accessor("isActive").as_deref(), Some("active"));
        assert_eq!(field_from_accessor("getter"), None);
        assert_eq!(field_from_accessor("get"), None);
        assert_eq!(field_from_accessor("toString"), None);
    }

    #[test]
    fn test_default_root_fields() {
        assert_eq!(default_root_field(MethodKind::ReadOne, "BlogEntry", "getBlogEntry"), "blogEntry");
        assert_eq!(default_root_field(MethodKind::ReadAll, "BlogEntry", "getBlogEntries"), "blogEntries");
        assert_eq!(default_root_field(MethodKind::Create, "Widget", "addWidget"), "createWidget");
        assert_eq!(default_root_field(MethodKind::CustomFinder, "Widget", "findByColor"), "findByColor");
    }

    #[test]
    fn test_module_and_constant_names() {
        assert_eq!(module_name("BlogEntry"), "blog_entry");
        assert_eq!(constant_name("BlogEntry"), "BLOG_ENTRY");
        assert_eq!(id_field_name("BlogEntry"), "blogEntryId");
    }
}
