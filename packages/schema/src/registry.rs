//! # Field-Type Registry
//!
//! Per-type defaults used when a field is created from the palette and
//! when an imported schema is filled in.

use crate::field::{Config, Field, FieldKind};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Registry entry for one field type
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTypeInfo {
    pub kind: FieldKind,
    pub default_config: Config,
}

/// Known field types and their default configuration
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    types: BTreeMap<String, FieldTypeInfo>,
}

impl FieldRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the standard controls and layout containers
    pub fn with_builtin_types() -> Self {
        let mut registry = Self::new();

        for (type_name, label) in [
            ("text", "Text"),
            ("email", "Email"),
            ("password", "Password"),
            ("date", "Date"),
        ] {
            registry.register(
                type_name,
                json!({"name": type_name, "label": label, "placeholder": "", "required": false}),
            );
        }

        registry
            .register(
                "textarea",
                json!({"name": "textarea", "label": "Textarea", "placeholder": "", "rows": 3, "required": false}),
            )
            .register(
                "number",
                json!({"name": "number", "label": "Number", "required": false}),
            )
            .register(
                "select",
                json!({
                    "name": "select",
                    "label": "Select",
                    "options": [{"label": "Option 1", "value": "option1"}],
                    "required": false
                }),
            )
            .register(
                "radio",
                json!({
                    "name": "radio",
                    "label": "Radio",
                    "options": [{"label": "Option 1", "value": "option1"}],
                    "required": false
                }),
            )
            .register(
                "checkbox",
                json!({"name": "checkbox", "label": "Checkbox", "defaultValue": false}),
            )
            .register(
                "switch",
                json!({"name": "switch", "label": "Switch", "defaultValue": false}),
            )
            .register(
                "file",
                json!({"name": "file", "label": "File", "multiple": false, "required": false}),
            )
            .register("row", json!({}))
            .register("group", json!({"label": "Group"}))
            .register("collapsible", json!({"label": "Section", "collapsed": false}))
            .register("array", json!({"name": "items", "label": "Items"}))
            .register(
                "tabs",
                json!({"tabs": [
                    {"name": "tab1", "label": "Tab 1"},
                    {"name": "tab2", "label": "Tab 2"}
                ]}),
            );

        registry
    }

    /// Register (or replace) a type. Non-object defaults register as empty.
    pub fn register(&mut self, type_name: impl Into<String>, default_config: Value) -> &mut Self {
        let type_name = type_name.into();
        let default_config = match default_config {
            Value::Object(config) => config,
            _ => Config::new(),
        };

        self.types.insert(
            type_name.clone(),
            FieldTypeInfo {
                kind: FieldKind::of(&type_name),
                default_config,
            },
        );
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&FieldTypeInfo> {
        self.types.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Kind of a type, registered or not
    pub fn kind_of(&self, type_name: &str) -> FieldKind {
        self.get(type_name)
            .map(|info| info.kind)
            .unwrap_or_else(|| FieldKind::of(type_name))
    }

    pub fn default_config(&self, type_name: &str) -> Option<&Config> {
        self.get(type_name).map(|info| &info.default_config)
    }

    /// Fresh field from the type's defaults, `None` if unregistered
    pub fn instantiate(&self, type_name: &str) -> Option<Field> {
        self.get(type_name)
            .map(|info| Field::with_config(type_name, info.default_config.clone()))
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::LayoutKind;

    #[test]
    fn test_builtin_types() {
        let registry = FieldRegistry::with_builtin_types();

        assert!(registry.contains("text"));
        assert!(registry.contains("tabs"));
        assert_eq!(registry.kind_of("text"), FieldKind::Data);
        assert_eq!(registry.kind_of("row"), FieldKind::Layout(LayoutKind::Row));
        assert_eq!(registry.type_names().count(), 16);
    }

    #[test]
    fn test_instantiate_copies_defaults() {
        let registry = FieldRegistry::with_builtin_types();

        let field = registry.instantiate("text").unwrap();
        assert_eq!(field.field_type, "text");
        assert_eq!(field.name(), Some("text"));
        assert_eq!(field.get("required"), Some(&Value::Bool(false)));

        let tabs = registry.instantiate("tabs").unwrap();
        assert_eq!(tabs.tabs().len(), 2);
    }

    #[test]
    fn test_unregistered_type_misses() {
        let registry = FieldRegistry::with_builtin_types();
        assert!(registry.instantiate("signature").is_none());
        assert_eq!(registry.kind_of("signature"), FieldKind::Data);
    }

    #[test]
    fn test_register_custom_type() {
        let mut registry = FieldRegistry::new();
        registry.register("rating", json!({"name": "rating", "max": 5}));

        let field = registry.instantiate("rating").unwrap();
        assert_eq!(field.get("max"), Some(&json!(5)));
    }
}
