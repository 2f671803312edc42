//! # Declarative Schema
//!
//! Nested form definition consumed by renderers and exporters.
//!
//! ```text
//! [
//!   { "type": "text", "name": "email", "label": "Email" },
//!   { "type": "row", "fields": [ ... ] },
//!   { "type": "tabs", "tabs": [ { "name": "a", "label": "A", "fields": [ ... ] } ] }
//! ]
//! ```
//!
//! A schema document is either the bare array above or a wrapper object
//! `{ "fields": [...], "formName": "..." }`.

use crate::error::{SchemaError, SchemaResult};
use crate::field::{Config, Field, FieldKind, LayoutKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One field of the declarative schema, with its nested fields inline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(flatten)]
    pub config: Config,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tabs: Vec<TabDef>,
}

/// One tab of a tabs field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabDef {
    #[serde(flatten)]
    pub config: Config,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDef>,
}

impl FieldDef {
    pub fn new(field_type: impl Into<String>) -> Self {
        Self {
            field_type: field_type.into(),
            config: Config::new(),
            fields: Vec::new(),
            tabs: Vec::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldDef>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_tabs(mut self, tabs: Vec<TabDef>) -> Self {
        self.tabs = tabs;
        self
    }

    pub fn kind(&self) -> FieldKind {
        FieldKind::of(&self.field_type)
    }

    pub fn name(&self) -> Option<&str> {
        self.config.get("name").and_then(Value::as_str)
    }

    /// Flat projection: configuration without nested fields.
    ///
    /// For tabs the per-tab metadata is kept under `tabs`, always present
    /// (possibly empty) so a field without tabs stays without tabs.
    pub fn to_field(&self) -> Field {
        let mut config = self.config.clone();
        if self.kind() == FieldKind::Layout(LayoutKind::Tabs) {
            let tabs = self
                .tabs
                .iter()
                .map(|tab| Value::Object(tab.config.clone()))
                .collect();
            config.insert("tabs".to_string(), Value::Array(tabs));
        }
        Field::with_config(self.field_type.clone(), config)
    }
}

impl TabDef {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        let mut config = Config::new();
        config.insert("name".to_string(), Value::String(name.into()));
        config.insert("label".to_string(), Value::String(label.into()));
        Self {
            config,
            fields: Vec::new(),
        }
    }

    pub fn with_fields(mut self, fields: Vec<FieldDef>) -> Self {
        self.fields = fields;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.config.get("name").and_then(Value::as_str)
    }
}

/// Parsed schema document
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    pub fields: Vec<FieldDef>,
    pub form_name: Option<String>,
}

impl SchemaDocument {
    /// Parse either a bare field array or a `{ fields, formName }` wrapper
    pub fn from_value(value: Value) -> SchemaResult<Self> {
        let (fields, form_name) = match value {
            Value::Array(_) => (value, None),
            Value::Object(mut object) => {
                let fields = object.remove("fields").ok_or(SchemaError::NotASchema)?;
                let form_name = object
                    .get("formName")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                (fields, form_name)
            }
            _ => return Err(SchemaError::NotASchema),
        };

        if !fields.is_array() {
            return Err(SchemaError::NotASchema);
        }
        check_types(&fields, "fields")?;

        let fields: Vec<FieldDef> = serde_json::from_value(fields)?;
        Ok(Self { fields, form_name })
    }

    pub fn parse(source: &str) -> SchemaResult<Self> {
        let value: Value = serde_json::from_str(source)?;
        Self::from_value(value)
    }
}

/// Every schema entry must be an object with a non-empty string `type`
fn check_types(fields: &Value, path: &str) -> SchemaResult<()> {
    let Value::Array(items) = fields else {
        return Err(SchemaError::invalid_field(path, "expected an array of fields"));
    };

    for (index, item) in items.iter().enumerate() {
        let item_path = format!("{}[{}]", path, index);
        let Value::Object(object) = item else {
            return Err(SchemaError::invalid_field(item_path, "expected an object"));
        };

        match object.get("type").and_then(Value::as_str) {
            Some(t) if !t.trim().is_empty() => {}
            _ => {
                return Err(SchemaError::invalid_field(
                    item_path,
                    "missing field type",
                ))
            }
        }

        if let Some(nested) = object.get("fields") {
            check_types(nested, &format!("{}.fields", item_path))?;
        }

        if let Some(Value::Array(tabs)) = object.get("tabs") {
            for (tab_index, tab) in tabs.iter().enumerate() {
                if let Some(nested) = tab.get("fields") {
                    check_types(nested, &format!("{}.tabs[{}].fields", item_path, tab_index))?;
                }
            }
        }
    }

    Ok(())
}
