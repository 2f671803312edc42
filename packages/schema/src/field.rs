use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form field configuration (everything except the `type` tag)
pub type Config = Map<String, Value>;

/// Container kinds that own nested fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Row,
    Group,
    Collapsible,
    Array,
    Tabs,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 5] = [
        LayoutKind::Row,
        LayoutKind::Group,
        LayoutKind::Collapsible,
        LayoutKind::Array,
        LayoutKind::Tabs,
    ];

    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "row" => Some(LayoutKind::Row),
            "group" => Some(LayoutKind::Group),
            "collapsible" => Some(LayoutKind::Collapsible),
            "array" => Some(LayoutKind::Array),
            "tabs" => Some(LayoutKind::Tabs),
            _ => None,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            LayoutKind::Row => "row",
            LayoutKind::Group => "group",
            LayoutKind::Collapsible => "collapsible",
            LayoutKind::Array => "array",
            LayoutKind::Tabs => "tabs",
        }
    }

    /// Whether a container of this kind accepts a direct child of `child` kind.
    ///
    /// Rows lay their children out horizontally and only take leaf controls.
    pub fn accepts(self, child: FieldKind) -> bool {
        match self {
            LayoutKind::Row => !child.is_layout(),
            LayoutKind::Group | LayoutKind::Collapsible | LayoutKind::Array | LayoutKind::Tabs => {
                true
            }
        }
    }
}

/// Data fields carry a form-value key; layout fields own nested fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Data,
    Layout(LayoutKind),
}

impl FieldKind {
    /// Classify a field type name
    pub fn of(type_name: &str) -> Self {
        LayoutKind::from_type_name(type_name)
            .map(FieldKind::Layout)
            .unwrap_or(FieldKind::Data)
    }

    pub fn is_layout(self) -> bool {
        matches!(self, FieldKind::Layout(_))
    }

    pub fn layout(self) -> Option<LayoutKind> {
        match self {
            FieldKind::Layout(kind) => Some(kind),
            FieldKind::Data => None,
        }
    }
}

/// Declared tab metadata as stored on a tabs field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabMeta {
    pub name: Option<String>,
    pub label: Option<String>,
}

/// A single field configuration, tagged by its `type`
///
/// The flat tree stores one `Field` per node. Nesting is not part of the
/// field: containers keep their children in the node, and a tabs field only
/// records per-tab metadata under `tabs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(flatten)]
    pub config: Config,
}

impl Field {
    pub fn new(field_type: impl Into<String>) -> Self {
        Self {
            field_type: field_type.into(),
            config: Config::new(),
        }
    }

    pub fn with_config(field_type: impl Into<String>, config: Config) -> Self {
        Self {
            field_type: field_type.into(),
            config,
        }
    }

    /// Builder-style setter for a single config key
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> FieldKind {
        FieldKind::of(&self.field_type)
    }

    pub fn is_layout(&self) -> bool {
        self.kind().is_layout()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    pub fn name(&self) -> Option<&str> {
        self.config.get("name").and_then(Value::as_str)
    }

    /// Form-value key, only for data fields
    pub fn data_name(&self) -> Option<&str> {
        match self.kind() {
            FieldKind::Data => self.name(),
            FieldKind::Layout(_) => None,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.config.insert("name".to_string(), Value::String(name.into()));
    }

    pub fn label(&self) -> Option<&str> {
        self.config.get("label").and_then(Value::as_str)
    }

    /// Declared tabs in order. Empty for anything but a tabs field.
    pub fn tabs(&self) -> Vec<TabMeta> {
        if self.kind() != FieldKind::Layout(LayoutKind::Tabs) {
            return Vec::new();
        }

        let Some(Value::Array(entries)) = self.config.get("tabs") else {
            return Vec::new();
        };

        entries
            .iter()
            .map(|entry| TabMeta {
                name: entry.get("name").and_then(Value::as_str).map(str::to_string),
                label: entry.get("label").and_then(Value::as_str).map(str::to_string),
            })
            .collect()
    }

    /// JSON object form (`type` plus config)
    pub fn to_value(&self) -> Value {
        let mut object = Map::with_capacity(self.config.len() + 1);
        object.insert("type".to_string(), Value::String(self.field_type.clone()));
        for (key, value) in &self.config {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}
