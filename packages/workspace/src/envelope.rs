//! # Document Envelope
//!
//! The persisted form of an editing session: the flat node map, root
//! ordering and document identity behind a schema version.
//!
//! ```text
//! {
//!   "schemaVersion": 1,
//!   "builderVersion": "0.1.0",
//!   "formId": "…", "formName": "Signup",
//!   "nodes": { "<id>": { "id", "field", "parentId", "parentSlot", "children", "tabChildren"? } },
//!   "rootIds": ["<id>", …],
//!   "createdAt": 1700000000000, "updatedAt": 1700000000000
//! }
//! ```

use formsmith_editor::{DocumentMeta, FormStore, FormTree, Millis, NodeId, NodeMap};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CURRENT_SCHEMA_VERSION: u64 = 1;

pub const BUILDER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub schema_version: u64,
    pub builder_version: String,
    pub form_id: String,
    pub form_name: String,
    pub nodes: NodeMap,
    pub root_ids: Vec<NodeId>,
    pub created_at: Millis,
    pub updated_at: Millis,
}

/// Listing entry for a stored form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub form_id: String,
    pub form_name: String,
    pub updated_at: Millis,
}

impl Envelope {
    /// Capture the tree and metadata as a fresh current-version envelope
    pub fn new(tree: &FormTree, meta: &DocumentMeta, now_ms: Millis) -> Self {
        let mut nodes = tree.nodes().clone();
        for node in nodes.values_mut() {
            strip_map(&mut node.field.config);
        }

        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            builder_version: BUILDER_VERSION.to_string(),
            form_id: meta.form_id.clone(),
            form_name: meta.form_name.clone(),
            nodes,
            root_ids: tree.root_ids().to_vec(),
            created_at: meta.created_at,
            updated_at: now_ms,
        }
    }

    pub fn tree(&self) -> FormTree {
        FormTree::from_parts(self.nodes.clone(), self.root_ids.clone())
    }

    pub fn meta(&self) -> DocumentMeta {
        DocumentMeta {
            form_id: self.form_id.clone(),
            form_name: self.form_name.clone(),
            created_at: self.created_at,
        }
    }

    pub fn into_parts(self) -> (FormTree, DocumentMeta) {
        let meta = DocumentMeta {
            form_id: self.form_id,
            form_name: self.form_name,
            created_at: self.created_at,
        };
        (FormTree::from_parts(self.nodes, self.root_ids), meta)
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            form_id: self.form_id.clone(),
            form_name: self.form_name.clone(),
            updated_at: self.updated_at,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Save the store's current document
pub fn envelope_from_store(store: &FormStore, now_ms: Millis) -> Envelope {
    Envelope::new(store.tree(), store.meta(), now_ms)
}

/// Drop object-valued entries that are empty once their own contents are
/// stripped. Arrays keep their length.
fn strip_empty_objects(value: &mut Value) {
    match value {
        Value::Object(object) => strip_map(object),
        Value::Array(items) => items.iter_mut().for_each(strip_empty_objects),
        _ => {}
    }
}

fn strip_map(object: &mut Map<String, Value>) {
    for value in object.values_mut() {
        strip_empty_objects(value);
    }
    object.retain(|_, value| !matches!(value, Value::Object(inner) if inner.is_empty()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use formsmith_editor::{Field, Node};
    use serde_json::json;

    fn tree_with(field: Field) -> FormTree {
        let mut nodes = NodeMap::new();
        nodes.insert("a".to_string(), Node::new("a", field, None, None));
        FormTree::from_parts(nodes, vec!["a".to_string()])
    }

    fn meta() -> DocumentMeta {
        DocumentMeta {
            form_id: "form-1".to_string(),
            form_name: "Signup".to_string(),
            created_at: 100,
        }
    }

    #[test]
    fn test_save_strips_empty_nested_objects() {
        let field = Field::new("text")
            .with("name", "email")
            .with("validation", json!({"rules": {}, "required": true}))
            .with("style", json!({}))
            .with("options", json!([{}, {"meta": {}}]));

        let envelope = Envelope::new(&tree_with(field), &meta(), 200);
        let saved = &envelope.nodes["a"].field;

        assert_eq!(saved.get("validation"), Some(&json!({"required": true})));
        assert_eq!(saved.get("style"), None);
        assert_eq!(saved.get("options"), Some(&json!([{}, {}])));
    }

    #[test]
    fn test_save_keeps_empty_top_level_field() {
        let envelope = Envelope::new(&tree_with(Field::new("row")), &meta(), 200);
        assert_eq!(envelope.nodes["a"].field, Field::new("row"));
    }

    #[test]
    fn test_save_stamps_times_and_version() {
        let envelope = Envelope::new(&tree_with(Field::new("text")), &meta(), 200);

        assert_eq!(envelope.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(envelope.builder_version, BUILDER_VERSION);
        assert_eq!(envelope.created_at, 100);
        assert_eq!(envelope.updated_at, 200);
    }

    #[test]
    fn test_save_does_not_share_live_data() {
        let tree = tree_with(Field::new("text").with("name", "a"));
        let envelope = Envelope::new(&tree, &meta(), 0);
        let (restored, restored_meta) = envelope.clone().into_parts();

        assert_eq!(restored.nodes(), tree.nodes());
        assert!(!restored.ptr_eq(&tree));
        assert_eq!(restored_meta, meta());
    }

    #[test]
    fn test_envelope_json_is_camel_case() {
        let envelope = Envelope::new(&tree_with(Field::new("text")), &meta(), 5);
        let value = serde_json::to_value(&envelope).unwrap();

        for key in ["schemaVersion", "builderVersion", "formId", "formName", "rootIds", "createdAt", "updatedAt"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["nodes"]["a"]["parentId"], Value::Null);
    }
}
