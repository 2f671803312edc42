//! Browser bindings: a [`FormBuilder`] wraps one editing session and
//! speaks JSON strings in and out.
//!
//! Every method has a plain Rust twin returning `Result<_, String>` so the
//! bindings can be tested off-wasm.

use formsmith_editor::{
    DragController, DragGeometry, DragSource, DropOutcome, EditorConfig, FieldRegistry, FormStore,
    IndicatorUpdate, OverTarget, SystemClock,
};
use formsmith_workspace::{envelope_from_store, ImportSession, ImportState, Loader};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_js(err: String) -> JsValue {
    JsValue::from_str(&err)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

#[wasm_bindgen]
pub struct FormBuilder {
    store: FormStore,
    drag: DragController,
    loader: Loader,
}

impl FormBuilder {
    pub fn from_config(config_json: Option<&str>) -> Result<FormBuilder, String> {
        let config: EditorConfig = match config_json {
            Some(raw) if !raw.trim().is_empty() => {
                serde_json::from_str(raw).map_err(|e| format!("Invalid config: {}", e))?
            }
            _ => EditorConfig::default(),
        };

        Ok(Self {
            store: FormStore::with_clock(
                FieldRegistry::with_builtin_types(),
                &config,
                Arc::new(SystemClock),
            ),
            drag: DragController::new(config.resolver()),
            loader: Loader::new(),
        })
    }

    pub fn store(&self) -> &FormStore {
        &self.store
    }

    pub fn create(
        &mut self,
        field_type: &str,
        parent_id: Option<&str>,
        index: usize,
        parent_slot: Option<&str>,
    ) -> Result<Option<String>, String> {
        self.store
            .create_node(field_type, parent_id, index, parent_slot)
            .map_err(|e| e.to_string())
    }

    pub fn update(&mut self, node_id: &str, patch_json: &str) -> Result<bool, String> {
        let patch: Value =
            serde_json::from_str(patch_json).map_err(|e| format!("Invalid patch: {}", e))?;
        self.store.update_node(node_id, patch).map_err(|e| e.to_string())
    }

    pub fn drag_over(&mut self, over: Option<&str>, geometry_json: &str) -> Result<String, String> {
        let geometry: DragGeometry = serde_json::from_str(geometry_json)
            .map_err(|e| format!("Invalid geometry: {}", e))?;
        let over = over.map(OverTarget::parse);

        let update = self.drag.on_move(&mut self.store, over.as_ref(), &geometry);
        Ok(match update {
            IndicatorUpdate::Unchanged => "unchanged",
            IndicatorUpdate::Set => "set",
            IndicatorUpdate::Cleared => "cleared",
        }
        .to_string())
    }

    pub fn drop_drag(&mut self) -> Result<String, String> {
        let outcome = self.drag.drop(&mut self.store).map_err(|e| e.to_string())?;
        let value = match outcome {
            DropOutcome::Aborted => json!({"kind": "aborted"}),
            DropOutcome::Created(id) => json!({"kind": "created", "nodeId": id}),
            DropOutcome::Moved => json!({"kind": "moved"}),
            DropOutcome::Unchanged => json!({"kind": "unchanged"}),
        };
        to_json(&value)
    }

    pub fn fields_json(&self) -> Result<String, String> {
        self.store.fields_json().map_err(|e| e.to_string())
    }

    /// Apply a serialized mutation; returns `{changed, nodeId}`
    pub fn apply_mutation(&mut self, mutation_json: &str) -> Result<String, String> {
        let result = self.store.apply_json(mutation_json).map_err(|e| e.to_string())?;
        to_json(&json!({"changed": result.changed, "nodeId": result.node_id}))
    }

    pub fn save(&self) -> Result<String, String> {
        let envelope = envelope_from_store(&self.store, self.store.now_ms());
        envelope.to_json_pretty().map_err(|e| e.to_string())
    }

    pub fn load(&mut self, source: &str) -> Result<(), String> {
        let envelope = self
            .loader
            .load_str(source, self.store.now_ms())
            .map_err(|e| e.to_string())?;
        let (tree, meta) = envelope.into_parts();
        self.store.load_document(tree, meta);
        Ok(())
    }

    /// Validate and apply an envelope or a schema in one go. Returns the
    /// duplicate field names found.
    pub fn import(&mut self, source: &str) -> Result<Vec<String>, String> {
        let mut session = ImportSession::new();
        let duplicates = match session.begin(source, self.store.now_ms()) {
            ImportState::PendingConfirmation(candidate) => candidate.duplicate_names.clone(),
            ImportState::Failed(err) => return Err(err.to_string()),
            other => return Err(format!("unexpected import state: {}", other.name())),
        };
        session.confirm(&mut self.store);
        Ok(duplicates)
    }

    pub fn snapshot_value(&self) -> Value {
        json!({
            "nodes": self.store.nodes(),
            "rootIds": self.store.root_ids(),
            "selectedId": self.store.selected_id(),
            "dropIndicator": self.store.drop_indicator(),
            "activeId": self.store.active_id(),
            "formName": self.store.meta().form_name,
            "canUndo": self.store.can_undo(),
            "canRedo": self.store.can_redo(),
            "version": self.store.version(),
        })
    }
}

#[wasm_bindgen]
impl FormBuilder {
    /// `config` is an optional JSON editor config
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>) -> Result<FormBuilder, JsValue> {
        Self::from_config(config.as_deref()).map_err(to_js)
    }

    /// Returns the new node id, or undefined for an unknown field type
    #[wasm_bindgen(js_name = createNode)]
    pub fn create_node(
        &mut self,
        field_type: &str,
        parent_id: Option<String>,
        index: usize,
        parent_slot: Option<String>,
    ) -> Result<Option<String>, JsValue> {
        self.create(field_type, parent_id.as_deref(), index, parent_slot.as_deref())
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = moveNode)]
    pub fn move_node(
        &mut self,
        node_id: &str,
        new_parent_id: Option<String>,
        index: usize,
        parent_slot: Option<String>,
    ) -> Result<bool, JsValue> {
        self.store
            .move_node(node_id, new_parent_id.as_deref(), index, parent_slot.as_deref())
            .map_err(|e| to_js(e.to_string()))
    }

    #[wasm_bindgen(js_name = removeNode)]
    pub fn remove_node(&mut self, node_id: &str) -> Result<(), JsValue> {
        self.store.remove_node(node_id).map_err(|e| to_js(e.to_string()))
    }

    #[wasm_bindgen(js_name = duplicateNode)]
    pub fn duplicate_node(&mut self, node_id: &str) -> Result<String, JsValue> {
        self.store.duplicate_node(node_id).map_err(|e| to_js(e.to_string()))
    }

    /// `patch` is a JSON object deep-merged into the node's field
    #[wasm_bindgen(js_name = updateNode)]
    pub fn update_node(&mut self, node_id: &str, patch: &str) -> Result<bool, JsValue> {
        self.update(node_id, patch).map_err(to_js)
    }

    #[wasm_bindgen(js_name = applyMutation)]
    pub fn apply(&mut self, mutation: &str) -> Result<String, JsValue> {
        self.apply_mutation(mutation).map_err(to_js)
    }

    #[wasm_bindgen(js_name = selectNode)]
    pub fn select_node(&mut self, node_id: Option<String>) {
        self.store.select_node(node_id.as_deref());
    }

    /// `marker` is a node id, or `new:<type>` for a palette entry
    #[wasm_bindgen(js_name = dragStart)]
    pub fn drag_start(&mut self, marker: &str) {
        self.drag.start(&mut self.store, DragSource::parse(marker));
    }

    /// `over` is `root`, a node id, or `dropzone:<parent>[:<slot>]`;
    /// `geometry` is `{active: Rect, over: Rect}`. Returns
    /// `unchanged`, `set` or `cleared`.
    #[wasm_bindgen(js_name = dragMove)]
    pub fn drag_move(&mut self, over: Option<String>, geometry: &str) -> Result<String, JsValue> {
        self.drag_over(over.as_deref(), geometry).map_err(to_js)
    }

    #[wasm_bindgen(js_name = dragDrop)]
    pub fn drag_drop(&mut self) -> Result<String, JsValue> {
        self.drop_drag().map_err(to_js)
    }

    #[wasm_bindgen(js_name = dragCancel)]
    pub fn drag_cancel(&mut self) {
        self.drag.cancel(&mut self.store);
    }

    pub fn undo(&mut self) -> bool {
        self.store.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.store.redo()
    }

    /// Commit a due history entry; call from a host timer
    pub fn tick(&mut self) -> bool {
        self.store.tick()
    }

    /// Epoch ms at which `tick` next has work, if any
    #[wasm_bindgen(js_name = nextTick)]
    pub fn next_tick(&self) -> Option<f64> {
        self.store.next_history_deadline().map(|ms| ms as f64)
    }

    pub fn clear(&mut self) {
        self.store.clear_state();
    }

    #[wasm_bindgen(js_name = setFormName)]
    pub fn set_form_name(&mut self, name: &str) {
        self.store.set_form_name(name);
    }

    #[wasm_bindgen(js_name = toFields)]
    pub fn to_fields(&self) -> Result<String, JsValue> {
        self.fields_json().map_err(to_js)
    }

    #[wasm_bindgen(js_name = saveEnvelope)]
    pub fn save_envelope(&self) -> Result<String, JsValue> {
        self.save().map_err(to_js)
    }

    #[wasm_bindgen(js_name = loadEnvelope)]
    pub fn load_envelope(&mut self, source: &str) -> Result<(), JsValue> {
        self.load(source).map_err(to_js)
    }

    /// Returns a JSON array of duplicate field names
    #[wasm_bindgen(js_name = importDocument)]
    pub fn import_document(&mut self, source: &str) -> Result<String, JsValue> {
        let duplicates = self.import(source).map_err(to_js)?;
        to_json(&duplicates).map_err(to_js)
    }

    /// Nodes, root ids, selection and drag indicator as JSON
    pub fn snapshot(&self) -> Result<String, JsValue> {
        to_json(&self.snapshot_value()).map_err(to_js)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(active_top: f64, over_top: f64, over_height: f64) -> String {
        json!({
            "active": {"left": 0.0, "top": active_top, "width": 100.0, "height": 20.0},
            "over": {"left": 0.0, "top": over_top, "width": 100.0, "height": over_height}
        })
        .to_string()
    }

    #[test]
    fn test_create_and_export() {
        let mut builder = FormBuilder::from_config(None).unwrap();
        let id = builder.create("email", None, 0, None).unwrap();
        assert!(id.is_some());
        assert_eq!(builder.create("no-such-type", None, 0, None).unwrap(), None);

        let fields: Value = serde_json::from_str(&builder.fields_json().unwrap()).unwrap();
        assert_eq!(fields[0]["type"], "email");
    }

    #[test]
    fn test_palette_drag_into_group() {
        let mut builder = FormBuilder::from_config(Some(r#"{"coalesceMs": 0}"#)).unwrap();
        let group = builder.create("group", None, 0, None).unwrap().unwrap();

        builder.drag.start(&mut builder.store, DragSource::parse("new:text"));
        let update = builder.drag_over(Some(&group), &geometry(140.0, 100.0, 200.0)).unwrap();
        assert_eq!(update, "set");

        let outcome: Value = serde_json::from_str(&builder.drop_drag().unwrap()).unwrap();
        assert_eq!(outcome["kind"], "created");
        assert_eq!(builder.store().get(&group).unwrap().children.len(), 1);

        let snapshot = builder.snapshot_value();
        assert_eq!(snapshot["dropIndicator"], Value::Null);
        assert_eq!(snapshot["activeId"], Value::Null);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let mut builder = FormBuilder::from_config(None).unwrap();
        builder.create("text", None, 0, None).unwrap();
        let saved = builder.save().unwrap();

        let mut other = FormBuilder::from_config(None).unwrap();
        other.load(&saved).unwrap();
        assert_eq!(other.store().nodes(), builder.store().nodes());
        assert!(other.load("{}").is_ok());
        assert!(other.load("nope").is_err());
    }

    #[test]
    fn test_import_reports_duplicates() {
        let mut builder = FormBuilder::from_config(None).unwrap();
        let duplicates = builder
            .import(r#"[{"type": "text", "name": "a"}, {"type": "text", "name": "a"}]"#)
            .unwrap();
        assert_eq!(duplicates, vec!["a".to_string()]);
        assert_eq!(builder.store().root_ids().len(), 2);
    }

    #[test]
    fn test_invalid_patch_is_reported() {
        let mut builder = FormBuilder::from_config(None).unwrap();
        let id = builder.create("text", None, 0, None).unwrap().unwrap();
        assert!(builder.update(&id, "not json").is_err());
        assert!(builder.update(&id, r#"{"label": "Name"}"#).unwrap());
    }

    #[test]
    fn test_serialized_mutation() {
        let mut builder = FormBuilder::from_config(None).unwrap();
        let id = builder.create("text", None, 0, None).unwrap().unwrap();

        let mutation = json!({"kind": "duplicateNode", "nodeId": id}).to_string();
        let result: Value = serde_json::from_str(&builder.apply_mutation(&mutation).unwrap()).unwrap();
        assert_eq!(result["changed"], true);
        assert!(result["nodeId"].is_string());
        assert_eq!(builder.store().root_ids().len(), 2);

        assert!(builder.apply_mutation(r#"{"kind": "teleport"}"#).is_err());
    }
}
