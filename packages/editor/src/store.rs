//! # Form Store
//!
//! The application-owned editing state: the tree, its document metadata,
//! non-structural UI state and the undo history.
//!
//! ## Lifecycle
//!
//! ```text
//! new / clear_state → create/move/remove/duplicate/update → tick → undo/redo
//!                       ↓                                          ↑
//!                  history.record(before)  ───── coalesced ────────┘
//! ```
//!
//! Every structural operation runs to completion before returning. A
//! rejected operation restores the tree it started from. Selection,
//! drop indicator, viewport and mode changes never enter history.
//!
//! The store is single-writer: hosts pin it to one thread or wrap it in a
//! lock.

use crate::clock::{Clock, Millis, SystemClock};
use crate::codec;
use crate::config::EditorConfig;
use crate::errors::EditorError;
use crate::mutations::{Mutation, MutationContext, MutationError, MutationResult};
use crate::tree::{DropLocation, FormTree, Node, NodeId, NodeMap};
use crate::undo_stack::UndoStack;
use formsmith_schema::{new_form_id, FieldDef, FieldRegistry, IDGenerator, SchemaDocument};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_FORM_NAME: &str = "Untitled form";

pub const MIN_ZOOM: f64 = 0.25;
pub const MAX_ZOOM: f64 = 4.0;

/// Identity of the document being edited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    pub form_id: String,
    pub form_name: String,
    pub created_at: Millis,
}

impl DocumentMeta {
    /// Fresh document with a new id
    pub fn new(now: Millis) -> Self {
        Self {
            form_id: new_form_id(),
            form_name: DEFAULT_FORM_NAME.to_string(),
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    #[default]
    Edit,
    Preview,
}

pub struct FormStore {
    tree: FormTree,
    meta: DocumentMeta,
    registry: FieldRegistry,
    ids: IDGenerator,
    history: UndoStack,
    clock: Arc<dyn Clock>,

    selected_id: Option<NodeId>,
    drop_indicator: Option<DropLocation>,
    active_id: Option<String>,
    viewport: Viewport,
    mode: EditorMode,

    /// Bumped on every change of the tree
    version: u64,
}

impl fmt::Debug for FormStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormStore")
            .field("meta", &self.meta)
            .field("nodes", &self.tree.len())
            .field("selected_id", &self.selected_id)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl Default for FormStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FormStore {
    /// Empty store with the builtin field types and default settings
    pub fn new() -> Self {
        Self::with_config(FieldRegistry::with_builtin_types(), &EditorConfig::default())
    }

    pub fn with_config(registry: FieldRegistry, config: &EditorConfig) -> Self {
        Self::with_clock(registry, config, Arc::new(SystemClock))
    }

    pub fn with_clock(registry: FieldRegistry, config: &EditorConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_ms();
        Self {
            tree: FormTree::new(),
            meta: DocumentMeta::new(now),
            registry,
            ids: IDGenerator::new(),
            history: UndoStack::with_limits(config.history_limit, config.coalesce_ms),
            clock,
            selected_id: None,
            drop_indicator: None,
            active_id: None,
            viewport: Viewport::default(),
            mode: EditorMode::Edit,
            version: 0,
        }
    }

    /// Use a deterministic id generator (tests, reproducible imports)
    pub fn with_ids(mut self, ids: IDGenerator) -> Self {
        self.ids = ids;
        self
    }

    pub fn tree(&self) -> &FormTree {
        &self.tree
    }

    pub fn nodes(&self) -> &NodeMap {
        self.tree.nodes()
    }

    pub fn root_ids(&self) -> &[NodeId] {
        self.tree.root_ids()
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.tree.get(id)
    }

    pub fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    pub fn drop_indicator(&self) -> Option<&DropLocation> {
        self.drop_indicator.as_ref()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn now_ms(&self) -> Millis {
        self.clock.now_ms()
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Apply a mutation as one transaction
    pub fn apply(&mut self, mutation: Mutation) -> Result<MutationResult, MutationError> {
        let before = self.tree.clone();
        let mut ctx = MutationContext {
            registry: &self.registry,
            ids: &mut self.ids,
        };

        match mutation.apply(&mut self.tree, &mut ctx) {
            Ok(result) => {
                if result.changed {
                    self.history.record(&before, self.clock.now_ms());
                    self.version += 1;
                }
                Ok(result)
            }
            Err(e) => {
                self.tree = before;
                Err(e)
            }
        }
    }

    /// Apply a mutation given in its serialized form, e.g.
    /// `{"kind": "removeNode", "nodeId": "a-1"}`
    pub fn apply_json(&mut self, source: &str) -> Result<MutationResult, EditorError> {
        let mutation: Mutation = serde_json::from_str(source)?;
        Ok(self.apply(mutation)?)
    }

    /// Create a registry-default field and select it.
    ///
    /// Returns `Ok(None)` without touching anything when the type is not
    /// registered.
    pub fn create_node(
        &mut self,
        field_type: &str,
        parent_id: Option<&str>,
        index: usize,
        parent_slot: Option<&str>,
    ) -> Result<Option<NodeId>, MutationError> {
        let mutation = Mutation::CreateNode {
            field_type: field_type.to_string(),
            parent_id: parent_id.map(str::to_string),
            index,
            parent_slot: parent_slot.map(str::to_string),
        };

        match self.apply(mutation) {
            Ok(result) => {
                if let Some(id) = &result.node_id {
                    self.selected_id = Some(id.clone());
                }
                Ok(result.node_id)
            }
            Err(MutationError::UnknownFieldType(field_type)) => {
                debug!(field_type = %field_type, "Ignoring unregistered field type");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "Create rejected");
                Err(e)
            }
        }
    }

    /// Returns whether the tree changed
    pub fn move_node(
        &mut self,
        node_id: &str,
        new_parent_id: Option<&str>,
        index: usize,
        parent_slot: Option<&str>,
    ) -> Result<bool, MutationError> {
        let mutation = Mutation::MoveNode {
            node_id: node_id.to_string(),
            new_parent_id: new_parent_id.map(str::to_string),
            index,
            parent_slot: parent_slot.map(str::to_string),
        };

        self.apply(mutation)
            .map(|result| result.changed)
            .inspect_err(|e| warn!(node_id = %node_id, error = %e, "Move rejected"))
    }

    pub fn remove_node(&mut self, node_id: &str) -> Result<(), MutationError> {
        self.apply(Mutation::RemoveNode {
            node_id: node_id.to_string(),
        })
        .inspect_err(|e| warn!(node_id = %node_id, error = %e, "Remove rejected"))?;

        self.drop_stale_selection();
        Ok(())
    }

    /// Clone a subtree next to the original and select the clone
    pub fn duplicate_node(&mut self, node_id: &str) -> Result<NodeId, MutationError> {
        let result = self
            .apply(Mutation::DuplicateNode {
                node_id: node_id.to_string(),
            })
            .inspect_err(|e| warn!(node_id = %node_id, error = %e, "Duplicate rejected"))?;

        let clone = result
            .node_id
            .ok_or_else(|| MutationError::NodeNotFound(node_id.to_string()))?;
        self.selected_id = Some(clone.clone());
        Ok(clone)
    }

    /// Deep-merge `patch` into the node's field. Returns whether it changed.
    pub fn update_node(&mut self, node_id: &str, patch: Value) -> Result<bool, MutationError> {
        let result = self
            .apply(Mutation::UpdateNode {
                node_id: node_id.to_string(),
                patch,
            })
            .inspect_err(|e| warn!(node_id = %node_id, error = %e, "Update rejected"))?;

        // Removing a tab removes the fields inside it
        self.drop_stale_selection();
        Ok(result.changed)
    }

    /// Select a node, or clear the selection. Unknown ids clear it.
    pub fn select_node(&mut self, node_id: Option<&str>) {
        self.selected_id = node_id
            .filter(|id| self.tree.contains(id))
            .map(str::to_string);
    }

    /// Returns false when the indicator already showed `location`
    pub fn set_drop_indicator(&mut self, location: Option<DropLocation>) -> bool {
        if self.drop_indicator == location {
            return false;
        }
        self.drop_indicator = location;
        true
    }

    pub fn set_active_id(&mut self, active_id: Option<String>) {
        self.active_id = active_id;
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.viewport.zoom = if zoom.is_finite() {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            1.0
        };
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.viewport.pan_x += dx;
        self.viewport.pan_y += dy;
    }

    pub fn reset_viewport(&mut self) {
        self.viewport = Viewport::default();
    }

    pub fn set_mode(&mut self, mode: EditorMode) {
        self.mode = mode;
    }

    pub fn set_form_name(&mut self, name: impl Into<String>) {
        self.meta.form_name = name.into();
    }

    /// Reset to an empty document with a new form id. The reset itself is
    /// not undoable and history starts over.
    pub fn clear_state(&mut self) {
        self.history.pause();

        self.tree = FormTree::new();
        self.meta = DocumentMeta::new(self.clock.now_ms());
        self.clear_ui_state();
        self.version += 1;

        self.history.clear();
        self.history.resume();

        info!(form_id = %self.meta.form_id, "Cleared document");
    }

    /// Replace the whole tree as one undoable change (schema import)
    pub fn replace_tree(&mut self, tree: FormTree) {
        let before = std::mem::replace(&mut self.tree, tree);
        self.history.record(&before, self.clock.now_ms());
        self.version += 1;

        self.drop_stale_selection();
        self.drop_indicator = None;
        self.active_id = None;

        info!(nodes = self.tree.len(), "Replaced tree");
    }

    /// Replace the tree with one built from a declarative schema
    pub fn replace_with_fields(&mut self, fields: &[FieldDef]) {
        let tree = codec::from_fields(fields, &self.registry, &mut self.ids);
        self.replace_tree(tree);
    }

    /// [`FormStore::replace_with_fields`] from schema JSON. Sets the form
    /// name when the document carries one.
    pub fn replace_with_schema_json(&mut self, source: &str) -> Result<(), EditorError> {
        let document = SchemaDocument::parse(source)?;
        self.replace_with_fields(&document.fields);
        if let Some(name) = document.form_name {
            self.set_form_name(name);
        }
        Ok(())
    }

    /// Open a document: tree and metadata are replaced and history restarts
    pub fn load_document(&mut self, tree: FormTree, meta: DocumentMeta) {
        self.tree = tree;
        self.meta = meta;
        self.clear_ui_state();
        self.history.clear();
        self.version += 1;

        info!(form_id = %self.meta.form_id, nodes = self.tree.len(), "Loaded document");
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.undo(&self.tree) else {
            return false;
        };

        self.tree = previous;
        self.version += 1;
        self.drop_stale_selection();
        debug!(version = self.version, "Undo");
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo(&self.tree) else {
            return false;
        };

        self.tree = next;
        self.version += 1;
        self.drop_stale_selection();
        debug!(version = self.version, "Redo");
        true
    }

    /// Drive history coalescing. Returns true when an entry was committed.
    pub fn tick(&mut self) -> bool {
        self.history.poll(self.clock.now_ms())
    }

    pub fn flush_history(&mut self) {
        self.history.flush();
    }

    pub fn next_history_deadline(&self) -> Option<Millis> {
        self.history.next_deadline()
    }

    /// Nested schema projection of the current tree
    pub fn to_fields(&self) -> Vec<FieldDef> {
        codec::to_fields(&self.tree, &self.registry)
    }

    pub fn fields_json(&self) -> Result<String, EditorError> {
        Ok(serde_json::to_string(&self.to_fields())?)
    }

    pub fn field_names(&self) -> Vec<String> {
        codec::all_field_names(&self.tree)
    }

    fn clear_ui_state(&mut self) {
        self.selected_id = None;
        self.drop_indicator = None;
        self.active_id = None;
        self.viewport = Viewport::default();
    }

    fn drop_stale_selection(&mut self) {
        if let Some(id) = &self.selected_id {
            if !self.tree.contains(id) {
                self.selected_id = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    fn store() -> (FormStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = FormStore::with_clock(
            FieldRegistry::with_builtin_types(),
            &EditorConfig::default(),
            clock.clone(),
        )
        .with_ids(IDGenerator::from_seed("s"));
        (store, clock)
    }

    #[test]
    fn test_create_selects_new_node() {
        let (mut store, _) = store();
        let id = store.create_node("text", None, 0, None).unwrap().unwrap();

        assert_eq!(store.root_ids(), &[id.clone()]);
        assert_eq!(store.get(&id).unwrap().field.field_type, "text");
        assert_eq!(store.selected_id(), Some(id.as_str()));
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn test_unregistered_type_is_silent_noop() {
        let (mut store, _) = store();
        assert_eq!(store.create_node("signature", None, 0, None), Ok(None));
        assert!(store.tree().is_empty());
        assert!(!store.can_undo());
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_failed_mutation_leaves_tree() {
        let (mut store, _) = store();
        let text = store.create_node("text", None, 0, None).unwrap().unwrap();
        let before = store.tree().clone();

        let err = store.create_node("text", Some(&text), 0, None).unwrap_err();
        assert!(matches!(err, MutationError::InvalidStructure(_)));
        assert!(store.tree().ptr_eq(&before));
    }

    #[test]
    fn test_remove_clears_selection() {
        let (mut store, _) = store();
        let group = store.create_node("group", None, 0, None).unwrap().unwrap();
        let child = store.create_node("text", Some(&group), 0, None).unwrap().unwrap();
        assert_eq!(store.selected_id(), Some(child.as_str()));

        store.remove_node(&group).unwrap();
        assert!(store.tree().is_empty());
        assert_eq!(store.selected_id(), None);
    }

    #[test]
    fn test_ui_state_stays_out_of_history() {
        let (mut store, _) = store();
        store.set_zoom(10.0);
        store.pan_by(5.0, -3.0);
        store.set_mode(EditorMode::Preview);
        assert!(store.set_drop_indicator(Some(DropLocation::root(0))));
        assert!(!store.set_drop_indicator(Some(DropLocation::root(0))));

        assert_eq!(store.viewport().zoom, MAX_ZOOM);
        assert_eq!(store.viewport().pan_x, 5.0);
        assert!(!store.can_undo());
    }

    #[test]
    fn test_burst_undoes_as_one_step() {
        let (mut store, clock) = store();
        let a = store.create_node("text", None, 0, None).unwrap().unwrap();
        clock.advance(100);
        store.update_node(&a, json!({"label": "First"})).unwrap();
        clock.advance(100);
        store.update_node(&a, json!({"label": "Second"})).unwrap();

        clock.advance(399);
        assert!(!store.tick());
        clock.advance(1);
        assert!(store.tick());
        assert_eq!(store.history().undo_levels(), 1);

        assert!(store.undo());
        assert!(store.tree().is_empty());
        assert_eq!(store.selected_id(), None);

        assert!(store.redo());
        assert_eq!(store.get(&a).unwrap().field.label(), Some("Second"));
    }

    #[test]
    fn test_clear_state_mints_new_id() {
        let (mut store, _) = store();
        let form_id = store.meta().form_id.clone();
        store.create_node("text", None, 0, None).unwrap();
        store.set_form_name("Signup");

        store.clear_state();
        assert!(store.tree().is_empty());
        assert_ne!(store.meta().form_id, form_id);
        assert_eq!(store.meta().form_name, DEFAULT_FORM_NAME);
        assert!(!store.can_undo());
        assert!(!store.can_redo());
    }

    #[test]
    fn test_replace_tree_is_undoable() {
        let (mut store, _) = store();
        store.create_node("text", None, 0, None).unwrap();
        store.flush_history();
        let original = store.tree().clone();

        store.replace_with_fields(&[FieldDef::new("email").with("name", "email")]);
        assert_eq!(store.field_names(), vec!["email"]);

        assert!(store.undo());
        assert_eq!(store.tree(), &original);
    }

    #[test]
    fn test_apply_json_mutation() {
        let (mut store, _) = store();
        let created = store
            .apply_json(r#"{"kind": "createNode", "fieldType": "email", "parentId": null, "index": 0}"#)
            .unwrap();
        let id = created.node_id.unwrap();
        assert!(store.get(&id).is_some());

        let err = store.apply_json(r#"{"kind": "removeNode"}"#).unwrap_err();
        assert!(matches!(err, EditorError::Json(_)));

        let err = store
            .apply_json(r#"{"kind": "removeNode", "nodeId": "ghost"}"#)
            .unwrap_err();
        assert!(matches!(err, EditorError::Mutation(MutationError::NodeNotFound(_))));
    }

    #[test]
    fn test_schema_json_replaces_tree() {
        let (mut store, _) = store();
        store
            .replace_with_schema_json(r#"{"formName": "Signup", "fields": [{"type": "email", "name": "email"}]}"#)
            .unwrap();
        assert_eq!(store.field_names(), vec!["email"]);
        assert_eq!(store.meta().form_name, "Signup");

        let before = store.tree().clone();
        let err = store.replace_with_schema_json(r#"{"formName": "x"}"#).unwrap_err();
        assert!(matches!(err, EditorError::Schema(_)));
        assert!(store.tree().ptr_eq(&before));

        let fields: Value = serde_json::from_str(&store.fields_json().unwrap()).unwrap();
        assert_eq!(fields[0]["type"], "email");
    }
}
