//! Store-level mutation behavior

use formsmith_editor::{
    check_topology, EditorConfig, FieldRegistry, FormStore, IDGenerator, ManualClock,
    MutationError,
};
use serde_json::json;
use std::sync::Arc;

fn store() -> FormStore {
    FormStore::with_clock(
        FieldRegistry::with_builtin_types(),
        &EditorConfig::default(),
        Arc::new(ManualClock::new(0)),
    )
    .with_ids(IDGenerator::from_seed("mt"))
}

#[test]
fn test_create_in_tab_slot() {
    let mut store = store();
    let tabs = store.create_node("tabs", None, 0, None).unwrap().unwrap();

    let first = store.create_node("text", Some(&tabs), 0, None).unwrap().unwrap();
    let second = store.create_node("text", Some(&tabs), 0, Some("tab2")).unwrap().unwrap();

    let node = &store.nodes()[&tabs];
    let slots = node.tab_children.as_ref().unwrap();
    assert_eq!(slots["tab1"], vec![first.clone()]);
    assert_eq!(slots["tab2"], vec![second.clone()]);
    assert_eq!(store.nodes()[&first].parent_slot.as_deref(), Some("tab1"));
    assert!(node.children.is_empty());
}

#[test]
fn test_create_in_unknown_slot_fails() {
    let mut store = store();
    let tabs = store.create_node("tabs", None, 0, None).unwrap().unwrap();

    let err = store
        .create_node("text", Some(&tabs), 0, Some("nope"))
        .unwrap_err();
    assert!(matches!(err, MutationError::InvalidStructure(_)));
}

#[test]
fn test_move_between_tab_slots() {
    let mut store = store();
    let tabs = store.create_node("tabs", None, 0, None).unwrap().unwrap();
    let child = store.create_node("text", Some(&tabs), 0, None).unwrap().unwrap();

    assert!(store.move_node(&child, Some(&tabs), 0, Some("tab2")).unwrap());

    let slots = store.nodes()[&tabs].tab_children.clone().unwrap();
    assert!(slots["tab1"].is_empty());
    assert_eq!(slots["tab2"], vec![child.clone()]);
    assert_eq!(store.nodes()[&child].parent_slot.as_deref(), Some("tab2"));
    check_topology(store.nodes(), store.root_ids()).unwrap();
}

#[test]
fn test_move_out_of_container_to_root() {
    let mut store = store();
    let group = store.create_node("group", None, 0, None).unwrap().unwrap();
    let child = store.create_node("text", Some(&group), 0, None).unwrap().unwrap();

    store.move_node(&child, None, 0, None).unwrap();

    assert_eq!(store.root_ids(), &[child.clone(), group.clone()]);
    assert_eq!(store.nodes()[&child].parent_id, None);
    assert!(store.nodes()[&group].children.is_empty());
}

#[test]
fn test_move_index_is_clamped() {
    let mut store = store();
    let a = store.create_node("text", None, 0, None).unwrap().unwrap();
    let b = store.create_node("text", None, 1, None).unwrap().unwrap();

    store.move_node(&a, None, 99, None).unwrap();
    assert_eq!(store.root_ids(), &[b, a]);
}

#[test]
fn test_move_into_descendant_rejected() {
    let mut store = store();
    let outer = store.create_node("group", None, 0, None).unwrap().unwrap();
    let inner = store.create_node("collapsible", Some(&outer), 0, None).unwrap().unwrap();
    let before = store.tree().clone();

    let err = store.move_node(&outer, Some(&inner), 0, None).unwrap_err();
    assert_eq!(err, MutationError::CycleDetected);
    assert!(store.tree().ptr_eq(&before));
}

#[test]
fn test_move_missing_node() {
    let mut store = store();
    assert_eq!(
        store.move_node("ghost", None, 0, None),
        Err(MutationError::NodeNotFound("ghost".to_string()))
    );
}

#[test]
fn test_duplicate_tabs_remaps_slots() {
    let mut store = store();
    let tabs = store.create_node("tabs", None, 0, None).unwrap().unwrap();
    store.create_node("email", Some(&tabs), 0, Some("tab2")).unwrap();

    let copy = store.duplicate_node(&tabs).unwrap();
    let slots = store.nodes()[&copy].tab_children.clone().unwrap();
    let cloned_child = &store.nodes()[&slots["tab2"][0]];

    assert_eq!(cloned_child.parent_id.as_deref(), Some(copy.as_str()));
    assert_eq!(cloned_child.field.name(), Some("email_copy"));
    check_topology(store.nodes(), store.root_ids()).unwrap();
}

#[test]
fn test_update_replaces_arrays() {
    let mut store = store();
    let select = store.create_node("select", None, 0, None).unwrap().unwrap();

    store
        .update_node(
            &select,
            json!({"options": [{"label": "Yes", "value": "y"}, {"label": "No", "value": "n"}]}),
        )
        .unwrap();

    let options = store.nodes()[&select].field.get("options").unwrap().clone();
    assert_eq!(options.as_array().unwrap().len(), 2);
    assert_eq!(options[0]["value"], "y");
}

#[test]
fn test_update_removing_tab_clears_selection() {
    let mut store = store();
    let tabs = store.create_node("tabs", None, 0, None).unwrap().unwrap();
    let inner = store.create_node("text", Some(&tabs), 0, Some("tab2")).unwrap().unwrap();
    assert_eq!(store.selected_id(), Some(inner.as_str()));

    store
        .update_node(&tabs, json!({"tabs": [{"name": "tab1", "label": "Tab 1"}]}))
        .unwrap();

    assert!(!store.nodes().contains_key(&inner));
    assert_eq!(store.selected_id(), None);
    check_topology(store.nodes(), store.root_ids()).unwrap();
}
