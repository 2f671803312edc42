//! # Document Codec
//!
//! Converts between the flat [`FormTree`] and the nested declarative
//! schema ([`FieldDef`]).
//!
//! ## Export
//!
//! - Bookkeeping keys are never part of a field's configuration
//! - Min/max constraint pairs are repaired (negative lengths clamp to zero,
//!   inverted pairs swap)
//! - Values that are `null`, equal to the type's registry default, or empty
//!   where the default has nothing are pruned. `name` and `label` are
//!   always kept
//! - Containers emit their logical children as `fields`; tabs emit one
//!   `tabs` entry per declared tab with that slot's children
//!
//! ## Import
//!
//! Registry defaults are filled in under the imported configuration, which
//! makes export followed by import exact for trees built in the editor.

use crate::topology::{logical_children, slot_keys};
use crate::tree::{FormTree, Node, NodeId, NodeMap, SlotMap};
use formsmith_schema::{
    walk_fields, Config, FieldDef, FieldKind, FieldRegistry, IDGenerator, LayoutKind,
    NameCollector, TabDef,
};
use serde_json::{Number, Value};
use std::collections::HashSet;

/// Keys owned by the tree, stripped from exported configuration
pub const BOOKKEEPING_KEYS: [&str; 5] = ["id", "parentId", "parentSlot", "children", "tabChildren"];

/// Keys kept even when they match the default
const ALWAYS_KEPT: [&str; 2] = ["name", "label"];

/// Constraint pairs repaired on export; the bool marks length constraints
const CONSTRAINT_PAIRS: [(&str, &str, bool); 2] =
    [("minLength", "maxLength", true), ("min", "max", false)];

/// Nested schema for the whole tree
pub fn to_fields(tree: &FormTree, registry: &FieldRegistry) -> Vec<FieldDef> {
    let mut ancestors = HashSet::new();
    project_list(tree, registry, tree.root_ids(), &mut ancestors)
}

fn project_list(
    tree: &FormTree,
    registry: &FieldRegistry,
    ids: &[NodeId],
    ancestors: &mut HashSet<NodeId>,
) -> Vec<FieldDef> {
    ids.iter()
        .filter_map(|id| project(tree, registry, id, ancestors))
        .collect()
}

fn project(
    tree: &FormTree,
    registry: &FieldRegistry,
    id: &str,
    ancestors: &mut HashSet<NodeId>,
) -> Option<FieldDef> {
    let node = tree.get(id)?;
    if !ancestors.insert(id.to_string()) {
        return None;
    }

    let mut config = node.field.config.clone();
    for key in BOOKKEEPING_KEYS {
        config.remove(key);
    }

    let raw_tabs = match node.field.kind() {
        FieldKind::Layout(LayoutKind::Tabs) => config.remove("tabs"),
        _ => None,
    };

    sanitize(&mut config);
    prune(&mut config, registry.default_config(&node.field.field_type));

    let mut def = FieldDef::new(node.field.field_type.clone());
    def.config = config;

    match node.field.kind() {
        FieldKind::Data => {}
        FieldKind::Layout(LayoutKind::Tabs) => {
            def.tabs = project_tabs(tree, registry, node, raw_tabs, ancestors);
        }
        FieldKind::Layout(_) => {
            def.fields = project_list(tree, registry, &logical_children(node), ancestors);
        }
    }

    ancestors.remove(id);
    Some(def)
}

fn project_tabs(
    tree: &FormTree,
    registry: &FieldRegistry,
    node: &Node,
    raw_tabs: Option<Value>,
    ancestors: &mut HashSet<NodeId>,
) -> Vec<TabDef> {
    let entries = match raw_tabs {
        Some(Value::Array(entries)) => entries,
        _ => Vec::new(),
    };

    slot_keys(&node.field)
        .iter()
        .zip(entries)
        .map(|(key, entry)| {
            let mut config = match entry {
                Value::Object(config) => config,
                _ => Config::new(),
            };
            config.remove("fields");

            let fields = node
                .tab_children
                .as_ref()
                .and_then(|slots| slots.get(key))
                .map(|ids| project_list(tree, registry, ids, ancestors))
                .unwrap_or_default();

            TabDef { config, fields }
        })
        .collect()
}

/// Repair inconsistent constraint pairs, at the top level and inside a
/// `validation` object
pub fn sanitize(config: &mut Config) {
    sanitize_pairs(config);
    if let Some(Value::Object(validation)) = config.get_mut("validation") {
        sanitize_pairs(validation);
    }
}

fn sanitize_pairs(config: &mut Config) {
    for (min_key, max_key, is_length) in CONSTRAINT_PAIRS {
        if is_length {
            for key in [min_key, max_key] {
                if let Some(value) = config.get_mut(key) {
                    if value.as_f64().is_some_and(|n| n < 0.0) {
                        *value = Value::Number(Number::from(0));
                    }
                }
            }
        }

        let min = config.get(min_key).and_then(Value::as_f64);
        let max = config.get(max_key).and_then(Value::as_f64);
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                let low = config.remove(max_key);
                let high = config.remove(min_key);
                if let (Some(low), Some(high)) = (low, high) {
                    config.insert(min_key.to_string(), low);
                    config.insert(max_key.to_string(), high);
                }
            }
        }
    }
}

/// Drop null, default-valued and empty properties
pub fn prune(config: &mut Config, defaults: Option<&Config>) {
    config.retain(|key, value| {
        if ALWAYS_KEPT.contains(&key.as_str()) && !value.is_null() {
            return true;
        }
        if value.is_null() {
            return false;
        }

        match defaults.and_then(|d| d.get(key)) {
            Some(default) => value != default,
            None => !is_empty(value),
        }
    });
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Build a fresh tree from a nested schema
pub fn from_fields(defs: &[FieldDef], registry: &FieldRegistry, ids: &mut IDGenerator) -> FormTree {
    let mut nodes = NodeMap::new();
    let root_ids = defs
        .iter()
        .map(|def| import(def, None, None, registry, ids, &mut nodes))
        .collect();
    FormTree::from_parts(nodes, root_ids)
}

fn import(
    def: &FieldDef,
    parent_id: Option<&str>,
    parent_slot: Option<&str>,
    registry: &FieldRegistry,
    ids: &mut IDGenerator,
    nodes: &mut NodeMap,
) -> NodeId {
    let id = loop {
        let id = ids.new_id();
        if !nodes.contains_key(&id) {
            break id;
        }
    };

    let mut field = def.to_field();
    if let Some(defaults) = registry.default_config(&def.field_type) {
        for (key, value) in defaults {
            field.config.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    let mut node = Node::new(
        id.clone(),
        field,
        parent_id.map(str::to_string),
        parent_slot.map(str::to_string),
    );

    match node.field.kind() {
        FieldKind::Data => {}
        FieldKind::Layout(LayoutKind::Tabs) => {
            let mut slots = SlotMap::new();
            for (key, tab) in slot_keys(&node.field).into_iter().zip(&def.tabs) {
                let children: Vec<NodeId> = tab
                    .fields
                    .iter()
                    .map(|child| import(child, Some(&id), Some(&key), registry, ids, nodes))
                    .collect();
                if !children.is_empty() {
                    slots.insert(key, children);
                }
            }
            if !slots.is_empty() {
                node.tab_children = Some(slots);
            }
        }
        FieldKind::Layout(_) => {
            node.children = def
                .fields
                .iter()
                .map(|child| import(child, Some(&id), None, registry, ids, nodes))
                .collect();
        }
    }

    nodes.insert(id.clone(), node);
    id
}

/// Every data-field name in the tree, in document order
pub fn all_field_names(tree: &FormTree) -> Vec<String> {
    let mut names = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<NodeId> = tree.root_ids().iter().rev().cloned().collect();

    while let Some(id) = stack.pop() {
        let Some(node) = tree.get(&id) else {
            continue;
        };
        if !visited.insert(node.id.as_str()) {
            continue;
        }
        if let Some(name) = node.field.data_name() {
            names.push(name.to_string());
        }
        stack.extend(logical_children(node).into_iter().rev());
    }

    names
}

/// Every data-field name in a nested schema
pub fn schema_field_names(defs: &[FieldDef]) -> Vec<String> {
    let mut collector = NameCollector::default();
    walk_fields(&mut collector, defs);
    collector.names
}
