//! # Tree Mutations
//!
//! Structural operations on a [`FormTree`].
//!
//! Every mutation validates before it writes, so a rejected mutation
//! leaves the tree untouched. Writes go through copy-on-write, so a tree
//! that is not changed keeps its allocation and history can recognise the
//! no-op by pointer identity.
//!
//! ## Mutation Semantics
//!
//! ### Create
//! - Instantiates the registry default for the type
//! - Unregistered types are rejected with `UnknownFieldType`, which the
//!   store treats as a silent no-op
//! - Data-field names are made unique (`text`, `text_2`, ...)
//!
//! ### Move
//! - Fails if the new parent is the node itself or one of its descendants
//! - Within one list, a target index past the old position is shifted down
//!   by one to account for the removal
//!
//! ### Remove
//! - Removes the node and all descendants
//!
//! ### Duplicate
//! - Deep copy with fresh ids, inserted right after the original
//! - Data-field names become `name_copy`, `name_copy_2`, ...
//!
//! ### Update
//! - Deep-merges a partial field into the node's field

use crate::codec::all_field_names;
use crate::merge::{deep_merge, reset_nulls};
use crate::topology::{
    child_list, child_list_mut, is_descendant, locate, logical_children, resolve_slot, slot_keys,
    subtree_ids,
};
use crate::tree::{DropLocation, FormTree, Node, NodeId, SlotMap};
use formsmith_schema::{Field, FieldKind, FieldRegistry, IDGenerator, LayoutKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Structural operations on the form tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Mutation {
    /// Create a registry-default field at `index` in the resolved list
    #[serde(rename_all = "camelCase")]
    CreateNode {
        field_type: String,
        parent_id: Option<NodeId>,
        index: usize,
        #[serde(default)]
        parent_slot: Option<String>,
    },

    /// Move a node to a new parent list
    #[serde(rename_all = "camelCase")]
    MoveNode {
        node_id: NodeId,
        new_parent_id: Option<NodeId>,
        index: usize,
        #[serde(default)]
        parent_slot: Option<String>,
    },

    /// Remove a node and its subtree
    #[serde(rename_all = "camelCase")]
    RemoveNode { node_id: NodeId },

    /// Clone a subtree next to the original
    #[serde(rename_all = "camelCase")]
    DuplicateNode { node_id: NodeId },

    /// Deep-merge a partial field
    #[serde(rename_all = "camelCase")]
    UpdateNode { node_id: NodeId, patch: Value },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Parent not found: {0}")]
    ParentNotFound(String),

    #[error("Would create cycle")]
    CycleDetected,

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Unknown field type: {0}")]
    UnknownFieldType(String),
}

/// Collaborators a mutation needs besides the tree
pub struct MutationContext<'a> {
    pub registry: &'a FieldRegistry,
    pub ids: &'a mut IDGenerator,
}

/// Outcome of a successfully applied mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationResult {
    /// Node created by the mutation (create, duplicate)
    pub node_id: Option<NodeId>,

    /// False when the tree was left as it was
    pub changed: bool,
}

impl MutationResult {
    fn changed(node_id: Option<NodeId>) -> Self {
        Self {
            node_id,
            changed: true,
        }
    }

    fn unchanged() -> Self {
        Self {
            node_id: None,
            changed: false,
        }
    }
}

impl Mutation {
    /// Apply mutation to the tree with validation
    pub fn apply(
        &self,
        tree: &mut FormTree,
        ctx: &mut MutationContext<'_>,
    ) -> Result<MutationResult, MutationError> {
        self.validate(tree, ctx.registry)?;

        match self {
            Mutation::CreateNode {
                field_type,
                parent_id,
                index,
                parent_slot,
            } => Self::apply_create(
                tree,
                ctx,
                field_type,
                parent_id.as_deref(),
                *index,
                parent_slot.as_deref(),
            ),

            Mutation::MoveNode {
                node_id,
                new_parent_id,
                index,
                parent_slot,
            } => Self::apply_move(
                tree,
                node_id,
                new_parent_id.as_deref(),
                *index,
                parent_slot.as_deref(),
            ),

            Mutation::RemoveNode { node_id } => Self::apply_remove(tree, node_id),

            Mutation::DuplicateNode { node_id } => Self::apply_duplicate(tree, ctx, node_id),

            Mutation::UpdateNode { node_id, patch } => {
                Self::apply_update(tree, ctx.registry, node_id, patch)
            }
        }
    }

    /// Check the mutation against the current tree without applying it
    pub fn validate(&self, tree: &FormTree, registry: &FieldRegistry) -> Result<(), MutationError> {
        match self {
            Mutation::CreateNode {
                field_type,
                parent_id,
                parent_slot,
                ..
            } => {
                if !registry.contains(field_type) {
                    return Err(MutationError::UnknownFieldType(field_type.clone()));
                }

                resolve_target(
                    tree,
                    parent_id.as_deref(),
                    parent_slot.as_deref(),
                    field_type,
                    registry.kind_of(field_type),
                )?;
                Ok(())
            }

            Mutation::MoveNode {
                node_id,
                new_parent_id,
                parent_slot,
                ..
            } => {
                let node = find_node(tree, node_id)?;

                if let Some(parent_id) = new_parent_id {
                    if !tree.contains(parent_id) {
                        return Err(MutationError::ParentNotFound(parent_id.clone()));
                    }
                    if parent_id == node_id || is_descendant(tree.nodes(), node_id, parent_id) {
                        return Err(MutationError::CycleDetected);
                    }
                }

                resolve_target(
                    tree,
                    new_parent_id.as_deref(),
                    parent_slot.as_deref(),
                    &node.field.field_type,
                    node.field.kind(),
                )?;

                if locate(tree, node_id).is_none() {
                    return Err(unlinked(node_id));
                }
                Ok(())
            }

            Mutation::RemoveNode { node_id } => {
                find_node(tree, node_id)?;
                Ok(())
            }

            Mutation::DuplicateNode { node_id } => {
                find_node(tree, node_id)?;
                if locate(tree, node_id).is_none() {
                    return Err(unlinked(node_id));
                }
                Ok(())
            }

            Mutation::UpdateNode { node_id, patch } => {
                find_node(tree, node_id)?;
                if !patch.is_object() {
                    return Err(MutationError::InvalidStructure(
                        "Field patch must be an object".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    fn apply_create(
        tree: &mut FormTree,
        ctx: &mut MutationContext<'_>,
        field_type: &str,
        parent_id: Option<&str>,
        index: usize,
        parent_slot: Option<&str>,
    ) -> Result<MutationResult, MutationError> {
        let mut field = ctx
            .registry
            .instantiate(field_type)
            .ok_or_else(|| MutationError::UnknownFieldType(field_type.to_string()))?;

        if let Some(name) = field.data_name().map(str::to_string) {
            let taken: HashSet<String> = all_field_names(tree).into_iter().collect();
            field.set_name(unique_name(&name, &taken));
        }

        let slot = resolve_target(tree, parent_id, parent_slot, field_type, field.kind())?;
        let id = fresh_id(tree, ctx.ids, &HashSet::new());

        debug!(node_id = %id, field_type = %field_type, "Creating node");

        let node = Node::new(id.clone(), field, parent_id.map(str::to_string), slot.clone());
        tree.nodes_mut().insert(id.clone(), node);
        insert_into(tree, parent_id, slot.as_deref(), index, id.clone())?;

        Ok(MutationResult::changed(Some(id)))
    }

    fn apply_move(
        tree: &mut FormTree,
        node_id: &str,
        new_parent_id: Option<&str>,
        index: usize,
        parent_slot: Option<&str>,
    ) -> Result<MutationResult, MutationError> {
        let node = find_node(tree, node_id)?;
        let new_slot = resolve_target(
            tree,
            new_parent_id,
            parent_slot,
            &node.field.field_type,
            node.field.kind(),
        )?;

        let Some(index) = effective_move_index(tree, node_id, new_parent_id, new_slot.as_deref(), index)
        else {
            debug!(node_id = %node_id, "Move is a no-op");
            return Ok(MutationResult::unchanged());
        };

        debug!(node_id = %node_id, parent_id = ?new_parent_id, index, "Moving node");

        detach(tree, node_id)?;
        insert_into(tree, new_parent_id, new_slot.as_deref(), index, node_id.to_string())?;

        if let Some(node) = tree.nodes_mut().get_mut(node_id) {
            node.parent_id = new_parent_id.map(str::to_string);
            node.parent_slot = new_slot;
        }

        Ok(MutationResult::changed(None))
    }

    fn apply_remove(tree: &mut FormTree, node_id: &str) -> Result<MutationResult, MutationError> {
        let doomed = subtree_ids(tree.nodes(), node_id);

        debug!(node_id = %node_id, count = doomed.len(), "Removing node");

        if locate(tree, node_id).is_some() {
            detach(tree, node_id)?;
        } else {
            unlink_everywhere(tree, node_id);
        }

        let nodes = tree.nodes_mut();
        for id in &doomed {
            nodes.remove(id);
        }

        Ok(MutationResult::changed(None))
    }

    fn apply_duplicate(
        tree: &mut FormTree,
        ctx: &mut MutationContext<'_>,
        node_id: &str,
    ) -> Result<MutationResult, MutationError> {
        let (parent_id, parent_slot, index) =
            locate(tree, node_id).ok_or_else(|| unlinked(node_id))?;
        let originals = subtree_ids(tree.nodes(), node_id);

        let mut reserved: HashSet<NodeId> = HashSet::new();
        let mut id_map: HashMap<NodeId, NodeId> = HashMap::new();
        for id in &originals {
            let fresh = fresh_id(tree, ctx.ids, &reserved);
            reserved.insert(fresh.clone());
            id_map.insert(id.clone(), fresh);
        }

        let mut taken: HashSet<String> = all_field_names(tree).into_iter().collect();
        let remap = |ids: &[NodeId]| -> Vec<NodeId> {
            ids.iter().filter_map(|id| id_map.get(id).cloned()).collect()
        };

        let mut clones = Vec::with_capacity(originals.len());
        for id in &originals {
            let Some(original) = tree.get(id) else {
                continue;
            };

            let mut clone = original.clone();
            clone.id = id_map[id].clone();
            clone.children = remap(&original.children);
            clone.tab_children = original.tab_children.as_ref().map(|slots| {
                slots
                    .iter()
                    .map(|(key, ids)| (key.clone(), remap(ids)))
                    .collect::<SlotMap>()
            });
            if id != node_id {
                clone.parent_id = original
                    .parent_id
                    .as_ref()
                    .and_then(|p| id_map.get(p).cloned());
            }

            if let Some(name) = clone.field.data_name().map(str::to_string) {
                let copy_name = copy_name(&name, &taken);
                taken.insert(copy_name.clone());
                clone.field.set_name(copy_name);
            }

            clones.push(clone);
        }

        let clone_root = id_map[node_id].clone();
        debug!(node_id = %node_id, clone_id = %clone_root, count = clones.len(), "Duplicating node");

        let nodes = tree.nodes_mut();
        for clone in clones {
            nodes.insert(clone.id.clone(), clone);
        }
        insert_into(
            tree,
            parent_id.as_deref(),
            parent_slot.as_deref(),
            index + 1,
            clone_root.clone(),
        )?;

        Ok(MutationResult::changed(Some(clone_root)))
    }

    fn apply_update(
        tree: &mut FormTree,
        registry: &FieldRegistry,
        node_id: &str,
        patch: &Value,
    ) -> Result<MutationResult, MutationError> {
        let node = find_node(tree, node_id)?;

        let mut merged = node.field.to_value();
        deep_merge(&mut merged, patch);
        let defaults = merged
            .get("type")
            .and_then(Value::as_str)
            .and_then(|ty| registry.default_config(ty))
            .cloned()
            .unwrap_or_default();
        reset_nulls(&mut merged, patch, &defaults);
        let field = Field::from_value(merged)
            .map_err(|e| MutationError::InvalidStructure(format!("Invalid field: {}", e)))?;

        if field == node.field {
            return Ok(MutationResult::unchanged());
        }

        let old_kind = node.field.kind();
        let new_kind = field.kind();
        let has_children = !logical_children(node).is_empty();

        if old_kind != new_kind {
            if has_children {
                return Err(MutationError::InvalidStructure(format!(
                    "Cannot change {} to {} while it has children",
                    node.field.field_type, field.field_type
                )));
            }
            if let Some(parent_id) = &node.parent_id {
                let parent = find_node(tree, parent_id)?;
                if let Some(layout) = parent.field.kind().layout() {
                    if !layout.accepts(new_kind) {
                        return Err(MutationError::InvalidStructure(format!(
                            "{} cannot contain {}",
                            parent.field.field_type, field.field_type
                        )));
                    }
                }
            }
        }

        debug!(node_id = %node_id, field_type = %field.field_type, "Updating node");

        let reconciled = if new_kind == FieldKind::Layout(LayoutKind::Tabs) {
            let old_keys = slot_keys(&node.field);
            let new_keys = slot_keys(&field);
            (old_keys != new_keys).then(|| reconcile_slots(node, &old_keys, &new_keys))
        } else {
            None
        };

        let nodes = tree.nodes_mut();
        if let Some((slots, dropped)) = reconciled {
            let mut doomed = Vec::new();
            for id in &dropped {
                doomed.extend(subtree_ids(nodes, id));
            }
            for id in &doomed {
                nodes.remove(id);
            }

            for (key, ids) in &slots {
                for id in ids {
                    if let Some(child) = nodes.get_mut(id) {
                        child.parent_slot = Some(key.clone());
                    }
                }
            }

            if let Some(node) = nodes.get_mut(node_id) {
                node.tab_children = Some(slots);
            }
        } else if new_kind != FieldKind::Layout(LayoutKind::Tabs) {
            if let Some(node) = nodes.get_mut(node_id) {
                node.tab_children = None;
            }
        }

        if let Some(node) = nodes.get_mut(node_id) {
            node.field = field;
        }

        Ok(MutationResult::changed(None))
    }
}

/// Whether moving `node_id` to `location` would leave the tree as it is
pub fn is_noop_move(tree: &FormTree, node_id: &str, location: &DropLocation) -> bool {
    if !tree.contains(node_id) {
        return false;
    }

    let slot = match location.parent_id.as_deref() {
        None => None,
        Some(parent_id) => match tree
            .get(parent_id)
            .and_then(|p| resolve_slot(&p.field, location.parent_slot.as_deref()))
        {
            Some(slot) => slot,
            None => return false,
        },
    };

    effective_move_index(
        tree,
        node_id,
        location.parent_id.as_deref(),
        slot.as_deref(),
        location.index,
    )
    .is_none()
}

/// Insertion index a move lands on, `None` when it lands where it started.
///
/// `new_slot` must already be resolved.
fn effective_move_index(
    tree: &FormTree,
    node_id: &str,
    new_parent_id: Option<&str>,
    new_slot: Option<&str>,
    index: usize,
) -> Option<usize> {
    let (old_parent, old_slot, old_index) = locate(tree, node_id)?;
    let same_list = old_parent.as_deref() == new_parent_id && old_slot.as_deref() == new_slot;

    let target_len = child_list(tree.nodes(), tree.root_ids(), new_parent_id, new_slot)
        .map(|list| list.len())
        .unwrap_or(0);

    if same_list {
        let index = if old_index < index { index - 1 } else { index };
        let index = index.min(target_len.saturating_sub(1));
        (index != old_index).then_some(index)
    } else {
        Some(index.min(target_len))
    }
}

fn find_node<'a>(tree: &'a FormTree, node_id: &str) -> Result<&'a Node, MutationError> {
    tree.get(node_id)
        .ok_or_else(|| MutationError::NodeNotFound(node_id.to_string()))
}

fn unlinked(node_id: &str) -> MutationError {
    MutationError::InvalidStructure(format!("Node {} is not linked into its parent", node_id))
}

/// Validate a parent for a child of `child_kind` and resolve the slot key
fn resolve_target(
    tree: &FormTree,
    parent_id: Option<&str>,
    parent_slot: Option<&str>,
    child_type: &str,
    child_kind: FieldKind,
) -> Result<Option<String>, MutationError> {
    let Some(parent_id) = parent_id else {
        return Ok(None);
    };

    let parent = tree
        .get(parent_id)
        .ok_or_else(|| MutationError::ParentNotFound(parent_id.to_string()))?;

    let Some(layout) = parent.field.kind().layout() else {
        return Err(MutationError::InvalidStructure(format!(
            "{} fields cannot have children",
            parent.field.field_type
        )));
    };

    if !layout.accepts(child_kind) {
        return Err(MutationError::InvalidStructure(format!(
            "{} cannot contain {}",
            parent.field.field_type, child_type
        )));
    }

    resolve_slot(&parent.field, parent_slot).ok_or_else(|| {
        MutationError::InvalidStructure(match parent_slot {
            Some(slot) => format!("{} has no tab {}", parent_id, slot),
            None => format!("{} has no tabs", parent_id),
        })
    })
}

fn insert_into(
    tree: &mut FormTree,
    parent_id: Option<&str>,
    slot: Option<&str>,
    index: usize,
    id: NodeId,
) -> Result<(), MutationError> {
    let list = child_list_mut(tree, parent_id, slot).ok_or_else(|| {
        MutationError::InvalidStructure(format!("No child list for {:?}", parent_id))
    })?;
    let at = index.min(list.len());
    list.insert(at, id);
    Ok(())
}

/// Unlink a node from its owning list
fn detach(tree: &mut FormTree, node_id: &str) -> Result<(), MutationError> {
    let (parent_id, slot, index) = locate(tree, node_id).ok_or_else(|| unlinked(node_id))?;
    if let Some(list) = child_list_mut(tree, parent_id.as_deref(), slot.as_deref()) {
        list.remove(index);
    }
    Ok(())
}

/// Drop `node_id` from the root list and every list of its recorded parent.
/// Used when the node's slot does not resolve to the list that holds it.
fn unlink_everywhere(tree: &mut FormTree, node_id: &str) {
    let parent_id = tree.get(node_id).and_then(|node| node.parent_id.clone());

    tree.root_ids_mut().retain(|id| id != node_id);
    let Some(parent_id) = parent_id else {
        return;
    };
    if let Some(parent) = tree.nodes_mut().get_mut(&parent_id) {
        parent.children.retain(|id| id != node_id);
        for ids in parent.tab_children.iter_mut().flat_map(|slots| slots.values_mut()) {
            ids.retain(|id| id != node_id);
        }
    }
}

fn fresh_id(tree: &FormTree, ids: &mut IDGenerator, reserved: &HashSet<NodeId>) -> NodeId {
    loop {
        let id = ids.new_id();
        if !tree.contains(&id) && !reserved.contains(&id) {
            return id;
        }
    }
}

/// `base`, then `base_2`, `base_3`, ...
fn unique_name(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// `base_copy`, then `base_copy_2`, `base_copy_3`, ...
fn copy_name(base: &str, taken: &HashSet<String>) -> String {
    unique_name(&format!("{}_copy", base), taken)
}

/// Carry slot lists across a change of tab keys.
///
/// Keys that survive keep their list. Remaining new keys take the remaining
/// old lists in order. Lists left over belong to removed tabs; their ids are
/// returned for deletion.
fn reconcile_slots(node: &Node, old_keys: &[String], new_keys: &[String]) -> (SlotMap, Vec<NodeId>) {
    let mut old_slots = node.tab_children.clone().unwrap_or_default();
    let mut slots = SlotMap::new();

    for key in new_keys.iter().filter(|key| old_keys.contains(key)) {
        if let Some(ids) = old_slots.remove(key) {
            slots.insert(key.clone(), ids);
        }
    }

    let renamed = new_keys.iter().filter(|key| !old_keys.contains(key));
    let mut leftovers = old_keys
        .iter()
        .filter(|key| !new_keys.contains(key))
        .map(|key| old_slots.remove(key));

    for key in renamed {
        match leftovers.next() {
            Some(Some(ids)) => {
                slots.insert(key.clone(), ids);
            }
            Some(None) => {}
            None => break,
        }
    }

    let mut dropped: Vec<NodeId> = leftovers.flatten().flatten().collect();
    dropped.extend(old_slots.into_values().flatten());
    (slots, dropped)
}
