//! # Node Tree
//!
//! The flat document: an id → node map plus the ordered top-level ids.
//!
//! Both halves sit behind `Arc` so cloning a tree (a history snapshot) is
//! O(1). Edits go through `Arc::make_mut`, which copies only when a snapshot
//! still shares the data.

use formsmith_schema::Field;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type NodeId = String;

/// Node map, ordered by id for deterministic output
pub type NodeMap = BTreeMap<NodeId, Node>;

/// Slot key → ordered child ids (tabs containers)
pub type SlotMap = BTreeMap<String, Vec<NodeId>>;

/// One entry of the flat tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub field: Field,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub parent_slot: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_children: Option<SlotMap>,
}

impl Node {
    pub fn new(
        id: impl Into<NodeId>,
        field: Field,
        parent_id: Option<NodeId>,
        parent_slot: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            field,
            parent_id,
            parent_slot,
            children: Vec::new(),
            tab_children: None,
        }
    }
}

/// Where an insertion would land among would-be siblings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropLocation {
    pub parent_id: Option<NodeId>,
    pub parent_slot: Option<String>,
    pub index: usize,
}

impl DropLocation {
    pub fn root(index: usize) -> Self {
        Self {
            parent_id: None,
            parent_slot: None,
            index,
        }
    }

    pub fn new(parent_id: Option<NodeId>, parent_slot: Option<String>, index: usize) -> Self {
        Self {
            parent_id,
            parent_slot,
            index,
        }
    }
}

/// Node map + root ordering
#[derive(Debug, Clone, Default)]
pub struct FormTree {
    nodes: Arc<NodeMap>,
    root_ids: Arc<Vec<NodeId>>,
}

impl FormTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(nodes: NodeMap, root_ids: Vec<NodeId>) -> Self {
        Self {
            nodes: Arc::new(nodes),
            root_ids: Arc::new(root_ids),
        }
    }

    pub fn nodes(&self) -> &NodeMap {
        &self.nodes
    }

    pub fn root_ids(&self) -> &[NodeId] {
        &self.root_ids
    }

    /// Copy-on-write access to the node map
    pub fn nodes_mut(&mut self) -> &mut NodeMap {
        Arc::make_mut(&mut self.nodes)
    }

    /// Copy-on-write access to the root list
    pub fn root_ids_mut(&mut self) -> &mut Vec<NodeId> {
        Arc::make_mut(&mut self.root_ids)
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True when both halves are the very same allocation
    pub fn ptr_eq(&self, other: &FormTree) -> bool {
        Arc::ptr_eq(&self.nodes, &other.nodes) && Arc::ptr_eq(&self.root_ids, &other.root_ids)
    }

    /// Deep copy of both halves, sharing nothing with `self`
    pub fn to_parts(&self) -> (NodeMap, Vec<NodeId>) {
        ((*self.nodes).clone(), (*self.root_ids).clone())
    }
}

impl PartialEq for FormTree {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.nodes == other.nodes && self.root_ids == other.root_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_until_written() {
        let mut nodes = NodeMap::new();
        nodes.insert("a".into(), Node::new("a", Field::new("text"), None, None));
        let tree = FormTree::from_parts(nodes, vec!["a".into()]);

        let mut copy = tree.clone();
        assert!(copy.ptr_eq(&tree));

        copy.root_ids_mut().clear();
        assert!(!copy.ptr_eq(&tree));
        assert_eq!(tree.root_ids(), &["a".to_string()]);
        assert!(copy.root_ids().is_empty());
    }

    #[test]
    fn test_node_serializes_camel_case() {
        let node = Node::new("n1", Field::new("text"), Some("p".into()), None);
        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["parentId"], "p");
        assert!(json["parentSlot"].is_null());
        assert!(json.get("tabChildren").is_none());
        assert_eq!(json["field"]["type"], "text");
    }
}
