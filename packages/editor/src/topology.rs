//! # Tree Topology
//!
//! Read-only helpers over the flat node map: resolving a parent's child
//! list (including tab slots), enumerating logical children and testing
//! ancestry.
//!
//! ## Slot keys
//!
//! A tabs container keeps one child list per declared tab. The key for tab
//! `i` is its trimmed name when that is non-blank and not used by an
//! earlier tab, otherwise the placeholder `tab-<i>`. A placeholder that
//! collides with a declared name gets a `-2`, `-3`, ... suffix.

use crate::tree::{FormTree, Node, NodeId, NodeMap};
use formsmith_schema::{Field, FieldKind, LayoutKind};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Slot keys of a tabs field, one per declared tab. Empty for other fields.
pub fn slot_keys(field: &Field) -> Vec<String> {
    let tabs = field.tabs();
    let declared: HashSet<String> = tabs
        .iter()
        .filter_map(|tab| tab.name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();

    let mut keys: Vec<String> = Vec::with_capacity(tabs.len());
    for (index, tab) in tabs.iter().enumerate() {
        let name = tab.name.as_deref().map(str::trim).unwrap_or("");
        if !name.is_empty() && !keys.iter().any(|k| k == name) {
            keys.push(name.to_string());
            continue;
        }

        let placeholder = format!("tab-{}", index);
        let mut key = placeholder.clone();
        let mut suffix = 2;
        while declared.contains(&key) || keys.contains(&key) {
            key = format!("{}-{}", placeholder, suffix);
            suffix += 1;
        }
        keys.push(key);
    }

    keys
}

/// Resolve the slot a child of `field` lands in.
///
/// Tabs: the requested slot when it is declared, the first slot when none is
/// requested, `None` for an undeclared slot or a tabs field without tabs.
/// Every other container has a single unnamed list, so the answer is
/// `Some(None)`.
pub fn resolve_slot(field: &Field, requested: Option<&str>) -> Option<Option<String>> {
    if field.kind() != FieldKind::Layout(LayoutKind::Tabs) {
        return Some(None);
    }

    let keys = slot_keys(field);
    match requested {
        Some(slot) => keys.into_iter().find(|k| k == slot).map(Some),
        None => keys.into_iter().next().map(Some),
    }
}

/// Authoritative ordered child list for `(parent, slot)`.
///
/// `None` parent means the root list. Returns `None` when the parent is
/// unknown, is not a container, or the slot does not resolve. A declared
/// slot with no entry yet reads as empty.
pub fn child_list<'a>(
    nodes: &'a NodeMap,
    root_ids: &'a [NodeId],
    parent_id: Option<&str>,
    parent_slot: Option<&str>,
) -> Option<&'a [NodeId]> {
    let Some(parent_id) = parent_id else {
        return Some(root_ids);
    };

    let parent = nodes.get(parent_id)?;
    if !parent.field.is_layout() {
        return None;
    }

    match resolve_slot(&parent.field, parent_slot)? {
        None => Some(&parent.children),
        Some(key) => Some(
            parent
                .tab_children
                .as_ref()
                .and_then(|slots| slots.get(&key))
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        ),
    }
}

/// Mutable child list for `(parent, slot)`, creating an empty slot entry if
/// needed. Same resolution rules as [`child_list`].
pub(crate) fn child_list_mut<'a>(
    tree: &'a mut FormTree,
    parent_id: Option<&str>,
    parent_slot: Option<&str>,
) -> Option<&'a mut Vec<NodeId>> {
    let Some(parent_id) = parent_id else {
        return Some(tree.root_ids_mut());
    };

    let parent = tree.nodes_mut().get_mut(parent_id)?;
    if !parent.field.is_layout() {
        return None;
    }

    match resolve_slot(&parent.field, parent_slot)? {
        None => Some(&mut parent.children),
        Some(key) => Some(
            parent
                .tab_children
                .get_or_insert_with(Default::default)
                .entry(key)
                .or_default(),
        ),
    }
}

/// Ordinary children followed by slot children, de-duplicated.
///
/// Declared slots come first in tab order, then any stale slot lists.
pub fn logical_children(node: &Node) -> Vec<NodeId> {
    let keys = slot_keys(&node.field);
    let mut ordered: Vec<&NodeId> = node.children.iter().collect();

    if let Some(slots) = &node.tab_children {
        for key in &keys {
            if let Some(ids) = slots.get(key) {
                ordered.extend(ids);
            }
        }
        for (key, ids) in slots {
            if !keys.contains(key) {
                ordered.extend(ids);
            }
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(ordered.len());
    for id in ordered {
        if seen.insert(id.as_str()) {
            out.push(id.clone());
        }
    }
    out
}

/// Whether `candidate_id` sits anywhere below `ancestor_id`
pub fn is_descendant(nodes: &NodeMap, ancestor_id: &str, candidate_id: &str) -> bool {
    let Some(ancestor) = nodes.get(ancestor_id) else {
        return false;
    };

    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut stack = logical_children(ancestor);

    while let Some(id) = stack.pop() {
        if id == candidate_id {
            return true;
        }
        if !visited.insert(id.clone()) {
            continue;
        }
        if let Some(node) = nodes.get(&id) {
            stack.extend(logical_children(node));
        }
    }

    false
}

/// `root_id` and everything below it, pre-order
pub fn subtree_ids(nodes: &NodeMap, root_id: &str) -> Vec<NodeId> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut out = Vec::new();
    let mut stack = vec![root_id.to_string()];

    while let Some(id) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        let Some(node) = nodes.get(&id) else {
            continue;
        };
        let mut children = logical_children(node);
        children.reverse();
        stack.extend(children);
        out.push(id);
    }

    out
}

/// Current `(parent, slot, index)` of a node, if it is linked into a list
pub fn locate(tree: &FormTree, node_id: &str) -> Option<(Option<NodeId>, Option<String>, usize)> {
    let node = tree.get(node_id)?;
    let list = child_list(
        tree.nodes(),
        tree.root_ids(),
        node.parent_id.as_deref(),
        node.parent_slot.as_deref(),
    )?;
    let index = list.iter().position(|id| id == node_id)?;
    Some((node.parent_id.clone(), node.parent_slot.clone(), index))
}

/// First structural inconsistency found in a node map
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyIssue {
    #[error("nodes.{key}: stored under a different id ({id})")]
    KeyMismatch { key: NodeId, id: NodeId },

    #[error("{owner}: unknown node {id}")]
    Dangling { owner: String, id: NodeId },

    #[error("{id}: listed in more than one child list")]
    MultipleOwners { id: NodeId },

    #[error("{id}: parentId does not match the list that holds it")]
    ParentMismatch { id: NodeId },

    #[error("{id}: not listed in any child list")]
    Orphan { id: NodeId },

    #[error("{id}: unreachable from rootIds (cycle)")]
    Cycle { id: NodeId },

    #[error("nodes.{id}: {problem}")]
    SlotLayout { id: NodeId, problem: String },
}

/// Child lists must be ones the field kind can address. Tabs keep children
/// under declared slot keys only.
fn check_child_layout(node: &Node) -> Result<(), TopologyIssue> {
    let issue = |problem: String| TopologyIssue::SlotLayout {
        id: node.id.clone(),
        problem,
    };
    let slots = node.tab_children.as_ref().filter(|slots| !slots.is_empty());

    match node.field.kind() {
        FieldKind::Data => {
            if !node.children.is_empty() || slots.is_some() {
                return Err(issue(format!("{} fields cannot have children", node.field.field_type)));
            }
        }
        FieldKind::Layout(LayoutKind::Tabs) => {
            if !node.children.is_empty() {
                return Err(issue("tabs keep children in tabChildren only".to_string()));
            }
            let keys = slot_keys(&node.field);
            if let Some(key) = slots.into_iter().flat_map(|s| s.keys()).find(|k| !keys.contains(*k)) {
                return Err(issue(format!("tabChildren.{} is not a declared tab", key)));
            }
        }
        FieldKind::Layout(_) => {
            if slots.is_some() {
                return Err(issue(format!(
                    "{} fields cannot have tabChildren",
                    node.field.field_type
                )));
            }
        }
    }
    Ok(())
}

/// Owning `(parent, slot)` per node id
type Owners<'a> = HashMap<&'a str, (Option<&'a str>, Option<&'a str>)>;

fn claim<'a>(
    nodes: &'a NodeMap,
    owners: &mut Owners<'a>,
    owner: impl FnOnce() -> String,
    id: &NodeId,
    parent: Option<&'a str>,
    slot: Option<&'a str>,
) -> Result<(), TopologyIssue> {
    let Some((key, _)) = nodes.get_key_value(id) else {
        return Err(TopologyIssue::Dangling {
            owner: owner(),
            id: id.clone(),
        });
    };
    if owners.insert(key.as_str(), (parent, slot)).is_some() {
        return Err(TopologyIssue::MultipleOwners { id: id.clone() });
    }
    Ok(())
}

/// Check every tree invariant: child lists fit the field kind, references
/// resolve, ownership is single, parents agree and everything is reachable
/// from the root list
pub fn check_topology(nodes: &NodeMap, root_ids: &[NodeId]) -> Result<(), TopologyIssue> {
    let mut owners: Owners<'_> = HashMap::new();

    for (index, id) in root_ids.iter().enumerate() {
        claim(nodes, &mut owners, || format!("rootIds[{}]", index), id, None, None)?;
    }

    for (key, node) in nodes {
        if *key != node.id {
            return Err(TopologyIssue::KeyMismatch {
                key: key.clone(),
                id: node.id.clone(),
            });
        }
        check_child_layout(node)?;

        for (index, child) in node.children.iter().enumerate() {
            claim(
                nodes,
                &mut owners,
                || format!("nodes.{}.children[{}]", key, index),
                child,
                Some(key.as_str()),
                None,
            )?;
        }

        for (slot, ids) in node.tab_children.iter().flatten() {
            for (index, child) in ids.iter().enumerate() {
                claim(
                    nodes,
                    &mut owners,
                    || format!("nodes.{}.tabChildren.{}[{}]", key, slot, index),
                    child,
                    Some(key.as_str()),
                    Some(slot.as_str()),
                )?;
            }
        }

        if let Some(parent) = &node.parent_id {
            if !nodes.contains_key(parent) {
                return Err(TopologyIssue::Dangling {
                    owner: format!("nodes.{}.parentId", key),
                    id: parent.clone(),
                });
            }
        }
    }

    for (key, node) in nodes {
        let Some((parent, slot)) = owners.get(key.as_str()) else {
            return Err(TopologyIssue::Orphan { id: key.clone() });
        };
        let slot_agrees = slot.is_none() || *slot == node.parent_slot.as_deref();
        if *parent != node.parent_id.as_deref() || !slot_agrees {
            return Err(TopologyIssue::ParentMismatch { id: key.clone() });
        }
    }

    let mut reached: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = root_ids.iter().map(String::as_str).collect();
    while let Some(id) = stack.pop() {
        if !reached.insert(id) {
            continue;
        }
        if let Some(node) = nodes.get(id) {
            stack.extend(node.children.iter().map(String::as_str));
            for ids in node.tab_children.iter().flat_map(|slots| slots.values()) {
                stack.extend(ids.iter().map(String::as_str));
            }
        }
    }

    if let Some(id) = nodes.keys().find(|id| !reached.contains(id.as_str())) {
        return Err(TopologyIssue::Cycle { id: id.clone() });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tabs_field(tabs: serde_json::Value) -> Field {
        Field::new("tabs").with("tabs", tabs)
    }

    fn sample_tree() -> FormTree {
        // group(g) -> [a, b], tabs(t) -> {one: [c]}, root: [g, t]
        let mut nodes = NodeMap::new();
        let mut group = Node::new("g", Field::new("group"), None, None);
        group.children = vec!["a".into(), "b".into()];
        nodes.insert("g".into(), group);
        nodes.insert("a".into(), Node::new("a", Field::new("text"), Some("g".into()), None));
        nodes.insert("b".into(), Node::new("b", Field::new("text"), Some("g".into()), None));

        let mut tabs = Node::new(
            "t",
            tabs_field(json!([{"name": "one"}, {"name": "two"}])),
            None,
            None,
        );
        let mut slots = crate::tree::SlotMap::new();
        slots.insert("one".into(), vec!["c".into()]);
        tabs.tab_children = Some(slots);
        nodes.insert("t".into(), tabs);
        nodes.insert(
            "c".into(),
            Node::new("c", Field::new("text"), Some("t".into()), Some("one".into())),
        );

        FormTree::from_parts(nodes, vec!["g".into(), "t".into()])
    }

    #[test]
    fn test_slot_keys_from_names() {
        let field = tabs_field(json!([{"name": "general"}, {"name": " extra "}]));
        assert_eq!(slot_keys(&field), vec!["general", "extra"]);
    }

    #[test]
    fn test_slot_keys_blank_and_duplicate_fall_back() {
        let field = tabs_field(json!([
            {"name": "a"},
            {"name": ""},
            {"name": "a"},
            {"label": "No name"}
        ]));
        assert_eq!(slot_keys(&field), vec!["a", "tab-1", "tab-2", "tab-3"]);
    }

    #[test]
    fn test_placeholder_avoids_declared_names() {
        let field = tabs_field(json!([{"name": ""}, {"name": "tab-0"}]));
        assert_eq!(slot_keys(&field), vec!["tab-0-2", "tab-0"]);
    }

    #[test]
    fn test_child_list_resolution() {
        let tree = sample_tree();
        let nodes = tree.nodes();
        let roots = tree.root_ids();

        assert_eq!(child_list(nodes, roots, None, None).unwrap(), roots);
        assert_eq!(child_list(nodes, roots, Some("g"), None).unwrap(), &["a", "b"]);
        assert_eq!(child_list(nodes, roots, Some("t"), None).unwrap(), &["c"]);
        assert!(child_list(nodes, roots, Some("t"), Some("two")).unwrap().is_empty());
        assert!(child_list(nodes, roots, Some("t"), Some("missing")).is_none());
        assert!(child_list(nodes, roots, Some("a"), None).is_none());
        assert!(child_list(nodes, roots, Some("nope"), None).is_none());
    }

    #[test]
    fn test_tabs_without_tabs_has_no_list() {
        let mut nodes = NodeMap::new();
        nodes.insert("t".into(), Node::new("t", tabs_field(json!([])), None, None));
        assert!(child_list(&nodes, &[], Some("t"), None).is_none());
    }

    #[test]
    fn test_logical_children_union() {
        let mut node = Node::new("t", tabs_field(json!([{"name": "x"}, {"name": "y"}])), None, None);
        node.children = vec!["a".into()];
        let mut slots = crate::tree::SlotMap::new();
        slots.insert("y".into(), vec!["c".into()]);
        slots.insert("x".into(), vec!["b".into(), "a".into()]);
        slots.insert("stale".into(), vec!["d".into()]);
        node.tab_children = Some(slots);

        assert_eq!(logical_children(&node), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_descendants() {
        let tree = sample_tree();
        assert!(is_descendant(tree.nodes(), "g", "a"));
        assert!(is_descendant(tree.nodes(), "t", "c"));
        assert!(!is_descendant(tree.nodes(), "a", "g"));
        assert!(!is_descendant(tree.nodes(), "g", "g"));
        assert_eq!(subtree_ids(tree.nodes(), "g"), vec!["g", "a", "b"]);
    }

    #[test]
    fn test_locate() {
        let tree = sample_tree();
        assert_eq!(locate(&tree, "b"), Some((Some("g".into()), None, 1)));
        assert_eq!(locate(&tree, "c"), Some((Some("t".into()), Some("one".into()), 0)));
        assert_eq!(locate(&tree, "t"), Some((None, None, 1)));
        assert_eq!(locate(&tree, "zzz"), None);
    }

    #[test]
    fn test_check_topology_accepts_consistent_tree() {
        let tree = sample_tree();
        assert_eq!(check_topology(tree.nodes(), tree.root_ids()), Ok(()));
    }

    #[test]
    fn test_check_topology_reports_problems() {
        let tree = sample_tree();

        let (mut nodes, roots) = tree.to_parts();
        nodes.get_mut("g").unwrap().children.push("ghost".into());
        assert!(matches!(
            check_topology(&nodes, &roots),
            Err(TopologyIssue::Dangling { .. })
        ));

        let (mut nodes, roots) = tree.to_parts();
        nodes.get_mut("g").unwrap().children.push("c".into());
        assert_eq!(
            check_topology(&nodes, &roots),
            Err(TopologyIssue::MultipleOwners { id: "c".into() })
        );

        let (mut nodes, roots) = tree.to_parts();
        nodes.get_mut("a").unwrap().parent_id = None;
        assert_eq!(
            check_topology(&nodes, &roots),
            Err(TopologyIssue::ParentMismatch { id: "a".into() })
        );

        // x and y own each other and nothing reaches them
        let (mut nodes, roots) = tree.to_parts();
        let mut x = Node::new("x", Field::new("group"), Some("y".into()), None);
        x.children = vec!["y".into()];
        let mut y = Node::new("y", Field::new("group"), Some("x".into()), None);
        y.children = vec!["x".into()];
        nodes.insert("x".into(), x);
        nodes.insert("y".into(), y);
        assert!(matches!(
            check_topology(&nodes, &roots),
            Err(TopologyIssue::Cycle { .. })
        ));
    }

    fn slot_problem(nodes: &NodeMap, roots: &[NodeId]) -> String {
        match check_topology(nodes, roots) {
            Err(TopologyIssue::SlotLayout { id, problem }) => format!("{}: {}", id, problem),
            other => panic!("expected a slot layout issue, got {:?}", other),
        }
    }

    #[test]
    fn test_undeclared_tab_slot_rejected() {
        let (mut nodes, roots) = sample_tree().to_parts();
        let tabs = nodes.get_mut("t").unwrap();
        let ids = tabs.tab_children.as_mut().unwrap().remove("one").unwrap();
        tabs.tab_children.as_mut().unwrap().insert("three".into(), ids);
        nodes.get_mut("c").unwrap().parent_slot = Some("three".into());

        assert_eq!(slot_problem(&nodes, &roots), "t: tabChildren.three is not a declared tab");
    }

    #[test]
    fn test_tabs_with_plain_children_rejected() {
        let (mut nodes, roots) = sample_tree().to_parts();
        let tabs = nodes.get_mut("t").unwrap();
        tabs.tab_children = None;
        tabs.children = vec!["c".into()];
        nodes.get_mut("c").unwrap().parent_slot = None;

        assert_eq!(slot_problem(&nodes, &roots), "t: tabs keep children in tabChildren only");
    }

    #[test]
    fn test_slots_on_other_kinds_rejected() {
        let (mut nodes, roots) = sample_tree().to_parts();
        let group = nodes.get_mut("g").unwrap();
        let mut slots = crate::tree::SlotMap::new();
        slots.insert("one".into(), vec!["b".into()]);
        group.tab_children = Some(slots);
        group.children = vec!["a".into()];
        nodes.get_mut("b").unwrap().parent_slot = Some("one".into());
        assert_eq!(slot_problem(&nodes, &roots), "g: group fields cannot have tabChildren");

        let (mut nodes, roots) = sample_tree().to_parts();
        nodes.get_mut("g").unwrap().children = vec!["a".into()];
        nodes.get_mut("a").unwrap().children = vec!["b".into()];
        nodes.get_mut("b").unwrap().parent_id = Some("a".into());
        assert_eq!(slot_problem(&nodes, &roots), "a: text fields cannot have children");
    }

    #[test]
    fn test_empty_slot_map_on_group_is_accepted() {
        let (mut nodes, roots) = sample_tree().to_parts();
        nodes.get_mut("g").unwrap().tab_children = Some(crate::tree::SlotMap::new());
        assert_eq!(check_topology(&nodes, &roots), Ok(()));
    }
}
