//! Randomized sequences of store operations must keep every tree invariant

use formsmith_editor::topology::is_descendant;
use formsmith_editor::{
    all_field_names, check_topology, from_fields, to_fields, EditorConfig, FieldRegistry,
    FormStore, IDGenerator, ManualClock,
};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

const TYPES: [&str; 8] = ["text", "email", "checkbox", "row", "group", "collapsible", "array", "tabs"];

#[derive(Debug, Clone)]
enum Op {
    Create { ty: usize, parent: usize, index: usize, slot: usize },
    Move { node: usize, parent: usize, index: usize, slot: usize },
    Remove { node: usize },
    Duplicate { node: usize },
    Undo,
    Redo,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..TYPES.len(), any::<usize>(), 0usize..6, 0usize..3)
            .prop_map(|(ty, parent, index, slot)| Op::Create { ty, parent, index, slot }),
        3 => (any::<usize>(), any::<usize>(), 0usize..6, 0usize..3)
            .prop_map(|(node, parent, index, slot)| Op::Move { node, parent, index, slot }),
        1 => any::<usize>().prop_map(|node| Op::Remove { node }),
        1 => any::<usize>().prop_map(|node| Op::Duplicate { node }),
        1 => Just(Op::Undo),
        1 => Just(Op::Redo),
    ]
}

fn slot_name(slot: usize) -> Option<&'static str> {
    match slot {
        0 => None,
        1 => Some("tab1"),
        _ => Some("tab2"),
    }
}

/// Pick a node by index; `ids.len()` stands for root
fn pick(ids: &[String], n: usize) -> Option<String> {
    let choice = n % (ids.len() + 1);
    ids.get(choice).cloned()
}

fn run(store: &mut FormStore, op: &Op) {
    let ids: Vec<String> = store.nodes().keys().cloned().collect();

    match op {
        Op::Create { ty, parent, index, slot } => {
            let parent = pick(&ids, *parent);
            let _ = store.create_node(TYPES[*ty], parent.as_deref(), *index, slot_name(*slot));
        }
        Op::Move { node, parent, index, slot } => {
            let Some(node) = pick(&ids, *node) else { return };
            let parent = pick(&ids, *parent);
            let _ = store.move_node(&node, parent.as_deref(), *index, slot_name(*slot));
        }
        Op::Remove { node } => {
            if let Some(node) = pick(&ids, *node) {
                let _ = store.remove_node(&node);
            }
        }
        Op::Duplicate { node } => {
            if let Some(node) = pick(&ids, *node) {
                let _ = store.duplicate_node(&node);
            }
        }
        Op::Undo => {
            store.undo();
        }
        Op::Redo => {
            store.redo();
        }
    }
}

fn store() -> FormStore {
    FormStore::with_clock(
        FieldRegistry::with_builtin_types(),
        &EditorConfig {
            coalesce_ms: 0,
            ..EditorConfig::default()
        },
        Arc::new(ManualClock::new(0)),
    )
    .with_ids(IDGenerator::from_seed("p"))
}

proptest! {
    #[test]
    fn test_topology_holds_after_any_sequence(ops in prop::collection::vec(op(), 1..40)) {
        let mut store = store();
        for op in &ops {
            run(&mut store, op);
            prop_assert_eq!(check_topology(store.nodes(), store.root_ids()), Ok(()));
        }
    }

    #[test]
    fn test_no_node_is_its_own_descendant(ops in prop::collection::vec(op(), 1..40)) {
        let mut store = store();
        for op in &ops {
            run(&mut store, op);
        }
        for id in store.nodes().keys() {
            prop_assert!(!is_descendant(store.nodes(), id, id));
        }
    }

    #[test]
    fn test_duplicates_never_share_names(ops in prop::collection::vec(op(), 1..40)) {
        let mut store = store();
        for op in &ops {
            if matches!(op, Op::Undo | Op::Redo) {
                continue;
            }
            run(&mut store, op);
        }

        let names = all_field_names(store.tree());
        let unique: HashSet<&String> = names.iter().collect();
        prop_assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_schema_round_trip(ops in prop::collection::vec(op(), 1..40)) {
        let mut store = store();
        for op in &ops {
            run(&mut store, op);
        }

        let registry = FieldRegistry::with_builtin_types();
        let exported = to_fields(store.tree(), &registry);
        let mut ids = IDGenerator::from_seed("rt");
        let rebuilt = from_fields(&exported, &registry, &mut ids);

        prop_assert_eq!(rebuilt.len(), store.tree().len());
        prop_assert_eq!(to_fields(&rebuilt, &registry), exported);
        prop_assert_eq!(check_topology(rebuilt.nodes(), rebuilt.root_ids()), Ok(()));
    }
}
