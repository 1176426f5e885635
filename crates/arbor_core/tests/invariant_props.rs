use arbor_core::service::deletion::delete_container;
use arbor_core::service::move_coordinator::{move_container, move_leaf, move_leaves_bulk};
use arbor_core::tree::invariants::check_invariants;
use arbor_core::tree::ordering::reindex;
use arbor_core::{
    Container, ContainerKind, DeleteOptions, Hierarchy, Leaf, LeafKind, RescueTarget,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum HierarchyOp {
    CreateContainer { parent: Option<usize>, menu: bool },
    CreateLeaf { container: Option<usize> },
    MoveContainer { who: usize, dest: Option<usize>, index: usize },
    MoveLeaf { who: usize, dest: Option<usize>, index: usize },
    MoveLeavesBulk { whos: Vec<usize>, dest: Option<usize> },
    Delete { who: usize, to_root: bool },
}

fn arbitrary_op() -> impl Strategy<Value = HierarchyOp> {
    prop_oneof![
        (prop::option::of(0..16usize), any::<bool>())
            .prop_map(|(parent, menu)| HierarchyOp::CreateContainer { parent, menu }),
        prop::option::of(0..16usize).prop_map(|container| HierarchyOp::CreateLeaf { container }),
        (0..16usize, prop::option::of(0..16usize), 0..8usize)
            .prop_map(|(who, dest, index)| HierarchyOp::MoveContainer { who, dest, index }),
        (0..32usize, prop::option::of(0..16usize), 0..8usize)
            .prop_map(|(who, dest, index)| HierarchyOp::MoveLeaf { who, dest, index }),
        (prop::collection::vec(0..32usize, 1..5), prop::option::of(0..16usize))
            .prop_map(|(whos, dest)| HierarchyOp::MoveLeavesBulk { whos, dest }),
        (0..16usize, any::<bool>()).prop_map(|(who, to_root)| HierarchyOp::Delete { who, to_root }),
    ]
}

fn container_at(hierarchy: &Hierarchy, index: usize) -> Option<uuid::Uuid> {
    if hierarchy.containers.is_empty() {
        return None;
    }
    Some(hierarchy.containers[index % hierarchy.containers.len()].id)
}

fn leaf_at(hierarchy: &Hierarchy, index: usize) -> Option<uuid::Uuid> {
    if hierarchy.leaves.is_empty() {
        return None;
    }
    Some(hierarchy.leaves[index % hierarchy.leaves.len()].id)
}

fn destination(hierarchy: &Hierarchy, index: Option<usize>) -> Option<uuid::Uuid> {
    index.and_then(|index| container_at(hierarchy, index))
}

/// Applies one op; returns `false` when it was rejected.
fn apply_op(hierarchy: &mut Hierarchy, op: &HierarchyOp) -> bool {
    match op {
        HierarchyOp::CreateContainer { parent, menu } => {
            let parent_id = destination(hierarchy, *parent);
            let kind = if *menu {
                ContainerKind::MenuGroup
            } else {
                ContainerKind::Folder
            };
            let mut container = Container::new(kind, "generated");
            if *menu {
                let nested = parent_id
                    .and_then(|id| hierarchy.container(id))
                    .is_some_and(|parent| parent.parent_id.is_some());
                if nested {
                    return false;
                }
            }
            container.parent_id = parent_id;
            container.display_order = hierarchy.child_container_ids(parent_id).len() as u32;
            hierarchy.containers.push(container);
            true
        }
        HierarchyOp::CreateLeaf { container } => {
            let container_id = destination(hierarchy, *container);
            let mut leaf = Leaf::new(LeafKind::ContentItem);
            leaf.container_id = container_id;
            leaf.display_order = hierarchy.leaf_ids_in(container_id).len() as u32;
            hierarchy.leaves.push(leaf);
            true
        }
        HierarchyOp::MoveContainer { who, dest, index } => {
            let Some(container_id) = container_at(hierarchy, *who) else {
                return false;
            };
            let dest = destination(hierarchy, *dest);
            move_container(hierarchy, container_id, dest, *index).is_ok()
        }
        HierarchyOp::MoveLeaf { who, dest, index } => {
            let Some(leaf_id) = leaf_at(hierarchy, *who) else {
                return false;
            };
            let dest = destination(hierarchy, *dest);
            move_leaf(hierarchy, leaf_id, dest, *index).is_ok()
        }
        HierarchyOp::MoveLeavesBulk { whos, dest } => {
            let leaf_ids: Vec<_> = whos
                .iter()
                .filter_map(|who| leaf_at(hierarchy, *who))
                .collect();
            let dest = destination(hierarchy, *dest);
            move_leaves_bulk(hierarchy, &leaf_ids, dest).is_ok()
        }
        HierarchyOp::Delete { who, to_root } => {
            let Some(container_id) = container_at(hierarchy, *who) else {
                return false;
            };
            let options = DeleteOptions {
                rescue_to: if *to_root {
                    RescueTarget::Root
                } else {
                    RescueTarget::Parent
                },
            };
            delete_container(hierarchy, container_id, options).is_ok()
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    #[test]
    fn random_operations_keep_hierarchy_valid(
        ops in prop::collection::vec(arbitrary_op(), 1..80),
    ) {
        let mut hierarchy = Hierarchy::default();

        for op in &ops {
            let before = hierarchy.clone();
            let leaf_count = hierarchy.leaves.len();
            let applied = apply_op(&mut hierarchy, op);

            if !applied {
                prop_assert_eq!(&hierarchy, &before);
            }
            if matches!(op, HierarchyOp::Delete { .. }) {
                prop_assert_eq!(hierarchy.leaves.len(), leaf_count);
            }
            let violations = check_invariants(&hierarchy);
            prop_assert!(violations.is_empty(), "{:?} after {:?}", violations, op);
        }
    }

    #[test]
    fn reindex_is_idempotent(orders in prop::collection::vec(0..50u32, 0..20)) {
        let mut siblings: Vec<Container> = orders
            .iter()
            .map(|order| {
                let mut container = Container::new(ContainerKind::Folder, "sibling");
                container.display_order = *order;
                container
            })
            .collect();

        reindex(&mut siblings);
        let once = siblings.clone();
        let changed = reindex(&mut siblings);

        prop_assert!(changed.is_empty());
        prop_assert_eq!(siblings, once);
    }
}
