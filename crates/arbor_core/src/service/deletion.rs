//! Container deletion with leaf rescue.
//!
//! # Responsibility
//! - Remove a container and every descendant container.
//! - Move every leaf held anywhere in that subtree to a surviving container.
//!
//! # Invariants
//! - Leaves are never deleted; they land at the end of the rescue target in
//!   subtree order (shallow containers first).
//! - Planned writes rescue leaves before any container is removed, and remove
//!   descendants before ancestors.

use super::move_coordinator::{collect_containers, collect_leaves};
use super::persist::PlannedWrites;
use crate::model::node::{Container, ContainerId, Leaf};
use crate::repo::hierarchy_repo::HierarchyWrite;
use crate::tree::cycle::subtree_levels;
use crate::tree::ordering::SiblingPlan;
use crate::tree::{Hierarchy, TreeError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Where leaves of a deleted subtree go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescueTarget {
    /// The deleted container's own parent (root level when it had none).
    #[default]
    Parent,
    /// Always the root level.
    Root,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub rescue_to: RescueTarget,
}

/// Result of deleting one container subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDeletion {
    /// Removed containers, deepest level first.
    pub deleted_container_ids: Vec<ContainerId>,
    /// Container that received the rescued leaves; `None` is root level.
    pub rescue_target: Option<ContainerId>,
    /// Leaves moved out of the subtree, in their new order.
    pub rescued_leaves: Vec<Leaf>,
    /// Every leaf whose container or order changed.
    pub updated_leaves: Vec<Leaf>,
    /// Surviving former siblings renumbered to close the gap.
    pub updated_containers: Vec<Container>,
}

impl PlannedWrites for ContainerDeletion {
    fn writes(&self) -> Vec<HierarchyWrite> {
        let mut writes: Vec<HierarchyWrite> = self
            .updated_leaves
            .iter()
            .map(HierarchyWrite::place_leaf)
            .collect();
        writes.extend(
            self.deleted_container_ids
                .iter()
                .copied()
                .map(HierarchyWrite::DeleteContainer),
        );
        writes.extend(
            self.updated_containers
                .iter()
                .map(HierarchyWrite::place_container),
        );
        writes
    }
}

/// Deletes `container_id` and its descendants, rescuing every contained leaf.
pub fn delete_container(
    hierarchy: &mut Hierarchy,
    container_id: ContainerId,
    options: DeleteOptions,
) -> Result<ContainerDeletion, TreeError> {
    let parent_id = hierarchy.require_container(container_id)?.parent_id;
    let levels = subtree_levels(hierarchy, container_id)?;
    let rescue_target = match options.rescue_to {
        RescueTarget::Parent => parent_id,
        RescueTarget::Root => None,
    };

    let rescued_ids: Vec<_> = levels
        .iter()
        .flatten()
        .flat_map(|id| hierarchy.leaf_ids_in(Some(*id)))
        .collect();
    let changed_leaves = if rescued_ids.is_empty() {
        Vec::new()
    } else {
        let mut plan = SiblingPlan::new();
        plan.group_mut(&hierarchy.leaves, rescue_target, &rescued_ids)
            .extend(rescued_ids.iter().copied());
        plan.apply(&mut hierarchy.leaves)
    };

    let deleted_container_ids: Vec<ContainerId> =
        levels.iter().rev().flatten().copied().collect();
    let deleted: HashSet<ContainerId> = deleted_container_ids.iter().copied().collect();
    hierarchy
        .containers
        .retain(|container| !deleted.contains(&container.id));

    let mut plan = SiblingPlan::new();
    plan.group_mut(&hierarchy.containers, parent_id, &[]);
    let changed_containers = plan.apply(&mut hierarchy.containers);

    Ok(ContainerDeletion {
        deleted_container_ids,
        rescue_target,
        rescued_leaves: collect_leaves(hierarchy, &rescued_ids),
        updated_leaves: collect_leaves(hierarchy, &changed_leaves),
        updated_containers: collect_containers(hierarchy, &changed_containers),
    })
}

#[cfg(test)]
mod tests {
    use super::{delete_container, DeleteOptions, RescueTarget};
    use crate::model::node::{Container, ContainerKind, Leaf, LeafKind};
    use crate::repo::hierarchy_repo::HierarchyWrite;
    use crate::service::persist::PlannedWrites;
    use crate::tree::invariants::check_invariants;
    use crate::tree::Hierarchy;
    use uuid::Uuid;

    fn folder(name: &str, parent: Option<Uuid>, order: u32) -> Container {
        let mut container = Container::new(ContainerKind::Folder, name);
        container.parent_id = parent;
        container.display_order = order;
        container
    }

    fn item(container_id: Option<Uuid>, order: u32) -> Leaf {
        let mut leaf = Leaf::new(LeafKind::ContentItem);
        leaf.container_id = container_id;
        leaf.display_order = order;
        leaf
    }

    #[test]
    fn subtree_leaves_are_rescued_to_parent() {
        let x = folder("X", None, 0);
        let p = folder("P", Some(x.id), 0);
        let q = folder("Q", Some(p.id), 0);
        let sibling = folder("S", Some(x.id), 1);
        let l1 = item(Some(p.id), 0);
        let l2 = item(Some(q.id), 0);
        let existing = item(Some(x.id), 0);
        let mut hierarchy = Hierarchy::new(
            vec![x.clone(), p.clone(), q.clone(), sibling.clone()],
            vec![l1.clone(), l2.clone(), existing.clone()],
        );

        let outcome = delete_container(&mut hierarchy, p.id, DeleteOptions::default()).unwrap();

        assert_eq!(outcome.deleted_container_ids, vec![q.id, p.id]);
        assert_eq!(outcome.rescue_target, Some(x.id));
        assert_eq!(
            hierarchy.leaf_ids_in(Some(x.id)),
            vec![existing.id, l1.id, l2.id]
        );
        assert_eq!(hierarchy.leaves.len(), 3);
        assert_eq!(hierarchy.child_container_ids(Some(x.id)), vec![sibling.id]);
        assert_eq!(hierarchy.container(sibling.id).unwrap().display_order, 0);
        assert!(check_invariants(&hierarchy).is_empty());
    }

    #[test]
    fn rescue_to_root_option() {
        let x = folder("X", None, 0);
        let p = folder("P", Some(x.id), 0);
        let leaf = item(Some(p.id), 0);
        let mut hierarchy = Hierarchy::new(vec![x, p.clone()], vec![leaf.clone()]);

        let outcome = delete_container(
            &mut hierarchy,
            p.id,
            DeleteOptions {
                rescue_to: RescueTarget::Root,
            },
        )
        .unwrap();

        assert_eq!(outcome.rescue_target, None);
        assert_eq!(hierarchy.leaf(leaf.id).unwrap().container_id, None);
    }

    #[test]
    fn writes_rescue_before_deleting_deepest_first() {
        let p = folder("P", None, 0);
        let q = folder("Q", Some(p.id), 0);
        let survivor = folder("R", None, 1);
        let leaf = item(Some(q.id), 0);
        let mut hierarchy =
            Hierarchy::new(vec![p.clone(), q.clone(), survivor.clone()], vec![leaf.clone()]);

        let writes = delete_container(&mut hierarchy, p.id, DeleteOptions::default())
            .unwrap()
            .writes();

        assert_eq!(
            writes,
            vec![
                HierarchyWrite::PlaceLeaf {
                    id: leaf.id,
                    container_id: None,
                    display_order: 0,
                },
                HierarchyWrite::DeleteContainer(q.id),
                HierarchyWrite::DeleteContainer(p.id),
                HierarchyWrite::PlaceContainer {
                    id: survivor.id,
                    parent_id: None,
                    display_order: 0,
                },
            ]
        );
    }
}
