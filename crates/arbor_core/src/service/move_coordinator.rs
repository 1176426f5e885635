//! Structural moves over a loaded hierarchy.
//!
//! # Responsibility
//! - Relocate one leaf, a batch of leaves, or one container.
//! - Enforce cycle and depth rules before touching any record.
//!
//! # Invariants
//! - Validation failures return before the hierarchy is modified.
//! - Every affected sibling group is renumbered exactly once.
//! - Two-level containers moved under a non-root parent give up their
//!   children to the root level.

use super::persist::PlannedWrites;
use crate::model::node::{Container, ContainerId, DepthPolicy, Leaf, LeafId};
use crate::repo::hierarchy_repo::HierarchyWrite;
use crate::tree::cycle::would_cycle;
use crate::tree::ordering::{insert_clamped, SiblingPlan};
use crate::tree::{Hierarchy, TreeError};
use std::collections::{BTreeSet, HashSet};

/// Result of moving one leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafMove {
    /// The moved leaf after the move.
    pub leaf: Leaf,
    /// Every leaf whose container or order changed, the moved one included.
    pub updated: Vec<Leaf>,
}

/// Result of moving several leaves to the end of one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkLeafMove {
    /// Every leaf whose container or order changed.
    pub updated: Vec<Leaf>,
}

/// Result of moving one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerMove {
    /// The moved container after the move.
    pub container: Container,
    /// Every container whose parent or order changed, orphans included.
    pub updated_containers: Vec<Container>,
    /// Former children detached to the root level by the depth rule.
    pub orphaned: Vec<Container>,
}

impl PlannedWrites for LeafMove {
    fn writes(&self) -> Vec<HierarchyWrite> {
        self.updated.iter().map(HierarchyWrite::place_leaf).collect()
    }
}

impl PlannedWrites for BulkLeafMove {
    fn writes(&self) -> Vec<HierarchyWrite> {
        self.updated.iter().map(HierarchyWrite::place_leaf).collect()
    }
}

impl PlannedWrites for ContainerMove {
    fn writes(&self) -> Vec<HierarchyWrite> {
        self.updated_containers
            .iter()
            .map(HierarchyWrite::place_container)
            .collect()
    }
}

/// Moves `leaf_id` to `destination_index` (clamped) inside `destination`.
pub fn move_leaf(
    hierarchy: &mut Hierarchy,
    leaf_id: LeafId,
    destination: Option<ContainerId>,
    destination_index: usize,
) -> Result<LeafMove, TreeError> {
    let source = hierarchy.require_leaf(leaf_id)?.container_id;
    hierarchy.require_parent(destination)?;

    let mut plan = SiblingPlan::new();
    plan.group_mut(&hierarchy.leaves, source, &[leaf_id]);
    insert_clamped(
        plan.group_mut(&hierarchy.leaves, destination, &[leaf_id]),
        leaf_id,
        destination_index,
    );
    let changed = plan.apply(&mut hierarchy.leaves);

    Ok(LeafMove {
        leaf: hierarchy.require_leaf(leaf_id)?.clone(),
        updated: collect_leaves(hierarchy, &changed),
    })
}

/// Appends `leaf_ids` to the end of `destination`, keeping the given order.
///
/// Duplicate ids keep their first position. Every id is validated before any
/// leaf moves.
pub fn move_leaves_bulk(
    hierarchy: &mut Hierarchy,
    leaf_ids: &[LeafId],
    destination: Option<ContainerId>,
) -> Result<BulkLeafMove, TreeError> {
    let mut seen = HashSet::new();
    let moving: Vec<LeafId> = leaf_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();

    let mut sources = BTreeSet::new();
    for leaf_id in &moving {
        sources.insert(hierarchy.require_leaf(*leaf_id)?.container_id);
    }
    hierarchy.require_parent(destination)?;

    let mut plan = SiblingPlan::new();
    for source in sources {
        plan.group_mut(&hierarchy.leaves, source, &moving);
    }
    plan.group_mut(&hierarchy.leaves, destination, &moving)
        .extend(moving.iter().copied());
    let changed = plan.apply(&mut hierarchy.leaves);

    Ok(BulkLeafMove {
        updated: collect_leaves(hierarchy, &changed),
    })
}

/// Moves `container_id` under `destination` at `destination_index` (clamped).
pub fn move_container(
    hierarchy: &mut Hierarchy,
    container_id: ContainerId,
    destination: Option<ContainerId>,
    destination_index: usize,
) -> Result<ContainerMove, TreeError> {
    let container = hierarchy.require_container(container_id)?.clone();
    hierarchy.require_parent(destination)?;

    if let Some(parent_id) = destination {
        if parent_id == container_id || would_cycle(hierarchy, container_id, destination)? {
            return Err(TreeError::Cycle {
                container_id,
                parent_id,
            });
        }
        let parent = hierarchy.require_container(parent_id)?;
        if container.depth_policy == DepthPolicy::TwoLevel && parent.parent_id.is_some() {
            return Err(TreeError::DepthLimitExceeded {
                container_id,
                parent_id,
            });
        }
    }

    let mut plan = SiblingPlan::new();
    plan.group_mut(&hierarchy.containers, container.parent_id, &[container_id]);

    let mut orphan_ids = Vec::new();
    if destination.is_some() {
        let (orphans, kept): (Vec<ContainerId>, Vec<ContainerId>) = hierarchy
            .child_container_ids(Some(container_id))
            .into_iter()
            .partition(|child_id| {
                container.depth_policy == DepthPolicy::TwoLevel
                    || hierarchy
                        .container(*child_id)
                        .is_some_and(|child| child.depth_policy == DepthPolicy::TwoLevel)
            });
        if !orphans.is_empty() {
            *plan.group_mut(&hierarchy.containers, Some(container_id), &[]) = kept;
            plan.group_mut(&hierarchy.containers, None, &[container_id])
                .extend(orphans.iter().copied());
            orphan_ids = orphans;
        }
    }

    insert_clamped(
        plan.group_mut(&hierarchy.containers, destination, &[container_id]),
        container_id,
        destination_index,
    );
    let changed = plan.apply(&mut hierarchy.containers);

    Ok(ContainerMove {
        container: hierarchy.require_container(container_id)?.clone(),
        updated_containers: collect_containers(hierarchy, &changed),
        orphaned: collect_containers(hierarchy, &orphan_ids),
    })
}

pub(crate) fn collect_leaves(hierarchy: &Hierarchy, ids: &[LeafId]) -> Vec<Leaf> {
    ids.iter()
        .filter_map(|id| hierarchy.leaf(*id).cloned())
        .collect()
}

pub(crate) fn collect_containers(hierarchy: &Hierarchy, ids: &[ContainerId]) -> Vec<Container> {
    ids.iter()
        .filter_map(|id| hierarchy.container(*id).cloned())
        .collect()
}
