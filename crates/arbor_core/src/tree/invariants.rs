//! Hierarchy invariant audit.
//!
//! # Responsibility
//! - Report every violation of the structural invariants in one pass.
//!
//! # Invariants
//! - Read-only: the audit never repairs data.

use super::ordering::{is_dense, Sequenced};
use super::Hierarchy;
use crate::model::node::{ContainerId, DepthPolicy, LeafId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::{Display, Formatter};

/// One broken structural invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Container parent does not exist.
    DanglingParent {
        container_id: ContainerId,
        parent_id: ContainerId,
    },
    /// Leaf container does not exist.
    DanglingLeaf {
        leaf_id: LeafId,
        container_id: ContainerId,
    },
    /// Container is its own ancestor.
    Cycle { container_id: ContainerId },
    /// Container sibling group orders are not `0..n`.
    SparseContainerOrder { parent_id: Option<ContainerId> },
    /// Leaf sibling group orders are not `0..n`.
    SparseLeafOrder { container_id: Option<ContainerId> },
    /// Two-level container sits under a non-root parent.
    DepthPolicy {
        container_id: ContainerId,
        parent_id: ContainerId,
    },
}

impl Display for InvariantViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DanglingParent {
                container_id,
                parent_id,
            } => write!(f, "container {container_id} references missing parent {parent_id}"),
            Self::DanglingLeaf {
                leaf_id,
                container_id,
            } => write!(f, "leaf {leaf_id} references missing container {container_id}"),
            Self::Cycle { container_id } => {
                write!(f, "container {container_id} is its own ancestor")
            }
            Self::SparseContainerOrder { parent_id } => {
                write!(f, "container orders under {} are not dense", group_label(*parent_id))
            }
            Self::SparseLeafOrder { container_id } => {
                write!(f, "leaf orders under {} are not dense", group_label(*container_id))
            }
            Self::DepthPolicy {
                container_id,
                parent_id,
            } => write!(
                f,
                "two-level container {container_id} is nested under non-root parent {parent_id}"
            ),
        }
    }
}

/// Audits referential integrity, acyclicity, dense ordering, and depth policy.
pub fn check_invariants(hierarchy: &Hierarchy) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let parents: HashMap<ContainerId, Option<ContainerId>> = hierarchy
        .containers
        .iter()
        .map(|container| (container.id, container.parent_id))
        .collect();

    for container in &hierarchy.containers {
        let Some(parent_id) = container.parent_id else {
            continue;
        };
        match parents.get(&parent_id) {
            None => violations.push(InvariantViolation::DanglingParent {
                container_id: container.id,
                parent_id,
            }),
            Some(grandparent) => {
                if container.depth_policy == DepthPolicy::TwoLevel && grandparent.is_some() {
                    violations.push(InvariantViolation::DepthPolicy {
                        container_id: container.id,
                        parent_id,
                    });
                }
            }
        }
    }

    for leaf in &hierarchy.leaves {
        if let Some(container_id) = leaf.container_id {
            if !parents.contains_key(&container_id) {
                violations.push(InvariantViolation::DanglingLeaf {
                    leaf_id: leaf.id,
                    container_id,
                });
            }
        }
    }

    for container in &hierarchy.containers {
        if is_own_ancestor(container.id, &parents) {
            violations.push(InvariantViolation::Cycle {
                container_id: container.id,
            });
        }
    }

    for parent_id in sparse_groups(&hierarchy.containers) {
        violations.push(InvariantViolation::SparseContainerOrder { parent_id });
    }
    for container_id in sparse_groups(&hierarchy.leaves) {
        violations.push(InvariantViolation::SparseLeafOrder { container_id });
    }

    violations
}

fn is_own_ancestor(
    container_id: ContainerId,
    parents: &HashMap<ContainerId, Option<ContainerId>>,
) -> bool {
    let mut seen = HashSet::new();
    let mut cursor = parents.get(&container_id).copied().flatten();
    while let Some(current) = cursor {
        if current == container_id {
            return true;
        }
        if !seen.insert(current) {
            return false;
        }
        cursor = parents.get(&current).copied().flatten();
    }
    false
}

fn sparse_groups<T: Sequenced>(records: &[T]) -> Vec<Option<ContainerId>> {
    let mut groups: BTreeMap<Option<ContainerId>, Vec<u32>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.group())
            .or_default()
            .push(record.display_order());
    }
    groups
        .into_iter()
        .filter(|(_, orders)| !is_dense(orders.iter().copied()))
        .map(|(group, _)| group)
        .collect()
}

fn group_label(group: Option<ContainerId>) -> String {
    group.map_or_else(|| "root".to_string(), |id| id.to_string())
}
