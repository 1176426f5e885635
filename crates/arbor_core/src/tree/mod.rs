//! In-memory hierarchy engine over the flat record collection.
//!
//! # Responsibility
//! - Hold one loaded snapshot of containers and leaves per operation.
//! - Provide ordering, cycle, breadcrumb, tree-building, and audit helpers.
//!
//! # Invariants
//! - The flat collection is the single source of truth; no nested tree is
//!   cached between operations.
//! - Every traversal is bounded by the container count and reports
//!   `TreeError::CorruptHierarchy` instead of looping.

pub mod breadcrumb;
pub mod builder;
pub mod cycle;
pub mod invariants;
pub mod ordering;

use crate::model::node::{Container, ContainerId, Leaf, LeafId, NodeRef};
use ordering::stable_sibling_order;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Structural validation errors. Raised before any persistence call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Referenced record does not exist in the current collection.
    NotFound(NodeRef),
    /// Container would be nested under itself or one of its descendants.
    Cycle {
        container_id: ContainerId,
        parent_id: ContainerId,
    },
    /// A traversal exceeded the container count starting from `start`.
    CorruptHierarchy { start: ContainerId, limit: usize },
    /// A two-level container would end up three levels deep.
    DepthLimitExceeded {
        container_id: ContainerId,
        parent_id: ContainerId,
    },
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(node) => write!(f, "{node} not found"),
            Self::Cycle {
                container_id,
                parent_id,
            } => write!(
                f,
                "move would create cycle: container {container_id} under parent {parent_id}"
            ),
            Self::CorruptHierarchy { start, limit } => write!(
                f,
                "corrupt hierarchy: traversal from container {start} exceeded {limit} containers"
            ),
            Self::DepthLimitExceeded {
                container_id,
                parent_id,
            } => write!(
                f,
                "two-level container {container_id} cannot be nested under non-root parent {parent_id}"
            ),
        }
    }
}

impl Error for TreeError {}

/// Flat snapshot of every container and leaf.
///
/// Input order is preserved and used as the tie-break when two siblings share
/// a `display_order`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hierarchy {
    pub containers: Vec<Container>,
    pub leaves: Vec<Leaf>,
}

impl Hierarchy {
    pub fn new(containers: Vec<Container>, leaves: Vec<Leaf>) -> Self {
        Self { containers, leaves }
    }

    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.containers.iter().find(|container| container.id == id)
    }

    pub fn container_mut(&mut self, id: ContainerId) -> Option<&mut Container> {
        self.containers.iter_mut().find(|container| container.id == id)
    }

    pub fn leaf(&self, id: LeafId) -> Option<&Leaf> {
        self.leaves.iter().find(|leaf| leaf.id == id)
    }

    /// Loads a container or reports it missing.
    pub fn require_container(&self, id: ContainerId) -> Result<&Container, TreeError> {
        self.container(id)
            .ok_or(TreeError::NotFound(NodeRef::Container(id)))
    }

    /// Loads a leaf or reports it missing.
    pub fn require_leaf(&self, id: LeafId) -> Result<&Leaf, TreeError> {
        self.leaf(id).ok_or(TreeError::NotFound(NodeRef::Leaf(id)))
    }

    /// Accepts root (`None`) or an existing container.
    pub fn require_parent(&self, parent_id: Option<ContainerId>) -> Result<(), TreeError> {
        match parent_id {
            Some(id) => self.require_container(id).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Child container ids of `parent_id`, ordered by `display_order`.
    pub fn child_container_ids(&self, parent_id: Option<ContainerId>) -> Vec<ContainerId> {
        stable_sibling_order(&self.containers, parent_id)
    }

    /// Leaf ids held by `container_id`, ordered by `display_order`.
    pub fn leaf_ids_in(&self, container_id: Option<ContainerId>) -> Vec<LeafId> {
        stable_sibling_order(&self.leaves, container_id)
    }

    /// Child containers of `parent_id`, ordered.
    pub fn children(&self, parent_id: Option<ContainerId>) -> Vec<&Container> {
        self.child_container_ids(parent_id)
            .into_iter()
            .filter_map(|id| self.container(id))
            .collect()
    }

    /// Leaves held by `container_id`, ordered.
    pub fn leaves_in(&self, container_id: Option<ContainerId>) -> Vec<&Leaf> {
        self.leaf_ids_in(container_id)
            .into_iter()
            .filter_map(|id| self.leaf(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Hierarchy, TreeError};
    use crate::model::node::{Container, ContainerKind, Leaf, LeafKind, NodeRef};

    #[test]
    fn sibling_listing_breaks_ties_by_input_order() {
        let mut first = Container::new(ContainerKind::Folder, "first");
        let mut second = Container::new(ContainerKind::Folder, "second");
        first.display_order = 1;
        second.display_order = 1;
        let mut zero = Container::new(ContainerKind::Folder, "zero");
        zero.display_order = 0;
        let hierarchy = Hierarchy::new(vec![first.clone(), second.clone(), zero.clone()], vec![]);

        assert_eq!(
            hierarchy.child_container_ids(None),
            vec![zero.id, first.id, second.id]
        );
    }

    #[test]
    fn require_helpers_report_missing_records() {
        let hierarchy = Hierarchy::default();
        let leaf = Leaf::new(LeafKind::ContentItem);
        assert_eq!(
            hierarchy.require_leaf(leaf.id).unwrap_err(),
            TreeError::NotFound(NodeRef::Leaf(leaf.id))
        );
        assert!(hierarchy.require_parent(None).is_ok());
    }
}
