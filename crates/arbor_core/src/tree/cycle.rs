//! Cycle guard for container moves.
//!
//! # Responsibility
//! - Collect a container's subtree by following child links.
//! - Decide whether a candidate parent would create a cycle.
//!
//! # Invariants
//! - Traversal is iterative and visits at most `containers.len()` nodes.
//! - Revisiting a node means the stored graph already has a cycle and is
//!   reported as `CorruptHierarchy`.

use super::{Hierarchy, TreeError};
use crate::model::node::ContainerId;
use std::collections::{HashMap, HashSet};

/// Subtree of `container_id` grouped by level, starting with `[container_id]`.
pub fn subtree_levels(
    hierarchy: &Hierarchy,
    container_id: ContainerId,
) -> Result<Vec<Vec<ContainerId>>, TreeError> {
    hierarchy.require_container(container_id)?;

    let mut children: HashMap<ContainerId, Vec<ContainerId>> = HashMap::new();
    for container in &hierarchy.containers {
        if let Some(parent_id) = container.parent_id {
            children.entry(parent_id).or_default().push(container.id);
        }
    }

    let limit = hierarchy.containers.len();
    let mut visited = HashSet::from([container_id]);
    let mut levels = vec![vec![container_id]];
    loop {
        let mut next = Vec::new();
        for parent_id in levels.last().into_iter().flatten() {
            for child_id in children.get(parent_id).into_iter().flatten() {
                if !visited.insert(*child_id) || visited.len() > limit {
                    return Err(TreeError::CorruptHierarchy {
                        start: container_id,
                        limit,
                    });
                }
                next.push(*child_id);
            }
        }
        if next.is_empty() {
            return Ok(levels);
        }
        levels.push(next);
    }
}

/// Every container reachable from `container_id` through child links,
/// including `container_id` itself, shallow levels first.
pub fn descendants_of(
    hierarchy: &Hierarchy,
    container_id: ContainerId,
) -> Result<Vec<ContainerId>, TreeError> {
    Ok(subtree_levels(hierarchy, container_id)?
        .into_iter()
        .flatten()
        .collect())
}

/// Whether parenting `container_id` under `candidate_parent_id` would create a
/// cycle. Root (`None`) never does.
pub fn would_cycle(
    hierarchy: &Hierarchy,
    container_id: ContainerId,
    candidate_parent_id: Option<ContainerId>,
) -> Result<bool, TreeError> {
    let Some(candidate_parent_id) = candidate_parent_id else {
        return Ok(false);
    };
    Ok(descendants_of(hierarchy, container_id)?.contains(&candidate_parent_id))
}

#[cfg(test)]
mod tests {
    use super::{descendants_of, subtree_levels, would_cycle};
    use crate::model::node::{Container, ContainerKind, NodeRef};
    use crate::tree::{Hierarchy, TreeError};
    use uuid::Uuid;

    fn chain() -> (Hierarchy, Vec<Uuid>) {
        let a = Container::new(ContainerKind::Folder, "a");
        let mut b = Container::new(ContainerKind::Folder, "b");
        b.parent_id = Some(a.id);
        let mut c = Container::new(ContainerKind::Folder, "c");
        c.parent_id = Some(b.id);
        let mut d = Container::new(ContainerKind::Folder, "d");
        d.parent_id = Some(a.id);
        d.display_order = 1;
        let ids = vec![a.id, b.id, c.id, d.id];
        (Hierarchy::new(vec![a, b, c, d], vec![]), ids)
    }

    #[test]
    fn descendants_include_self_and_all_levels() {
        let (hierarchy, ids) = chain();
        let levels = subtree_levels(&hierarchy, ids[0]).unwrap();
        assert_eq!(levels, vec![vec![ids[0]], vec![ids[1], ids[3]], vec![ids[2]]]);
        assert_eq!(descendants_of(&hierarchy, ids[2]).unwrap(), vec![ids[2]]);
    }

    #[test]
    fn would_cycle_detects_self_and_descendants() {
        let (hierarchy, ids) = chain();
        assert!(would_cycle(&hierarchy, ids[0], Some(ids[0])).unwrap());
        assert!(would_cycle(&hierarchy, ids[0], Some(ids[2])).unwrap());
        assert!(!would_cycle(&hierarchy, ids[1], Some(ids[3])).unwrap());
        assert!(!would_cycle(&hierarchy, ids[2], None).unwrap());
    }

    #[test]
    fn stored_cycle_is_reported_as_corruption() {
        let (mut hierarchy, ids) = chain();
        hierarchy.container_mut(ids[0]).unwrap().parent_id = Some(ids[2]);

        let err = descendants_of(&hierarchy, ids[1]).unwrap_err();
        assert!(matches!(err, TreeError::CorruptHierarchy { start, .. } if start == ids[1]));
    }

    #[test]
    fn unknown_container_is_not_found() {
        let (hierarchy, _) = chain();
        let missing = Uuid::new_v4();
        assert_eq!(
            descendants_of(&hierarchy, missing).unwrap_err(),
            TreeError::NotFound(NodeRef::Container(missing))
        );
    }
}
