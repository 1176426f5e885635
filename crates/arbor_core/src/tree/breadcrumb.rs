//! Ancestor path resolution for breadcrumbs.

use super::{Hierarchy, TreeError};
use crate::model::node::{Container, ContainerId, NodeRef};

/// Containers from the root down to `container_id`, inclusive.
///
/// The walk is bounded by the container count so a stored cycle or dangling
/// parent link fails with `CorruptHierarchy` instead of looping.
pub fn path_to(
    hierarchy: &Hierarchy,
    container_id: ContainerId,
) -> Result<Vec<Container>, TreeError> {
    let limit = hierarchy.containers.len();
    let mut path = Vec::new();
    let mut cursor = Some(hierarchy.require_container(container_id)?);

    while let Some(current) = cursor {
        if path.len() >= limit {
            return Err(TreeError::CorruptHierarchy {
                start: container_id,
                limit,
            });
        }
        path.push(current.clone());
        cursor = match current.parent_id {
            Some(parent_id) => Some(hierarchy.container(parent_id).ok_or(
                TreeError::CorruptHierarchy {
                    start: container_id,
                    limit,
                },
            )?),
            None => None,
        };
    }

    path.reverse();
    Ok(path)
}

/// Ancestor depth of `container_id`: 1 for root-level containers.
pub fn depth_of(hierarchy: &Hierarchy, container_id: ContainerId) -> Result<usize, TreeError> {
    path_to(hierarchy, container_id).map(|path| path.len())
}

/// Breadcrumb for any record. A leaf resolves to its container's path; a
/// root-level leaf has an empty path.
pub fn path_to_node(hierarchy: &Hierarchy, node: NodeRef) -> Result<Vec<Container>, TreeError> {
    match node {
        NodeRef::Container(id) => path_to(hierarchy, id),
        NodeRef::Leaf(id) => match hierarchy.require_leaf(id)?.container_id {
            Some(container_id) => path_to(hierarchy, container_id),
            None => Ok(Vec::new()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{depth_of, path_to, path_to_node};
    use crate::model::node::{Container, ContainerKind, Leaf, LeafKind, NodeRef};
    use crate::tree::{Hierarchy, TreeError};

    #[test]
    fn path_runs_from_root_to_target() {
        let docs = Container::new(ContainerKind::Folder, "Docs");
        let mut old = Container::new(ContainerKind::Folder, "Old");
        old.parent_id = Some(docs.id);
        let mut leaf = Leaf::new(LeafKind::ContentItem);
        leaf.container_id = Some(old.id);
        let hierarchy = Hierarchy::new(vec![old.clone(), docs.clone()], vec![leaf.clone()]);

        let names: Vec<String> = path_to(&hierarchy, old.id)
            .unwrap()
            .into_iter()
            .map(|container| container.name)
            .collect();
        assert_eq!(names, vec!["Docs", "Old"]);
        assert_eq!(depth_of(&hierarchy, docs.id).unwrap(), 1);
        assert_eq!(
            path_to_node(&hierarchy, NodeRef::Leaf(leaf.id)).unwrap().len(),
            2
        );
    }

    #[test]
    fn walk_terminates_on_parent_cycle() {
        let mut a = Container::new(ContainerKind::Folder, "a");
        let mut b = Container::new(ContainerKind::Folder, "b");
        a.parent_id = Some(b.id);
        b.parent_id = Some(a.id);
        let hierarchy = Hierarchy::new(vec![a.clone(), b], vec![]);

        let err = path_to(&hierarchy, a.id).unwrap_err();
        assert_eq!(
            err,
            TreeError::CorruptHierarchy {
                start: a.id,
                limit: 2
            }
        );
    }
}
