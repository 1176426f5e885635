//! In-process hierarchy repository.
//!
//! # Responsibility
//! - Hold the flat collection for UI sessions backed by per-record remote
//!   calls, and for tests.
//!
//! # Invariants
//! - Writes are applied one at a time; there is no atomic batch, so the
//!   service reports partial progress on failure.

use super::hierarchy_repo::{HierarchyRepository, HierarchyWrite, RepoError, RepoResult};
use crate::model::node::{Container, ContainerId, Leaf, NodeRef};
use crate::tree::Hierarchy;
use std::cell::RefCell;

/// `RefCell`-backed repository over a [`Hierarchy`].
#[derive(Debug, Default)]
pub struct MemoryHierarchyRepository {
    state: RefCell<Hierarchy>,
}

impl MemoryHierarchyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing flat collection.
    pub fn with_hierarchy(hierarchy: Hierarchy) -> Self {
        Self {
            state: RefCell::new(hierarchy),
        }
    }

    /// Copy of the stored collection.
    pub fn snapshot(&self) -> Hierarchy {
        self.state.borrow().clone()
    }
}

impl HierarchyRepository for MemoryHierarchyRepository {
    fn list_containers(&self) -> RepoResult<Vec<Container>> {
        Ok(self.state.borrow().containers.clone())
    }

    fn list_leaves(&self) -> RepoResult<Vec<Leaf>> {
        Ok(self.state.borrow().leaves.clone())
    }

    fn insert_container(&self, container: &Container) -> RepoResult<()> {
        let mut state = self.state.borrow_mut();
        if state.container(container.id).is_some() {
            return Err(RepoError::InvalidData(format!(
                "duplicate container id {}",
                container.id
            )));
        }
        state.containers.push(container.clone());
        Ok(())
    }

    fn insert_leaf(&self, leaf: &Leaf) -> RepoResult<()> {
        let mut state = self.state.borrow_mut();
        if state.leaf(leaf.id).is_some() {
            return Err(RepoError::InvalidData(format!("duplicate leaf id {}", leaf.id)));
        }
        state.leaves.push(leaf.clone());
        Ok(())
    }

    fn update_container_details(
        &self,
        id: ContainerId,
        name: &str,
        description: Option<&str>,
    ) -> RepoResult<()> {
        let mut state = self.state.borrow_mut();
        let container = state
            .container_mut(id)
            .ok_or(RepoError::NotFound(NodeRef::Container(id)))?;
        container.name = name.to_string();
        container.description = description.map(str::to_string);
        Ok(())
    }

    fn apply_write(&self, write: &HierarchyWrite) -> RepoResult<()> {
        let mut state = self.state.borrow_mut();
        match write {
            HierarchyWrite::PlaceContainer {
                id,
                parent_id,
                display_order,
            } => {
                let container = state
                    .container_mut(*id)
                    .ok_or(RepoError::NotFound(NodeRef::Container(*id)))?;
                container.parent_id = *parent_id;
                container.display_order = *display_order;
            }
            HierarchyWrite::PlaceLeaf {
                id,
                container_id,
                display_order,
            } => {
                let leaf = state
                    .leaves
                    .iter_mut()
                    .find(|leaf| leaf.id == *id)
                    .ok_or(RepoError::NotFound(NodeRef::Leaf(*id)))?;
                leaf.container_id = *container_id;
                leaf.display_order = *display_order;
            }
            HierarchyWrite::DeleteContainer(id) => {
                // Same restriction the SQLite foreign keys enforce.
                let referenced = state
                    .containers
                    .iter()
                    .any(|container| container.parent_id == Some(*id))
                    || state.leaves.iter().any(|leaf| leaf.container_id == Some(*id));
                if referenced {
                    return Err(RepoError::InvalidData(format!(
                        "container {id} is still referenced by children or leaves"
                    )));
                }
                state.containers.retain(|container| container.id != *id);
            }
        }
        Ok(())
    }
}
