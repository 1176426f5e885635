//! UI-owned view state consumed by the drag controller and row flattening.
//!
//! Neither type touches the hierarchy; both are plain values the embedding UI
//! keeps between events.

use crate::model::node::{ContainerId, LeafId, NodeRef};
use std::collections::HashMap;

/// Multi-select set in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    items: Vec<NodeRef>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the selection with a single node.
    pub fn select_only(&mut self, node: NodeRef) {
        self.items.clear();
        self.items.push(node);
    }

    /// Adds `node` at the end unless already selected.
    pub fn add(&mut self, node: NodeRef) {
        if !self.contains(node) {
            self.items.push(node);
        }
    }

    /// Adds or removes `node`. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, node: NodeRef) -> bool {
        if let Some(position) = self.items.iter().position(|item| *item == node) {
            self.items.remove(position);
            false
        } else {
            self.items.push(node);
            true
        }
    }

    pub fn contains(&self, node: NodeRef) -> bool {
        self.items.contains(&node)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.items.iter().copied()
    }

    /// Selected leaves in selection order.
    pub fn leaf_ids(&self) -> Vec<LeafId> {
        self.items.iter().filter_map(|item| item.leaf_id()).collect()
    }
}

/// Expanded/collapsed display flag per container. Unknown containers are
/// collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    flags: HashMap<ContainerId, bool>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, container_id: ContainerId) -> bool {
        self.flags.get(&container_id).copied().unwrap_or(false)
    }

    pub fn set_expanded(&mut self, container_id: ContainerId, expanded: bool) {
        self.flags.insert(container_id, expanded);
    }

    pub fn expand(&mut self, container_id: ContainerId) {
        self.set_expanded(container_id, true);
    }

    pub fn collapse(&mut self, container_id: ContainerId) {
        self.set_expanded(container_id, false);
    }

    /// Flips the flag and returns the new value.
    pub fn toggle(&mut self, container_id: ContainerId) -> bool {
        let expanded = !self.is_expanded(container_id);
        self.set_expanded(container_id, expanded);
        expanded
    }

    /// Drops flags for containers that no longer exist.
    pub fn retain_existing(&mut self, mut exists: impl FnMut(ContainerId) -> bool) {
        self.flags.retain(|id, _| exists(*id));
    }
}
