//! Nested tree construction from flat container records.
//!
//! # Responsibility
//! - Turn the flat container list into root nodes with ordered children.
//! - Flatten a built tree into renderable rows given expansion state.
//!
//! # Invariants
//! - Pure: rebuilt on every read, never cached.
//! - Children are sorted by `display_order`; ties keep input order.
//! - Traversals use explicit stacks, so depth is bounded only by memory.

use crate::drag::state::ExpansionState;
use crate::model::node::{Container, ContainerId};
use std::collections::{HashMap, HashSet};

/// One container with its ordered child containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub container: Container,
    /// 0 for root-level nodes.
    pub depth: usize,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn id(&self) -> ContainerId {
        self.container.id
    }

    /// Number of nodes in this subtree, including itself.
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// Builds the display tree.
///
/// Containers whose parent is missing are surfaced as roots so a transient
/// dangling reference stays visible. Containers caught in a stored cycle are
/// unreachable from any root and are left out.
pub fn build_tree(containers: &[Container]) -> Vec<TreeNode> {
    let known: HashSet<ContainerId> = containers.iter().map(|container| container.id).collect();

    let mut groups: HashMap<Option<ContainerId>, Vec<usize>> = HashMap::new();
    for (index, container) in containers.iter().enumerate() {
        let parent = container
            .parent_id
            .filter(|parent_id| known.contains(parent_id) && *parent_id != container.id);
        groups.entry(parent).or_default().push(index);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|index| containers[*index].display_order);
    }

    let roots = groups.get(&None).cloned().unwrap_or_default();

    // Pre-order walk recording depth; children are pushed reversed so they
    // pop in display order.
    let mut visited = HashSet::new();
    let mut preorder = Vec::with_capacity(containers.len());
    let mut stack: Vec<(usize, usize)> = roots.iter().rev().map(|index| (*index, 0)).collect();
    while let Some((index, depth)) = stack.pop() {
        if !visited.insert(index) {
            continue;
        }
        preorder.push((index, depth));
        if let Some(children) = groups.get(&Some(containers[index].id)) {
            stack.extend(children.iter().rev().map(|child| (*child, depth + 1)));
        }
    }

    // Reverse pre-order guarantees every child is built before its parent.
    let mut built: HashMap<usize, TreeNode> = HashMap::with_capacity(preorder.len());
    for (index, depth) in preorder.into_iter().rev() {
        let container = &containers[index];
        let children = groups
            .get(&Some(container.id))
            .map(|children| {
                children
                    .iter()
                    .filter_map(|child| built.remove(child))
                    .collect()
            })
            .unwrap_or_default();
        built.insert(
            index,
            TreeNode {
                container: container.clone(),
                depth,
                children,
            },
        );
    }

    roots
        .iter()
        .filter_map(|index| built.remove(index))
        .collect()
}

/// One rendered line of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleRow {
    pub id: ContainerId,
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
}

/// Rows a UI shows: every root, plus children of expanded nodes.
pub fn visible_rows(roots: &[TreeNode], expansion: &ExpansionState) -> Vec<VisibleRow> {
    let mut rows = Vec::new();
    let mut stack: Vec<&TreeNode> = roots.iter().rev().collect();
    while let Some(node) = stack.pop() {
        let expanded = expansion.is_expanded(node.id());
        rows.push(VisibleRow {
            id: node.id(),
            depth: node.depth,
            has_children: !node.children.is_empty(),
            expanded,
        });
        if expanded {
            stack.extend(node.children.iter().rev());
        }
    }
    rows
}
