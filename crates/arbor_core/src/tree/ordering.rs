//! Sibling ordering engine.
//!
//! # Responsibility
//! - Read sibling groups in display order with a stable tie-break.
//! - Renumber sibling groups to the dense range `0..n`.
//!
//! # Invariants
//! - Renumbering an already dense group changes nothing.
//! - A group is renumbered once per structural operation, never per
//!   pointer event.

use crate::model::node::{Container, ContainerId, Leaf, LeafId};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Record placed inside a sibling group.
pub trait Sequenced {
    type Id: Copy + Eq + Hash + Ord;

    fn id(&self) -> Self::Id;
    /// Owning container of the sibling group (`None` = root).
    fn group(&self) -> Option<ContainerId>;
    fn set_group(&mut self, group: Option<ContainerId>);
    fn display_order(&self) -> u32;
    fn set_display_order(&mut self, order: u32);
}

impl Sequenced for Container {
    type Id = ContainerId;

    fn id(&self) -> ContainerId {
        self.id
    }

    fn group(&self) -> Option<ContainerId> {
        self.parent_id
    }

    fn set_group(&mut self, group: Option<ContainerId>) {
        self.parent_id = group;
    }

    fn display_order(&self) -> u32 {
        self.display_order
    }

    fn set_display_order(&mut self, order: u32) {
        self.display_order = order;
    }
}

impl Sequenced for Leaf {
    type Id = LeafId;

    fn id(&self) -> LeafId {
        self.id
    }

    fn group(&self) -> Option<ContainerId> {
        self.container_id
    }

    fn set_group(&mut self, group: Option<ContainerId>) {
        self.container_id = group;
    }

    fn display_order(&self) -> u32 {
        self.display_order
    }

    fn set_display_order(&mut self, order: u32) {
        self.display_order = order;
    }
}

/// Assigns `display_order = index` across an already ordered sibling slice.
///
/// Returns ids whose order actually changed; empty on a second call.
pub fn reindex<T: Sequenced>(siblings: &mut [T]) -> Vec<T::Id> {
    let mut changed = Vec::new();
    for (index, record) in siblings.iter_mut().enumerate() {
        let order = order_for(index);
        if record.display_order() != order {
            record.set_display_order(order);
            changed.push(record.id());
        }
    }
    changed
}

/// Ids of one sibling group sorted by `display_order`; ties keep input order.
pub fn stable_sibling_order<T: Sequenced>(records: &[T], group: Option<ContainerId>) -> Vec<T::Id> {
    let mut members: Vec<&T> = records
        .iter()
        .filter(|record| record.group() == group)
        .collect();
    members.sort_by_key(|record| record.display_order());
    members.into_iter().map(Sequenced::id).collect()
}

/// Inserts `id` at `index` clamped to `[0, len]`; returns the applied index.
pub fn insert_clamped<Id>(ids: &mut Vec<Id>, id: Id, index: usize) -> usize {
    let index = index.min(ids.len());
    ids.insert(index, id);
    index
}

/// Whether the orders form the dense permutation `0..n`.
pub fn is_dense(orders: impl IntoIterator<Item = u32>) -> bool {
    let mut orders: Vec<u32> = orders.into_iter().collect();
    orders.sort_unstable();
    orders
        .iter()
        .enumerate()
        .all(|(index, order)| *order == order_for(index))
}

/// Target membership for every sibling group touched by one operation.
///
/// Groups are loaded lazily from the current records, edited in place, and
/// applied together so each group is renumbered exactly once.
#[derive(Debug)]
pub struct SiblingPlan<Id> {
    groups: BTreeMap<Option<ContainerId>, Vec<Id>>,
}

impl<Id: Copy + Eq + Hash + Ord> SiblingPlan<Id> {
    pub fn new() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }

    /// Current members of `group` in order, minus `excluded`, loading on first
    /// access.
    pub fn group_mut<T>(
        &mut self,
        records: &[T],
        group: Option<ContainerId>,
        excluded: &[Id],
    ) -> &mut Vec<Id>
    where
        T: Sequenced<Id = Id>,
    {
        self.groups.entry(group).or_insert_with(|| {
            let mut ids = stable_sibling_order(records, group);
            ids.retain(|id| !excluded.contains(id));
            ids
        })
    }

    /// Writes group membership and dense order back into `records`.
    ///
    /// Returns ids whose group or order changed, in group order.
    pub fn apply<T>(self, records: &mut [T]) -> Vec<Id>
    where
        T: Sequenced<Id = Id>,
    {
        let positions: HashMap<Id, usize> = records
            .iter()
            .enumerate()
            .map(|(position, record)| (record.id(), position))
            .collect();

        let mut changed = Vec::new();
        for (group, ids) in self.groups {
            for (index, id) in ids.into_iter().enumerate() {
                let Some(&position) = positions.get(&id) else {
                    continue;
                };
                let record = &mut records[position];
                let order = order_for(index);
                if record.group() != group || record.display_order() != order {
                    record.set_group(group);
                    record.set_display_order(order);
                    changed.push(id);
                }
            }
        }
        changed
    }
}

impl<Id: Copy + Eq + Hash + Ord> Default for SiblingPlan<Id> {
    fn default() -> Self {
        Self::new()
    }
}

fn order_for(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}
