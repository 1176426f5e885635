//! Drag-and-drop interaction state machine.
//!
//! # State machine
//!
//! `Idle -> Dragging -> Hovering -> AutoExpanded -> (drop | cancel) -> Idle`
//!
//! - [`DragController::on_drag_start`] captures the moving set: the dragged
//!   node alone, or every selected leaf when a leaf inside a multi-selection is
//!   dragged.
//! - Hovering a container arms one auto-expand timer. The controller owns no
//!   clock; the caller passes `Instant`s and calls [`DragController::poll`]
//!   on its tick.
//! - A drop emits exactly one [`MoveIntent`]; a cancel emits none.
//!
//! # Invariants
//!
//! 1. At most one auto-expand timer is pending.
//! 2. Hovering the same container again does not restart its timer; entering
//!    a different one does.
//! 3. Leaving the hovered container, dropping, or cancelling disarms the timer
//!    without expanding.
//! 4. The controller never touches the hierarchy; expansion only flips a
//!    display flag in [`ExpansionState`].

use super::state::{ExpansionState, SelectionState};
use crate::config::CoreConfig;
use crate::model::node::{ContainerId, LeafId, NodeRef};
use log::debug;
use std::time::{Duration, Instant};

/// Hover time before a collapsed container auto-expands (default: 800ms).
pub const AUTO_EXPAND_DELAY: Duration = Duration::from_millis(800);

/// Nodes captured at drag start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragPayload {
    Leaf(LeafId),
    Leaves(Vec<LeafId>),
    Container(ContainerId),
}

/// Observable controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Dragging,
    Hovering {
        container_id: ContainerId,
        since: Instant,
    },
    AutoExpanded {
        container_id: ContainerId,
    },
}

/// Structural move requested by a completed drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveIntent {
    Leaf {
        leaf_id: LeafId,
        destination: Option<ContainerId>,
        index: usize,
    },
    LeavesBulk {
        leaf_ids: Vec<LeafId>,
        destination: Option<ContainerId>,
    },
    Container {
        container_id: ContainerId,
        destination: Option<ContainerId>,
        index: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Hover {
    container_id: ContainerId,
    since: Instant,
    expanded: bool,
}

/// Drag interaction controller for one tree view.
#[derive(Debug, Clone)]
pub struct DragController {
    auto_expand_delay: Duration,
    payload: Option<DragPayload>,
    hover: Option<Hover>,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new(AUTO_EXPAND_DELAY)
    }
}

impl DragController {
    #[must_use]
    pub fn new(auto_expand_delay: Duration) -> Self {
        Self {
            auto_expand_delay,
            payload: None,
            hover: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.auto_expand_delay())
    }

    pub fn auto_expand_delay(&self) -> Duration {
        self.auto_expand_delay
    }

    pub fn payload(&self) -> Option<&DragPayload> {
        self.payload.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.payload.is_some()
    }

    pub fn phase(&self) -> DragPhase {
        match (&self.payload, self.hover) {
            (None, _) => DragPhase::Idle,
            (Some(_), None) => DragPhase::Dragging,
            (Some(_), Some(hover)) if hover.expanded => DragPhase::AutoExpanded {
                container_id: hover.container_id,
            },
            (Some(_), Some(hover)) => DragPhase::Hovering {
                container_id: hover.container_id,
                since: hover.since,
            },
        }
    }

    /// Starts a drag of `node`, replacing any drag in progress.
    pub fn on_drag_start(&mut self, node: NodeRef, selection: &SelectionState) -> &DragPayload {
        let payload = match node {
            NodeRef::Container(container_id) => DragPayload::Container(container_id),
            NodeRef::Leaf(leaf_id) => {
                let selected = selection.leaf_ids();
                if selected.len() > 1 && selected.contains(&leaf_id) {
                    DragPayload::Leaves(selected)
                } else {
                    DragPayload::Leaf(leaf_id)
                }
            }
        };
        debug!(
            "event=drag_start module=drag status=ok node={} count={}",
            node,
            payload_len(&payload)
        );
        self.hover = None;
        self.payload.insert(payload)
    }

    /// Pointer entered or moved over `container_id`.
    pub fn on_drag_over_container(&mut self, container_id: ContainerId, now: Instant) {
        if self.payload.is_none() {
            return;
        }
        if self
            .hover
            .is_some_and(|hover| hover.container_id == container_id)
        {
            return;
        }
        self.hover = Some(Hover {
            container_id,
            since: now,
            expanded: false,
        });
    }

    /// Pointer left `container_id`; disarms its timer.
    pub fn on_drag_leave_container(&mut self, container_id: ContainerId) {
        if self
            .hover
            .is_some_and(|hover| hover.container_id == container_id)
        {
            self.hover = None;
        }
    }

    /// Fires the pending auto-expand timer when due.
    ///
    /// Returns the container that was expanded on this call.
    pub fn poll(&mut self, now: Instant, expansion: &mut ExpansionState) -> Option<ContainerId> {
        let hover = self.hover.as_mut()?;
        if hover.expanded || now.saturating_duration_since(hover.since) < self.auto_expand_delay {
            return None;
        }
        hover.expanded = true;
        expansion.expand(hover.container_id);
        debug!(
            "event=drag_auto_expand module=drag status=ok container={}",
            hover.container_id
        );
        Some(hover.container_id)
    }

    /// Completes the drag onto `destination` at `index`.
    ///
    /// Bulk leaf drops ignore `index` and append. Returns `None` when no drag
    /// is in progress.
    pub fn on_drop(
        &mut self,
        destination: Option<ContainerId>,
        index: usize,
    ) -> Option<MoveIntent> {
        self.hover = None;
        let intent = match self.payload.take()? {
            DragPayload::Leaf(leaf_id) => MoveIntent::Leaf {
                leaf_id,
                destination,
                index,
            },
            DragPayload::Leaves(leaf_ids) => MoveIntent::LeavesBulk {
                leaf_ids,
                destination,
            },
            DragPayload::Container(container_id) => MoveIntent::Container {
                container_id,
                destination,
                index,
            },
        };
        debug!("event=drag_drop module=drag status=ok");
        Some(intent)
    }

    /// Abandons the drag with no side effects.
    pub fn on_drag_cancel(&mut self) {
        if self.payload.take().is_some() {
            debug!("event=drag_cancel module=drag status=ok");
        }
        self.hover = None;
    }
}

fn payload_len(payload: &DragPayload) -> usize {
    match payload {
        DragPayload::Leaves(ids) => ids.len(),
        DragPayload::Leaf(_) | DragPayload::Container(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::{DragController, DragPayload, DragPhase, MoveIntent};
    use crate::drag::state::{ExpansionState, SelectionState};
    use crate::model::node::NodeRef;
    use std::time::{Duration, Instant};
    use uuid::Uuid;

    #[test]
    fn timer_fires_once_after_delay() {
        let mut controller = DragController::default();
        let mut expansion = ExpansionState::new();
        let folder = Uuid::new_v4();
        let start = Instant::now();

        controller.on_drag_start(NodeRef::Leaf(Uuid::new_v4()), &SelectionState::new());
        controller.on_drag_over_container(folder, start);

        assert_eq!(
            controller.poll(start + Duration::from_millis(799), &mut expansion),
            None
        );
        assert_eq!(
            controller.poll(start + Duration::from_millis(800), &mut expansion),
            Some(folder)
        );
        assert!(expansion.is_expanded(folder));
        assert_eq!(
            controller.phase(),
            DragPhase::AutoExpanded {
                container_id: folder
            }
        );
        assert_eq!(
            controller.poll(start + Duration::from_secs(5), &mut expansion),
            None
        );
    }

    #[test]
    fn repeated_hover_keeps_original_start() {
        let mut controller = DragController::new(Duration::from_millis(100));
        let mut expansion = ExpansionState::new();
        let folder = Uuid::new_v4();
        let start = Instant::now();

        controller.on_drag_start(NodeRef::Container(Uuid::new_v4()), &SelectionState::new());
        controller.on_drag_over_container(folder, start);
        controller.on_drag_over_container(folder, start + Duration::from_millis(90));

        assert_eq!(
            controller.poll(start + Duration::from_millis(100), &mut expansion),
            Some(folder)
        );
    }

    #[test]
    fn hover_outside_drag_is_ignored() {
        let mut controller = DragController::default();
        controller.on_drag_over_container(Uuid::new_v4(), Instant::now());
        assert_eq!(controller.phase(), DragPhase::Idle);
    }

    #[test]
    fn multi_select_drag_carries_selected_leaves() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut selection = SelectionState::new();
        selection.add(NodeRef::Leaf(a));
        selection.add(NodeRef::Leaf(b));

        let mut controller = DragController::default();
        let payload = controller.on_drag_start(NodeRef::Leaf(b), &selection).clone();
        assert_eq!(payload, DragPayload::Leaves(vec![a, b]));

        let outside = Uuid::new_v4();
        let single = controller
            .on_drag_start(NodeRef::Leaf(outside), &selection)
            .clone();
        assert_eq!(single, DragPayload::Leaf(outside));
    }

    #[test]
    fn drop_emits_one_intent_and_returns_to_idle() {
        let leaf = Uuid::new_v4();
        let target = Uuid::new_v4();
        let mut controller = DragController::default();
        controller.on_drag_start(NodeRef::Leaf(leaf), &SelectionState::new());

        assert_eq!(
            controller.on_drop(Some(target), 2),
            Some(MoveIntent::Leaf {
                leaf_id: leaf,
                destination: Some(target),
                index: 2,
            })
        );
        assert_eq!(controller.phase(), DragPhase::Idle);
        assert_eq!(controller.on_drop(Some(target), 0), None);
    }
}
