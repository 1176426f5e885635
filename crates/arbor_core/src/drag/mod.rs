//! Drag-and-drop interaction for hierarchy views.
//!
//! The controller turns pointer events into at most one [`controller::MoveIntent`]
//! per drag; `HierarchyService::dispatch` executes it.

pub mod controller;
pub mod state;
