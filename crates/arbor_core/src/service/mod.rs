//! Hierarchy use-case services.
//!
//! # Responsibility
//! - Plan structural operations over a loaded hierarchy (moves, deletion).
//! - Persist the planned writes and expose one facade to the UI layer.

pub mod deletion;
pub mod hierarchy_service;
pub mod move_coordinator;
pub mod persist;
