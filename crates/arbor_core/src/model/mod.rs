//! Hierarchy record model shared by folder trees and navigation menus.
//!
//! # Responsibility
//! - Define the flat container/leaf records the engine reads and writes.
//! - Keep kind tags as closed enums; strings only appear at storage edges.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Only `parent_id`/`container_id` and `display_order` are owned by core;
//!   all other leaf payload is opaque.

pub mod node;
