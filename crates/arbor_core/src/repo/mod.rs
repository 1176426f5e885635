//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the persistence contract the hierarchy service writes through.
//! - Isolate SQLite query details from structural orchestration.
//!
//! # Invariants
//! - Writes are absolute assignments, so re-applying one is harmless.
//! - Deleting an already-missing container is a no-op, not an error.

pub mod hierarchy_repo;
pub mod memory_repo;
