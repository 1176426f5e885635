//! Hierarchy engine for container/leaf trees.
//! This crate owns the structural invariants: acyclic parents, dense sibling
//! order, leaf rescue on delete, and the two-level depth rule.

pub mod config;
pub mod db;
pub mod drag;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod tree;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use drag::controller::{DragController, DragPayload, DragPhase, MoveIntent};
pub use drag::state::{ExpansionState, SelectionState};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::node::{
    Container, ContainerId, ContainerKind, DepthPolicy, Leaf, LeafId, LeafKind, NodeRef,
};
pub use repo::hierarchy_repo::{
    HierarchyRepository, HierarchyWrite, RepoError, RepoResult, SqliteHierarchyRepository,
};
pub use repo::memory_repo::MemoryHierarchyRepository;
pub use service::deletion::{ContainerDeletion, DeleteOptions, RescueTarget};
pub use service::hierarchy_service::{HierarchyService, MoveOutcome, NewContainer, ServiceError};
pub use service::move_coordinator::{BulkLeafMove, ContainerMove, LeafMove};
pub use service::persist::{PartialFailure, PlannedWrites};
pub use tree::builder::{build_tree, visible_rows, TreeNode, VisibleRow};
pub use tree::invariants::InvariantViolation;
pub use tree::{Hierarchy, TreeError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
