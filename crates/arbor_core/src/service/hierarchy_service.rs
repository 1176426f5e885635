//! Hierarchy use-case service.
//!
//! # Responsibility
//! - Load the flat collection, run one structural operation on it, and
//!   persist the resulting writes.
//! - Provide create, edit, list, and audit operations for the UI layer.
//!
//! # Invariants
//! - Validation errors are returned before any write is issued.
//! - Only one mutating operation runs at a time per service; a re-entrant
//!   call gets `ServiceError::Busy`.
//! - A failed non-atomic write sequence is reported as
//!   `ServiceError::PartialFailure`, never swallowed.

use super::deletion::{self, ContainerDeletion, DeleteOptions};
use super::move_coordinator::{self, BulkLeafMove, ContainerMove, LeafMove};
use super::persist::{apply_writes, PartialFailure, PlannedWrites};
use crate::config::{CoreConfig, DEFAULT_MAX_BULK_MOVE};
use crate::drag::controller::MoveIntent;
use crate::model::node::{
    Container, ContainerId, ContainerKind, DepthPolicy, Leaf, LeafId, LeafKind,
};
use crate::repo::hierarchy_repo::{HierarchyRepository, HierarchyWrite, RepoError};
use crate::tree::breadcrumb::path_to;
use crate::tree::builder::{build_tree, TreeNode};
use crate::tree::invariants::{check_invariants, InvariantViolation};
use crate::tree::{Hierarchy, TreeError};
use log::{error, info, warn};
use std::cell::Cell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from hierarchy service operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Container name is blank after trim.
    InvalidName,
    /// Bulk move exceeds the configured limit.
    InvalidBatch { requested: usize, max: usize },
    /// Another mutating operation is still in flight.
    Busy,
    /// Structural validation failed; nothing was written.
    Tree(TreeError),
    /// Load failed, or an atomic batch failed and rolled back.
    Repo(RepoError),
    /// Some writes committed before one failed.
    PartialFailure(PartialFailure),
}

impl ServiceError {
    fn kind(&self) -> &'static str {
        match self {
            Self::InvalidName => "invalid_name",
            Self::InvalidBatch { .. } => "invalid_batch",
            Self::Busy => "busy",
            Self::Tree(TreeError::NotFound(_)) => "not_found",
            Self::Tree(TreeError::Cycle { .. }) => "cycle",
            Self::Tree(TreeError::CorruptHierarchy { .. }) => "corrupt_hierarchy",
            Self::Tree(TreeError::DepthLimitExceeded { .. }) => "depth_limit",
            Self::Repo(_) => "repo",
            Self::PartialFailure(_) => "partial_failure",
        }
    }

    /// Whether the failure was a rejection with nothing written.
    fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidName
                | Self::InvalidBatch { .. }
                | Self::Busy
                | Self::Tree(TreeError::NotFound(_))
                | Self::Tree(TreeError::Cycle { .. })
                | Self::Tree(TreeError::DepthLimitExceeded { .. })
        )
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "container name must not be blank"),
            Self::InvalidBatch { requested, max } => {
                write!(f, "bulk move of {requested} leaves exceeds limit {max}")
            }
            Self::Busy => write!(f, "another hierarchy operation is in progress"),
            Self::Tree(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::PartialFailure(failure) => write!(f, "{failure}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::PartialFailure(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<TreeError> for ServiceError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(node) => Self::Tree(TreeError::NotFound(node)),
            other => Self::Repo(other),
        }
    }
}

impl From<PartialFailure> for ServiceError {
    fn from(value: PartialFailure) -> Self {
        Self::PartialFailure(value)
    }
}

/// Input for [`HierarchyService::create_container`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContainer {
    pub name: String,
    pub description: Option<String>,
    pub kind: ContainerKind,
    /// Defaults to the kind's policy.
    pub depth_policy: Option<DepthPolicy>,
}

impl NewContainer {
    pub fn new(kind: ContainerKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind,
            depth_policy: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_depth_policy(mut self, depth_policy: DepthPolicy) -> Self {
        self.depth_policy = Some(depth_policy);
        self
    }
}

/// Result of executing a [`MoveIntent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Leaf(LeafMove),
    LeavesBulk(BulkLeafMove),
    Container(ContainerMove),
}

/// Hierarchy service facade.
pub struct HierarchyService<R: HierarchyRepository> {
    repo: R,
    max_bulk_move: usize,
    in_flight: Cell<bool>,
}

struct OperationGuard<'a> {
    in_flight: &'a Cell<bool>,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.set(false);
    }
}

impl<R: HierarchyRepository> HierarchyService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            max_bulk_move: DEFAULT_MAX_BULK_MOVE,
            in_flight: Cell::new(false),
        }
    }

    pub fn with_config(repo: R, config: &CoreConfig) -> Self {
        Self {
            max_bulk_move: config.max_bulk_move,
            ..Self::new(repo)
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Current flat collection.
    pub fn snapshot(&self) -> Result<Hierarchy, ServiceError> {
        Ok(self.repo.load_hierarchy()?)
    }

    /// Nested container tree in sibling order.
    pub fn build_tree(&self) -> Result<Vec<TreeNode>, ServiceError> {
        Ok(build_tree(&self.repo.list_containers()?))
    }

    /// Breadcrumb from the root-level ancestor down to `container_id`.
    pub fn path_to(&self, container_id: ContainerId) -> Result<Vec<Container>, ServiceError> {
        Ok(path_to(&self.snapshot()?, container_id)?)
    }

    /// Ordered child containers of `parent_id` (root level when `None`).
    pub fn list_children(
        &self,
        parent_id: Option<ContainerId>,
    ) -> Result<Vec<Container>, ServiceError> {
        let hierarchy = self.snapshot()?;
        hierarchy.require_parent(parent_id)?;
        Ok(hierarchy.children(parent_id).into_iter().cloned().collect())
    }

    /// Ordered leaves of `container_id` (unassigned leaves when `None`).
    pub fn list_leaves(&self, container_id: Option<ContainerId>) -> Result<Vec<Leaf>, ServiceError> {
        let hierarchy = self.snapshot()?;
        hierarchy.require_parent(container_id)?;
        Ok(hierarchy
            .leaves_in(container_id)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Every broken structural invariant in stored data.
    pub fn check_invariants(&self) -> Result<Vec<InvariantViolation>, ServiceError> {
        let violations = check_invariants(&self.snapshot()?);
        if !violations.is_empty() {
            warn!(
                "event=check_invariants module=service status=error violations={}",
                violations.len()
            );
        }
        Ok(violations)
    }

    /// Appends a new container as the last sibling under `parent_id`.
    pub fn create_container(
        &self,
        parent_id: Option<ContainerId>,
        new: NewContainer,
    ) -> Result<Container, ServiceError> {
        self.run("create_container", || {
            let name = normalize_name(&new.name)?;
            let hierarchy = self.repo.load_hierarchy()?;
            hierarchy.require_parent(parent_id)?;

            let mut container = Container::new(new.kind, name);
            container.description = normalize_description(new.description.as_deref());
            container.depth_policy = new
                .depth_policy
                .unwrap_or_else(|| new.kind.default_depth_policy());
            container.parent_id = parent_id;
            if let Some(parent_id) = parent_id {
                let parent = hierarchy.require_container(parent_id)?;
                if container.depth_policy == DepthPolicy::TwoLevel && parent.parent_id.is_some() {
                    return Err(TreeError::DepthLimitExceeded {
                        container_id: container.id,
                        parent_id,
                    }
                    .into());
                }
            }
            container.display_order = next_order(hierarchy.child_container_ids(parent_id).len());

            self.repo.insert_container(&container)?;
            Ok((container, 1))
        })
    }

    /// Renames and re-describes one container without moving it.
    pub fn edit_container(
        &self,
        container_id: ContainerId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Container, ServiceError> {
        self.run("edit_container", || {
            let name = normalize_name(name)?;
            let description = normalize_description(description);
            let mut container = self
                .repo
                .load_hierarchy()?
                .require_container(container_id)?
                .clone();

            self.repo
                .update_container_details(container_id, &name, description.as_deref())?;
            container.name = name;
            container.description = description;
            Ok((container, 1))
        })
    }

    /// Registers a leaf as the last sibling of `container_id`.
    pub fn create_leaf(
        &self,
        container_id: Option<ContainerId>,
        kind: LeafKind,
        payload: Option<String>,
    ) -> Result<Leaf, ServiceError> {
        self.run("create_leaf", || {
            let hierarchy = self.repo.load_hierarchy()?;
            hierarchy.require_parent(container_id)?;

            let mut leaf = Leaf::new(kind);
            leaf.container_id = container_id;
            leaf.payload = payload;
            leaf.display_order = next_order(hierarchy.leaf_ids_in(container_id).len());

            self.repo.insert_leaf(&leaf)?;
            Ok((leaf, 1))
        })
    }

    /// Moves one leaf to `destination_index` (clamped) inside `destination`.
    pub fn move_leaf(
        &self,
        leaf_id: LeafId,
        destination: Option<ContainerId>,
        destination_index: usize,
    ) -> Result<LeafMove, ServiceError> {
        self.run_structural("move_leaf", |hierarchy| {
            move_coordinator::move_leaf(hierarchy, leaf_id, destination, destination_index)
        })
    }

    /// Appends `leaf_ids` to `destination` in the given order.
    pub fn move_leaves_bulk(
        &self,
        leaf_ids: &[LeafId],
        destination: Option<ContainerId>,
    ) -> Result<BulkLeafMove, ServiceError> {
        if leaf_ids.len() > self.max_bulk_move {
            let err = ServiceError::InvalidBatch {
                requested: leaf_ids.len(),
                max: self.max_bulk_move,
            };
            log_failure("move_leaves_bulk", &err, Instant::now());
            return Err(err);
        }
        self.run_structural("move_leaves_bulk", |hierarchy| {
            move_coordinator::move_leaves_bulk(hierarchy, leaf_ids, destination)
        })
    }

    /// Moves one container under `destination` at `destination_index`.
    pub fn move_container(
        &self,
        container_id: ContainerId,
        destination: Option<ContainerId>,
        destination_index: usize,
    ) -> Result<ContainerMove, ServiceError> {
        self.run_structural("move_container", |hierarchy| {
            move_coordinator::move_container(
                hierarchy,
                container_id,
                destination,
                destination_index,
            )
        })
    }

    /// Deletes a container subtree and rescues every leaf inside it.
    ///
    /// Safe to call again after a partial failure: rescued leaves and removed
    /// containers are simply not found in the subtree anymore.
    pub fn delete_container(
        &self,
        container_id: ContainerId,
        options: DeleteOptions,
    ) -> Result<ContainerDeletion, ServiceError> {
        self.run_structural("delete_container", |hierarchy| {
            deletion::delete_container(hierarchy, container_id, options)
        })
    }

    /// Executes a move emitted by the drag controller.
    pub fn dispatch(&self, intent: MoveIntent) -> Result<MoveOutcome, ServiceError> {
        match intent {
            MoveIntent::Leaf {
                leaf_id,
                destination,
                index,
            } => self.move_leaf(leaf_id, destination, index).map(MoveOutcome::Leaf),
            MoveIntent::LeavesBulk {
                leaf_ids,
                destination,
            } => self
                .move_leaves_bulk(&leaf_ids, destination)
                .map(MoveOutcome::LeavesBulk),
            MoveIntent::Container {
                container_id,
                destination,
                index,
            } => self
                .move_container(container_id, destination, index)
                .map(MoveOutcome::Container),
        }
    }

    /// Applies only the pending writes of an earlier partial failure.
    pub fn resume(&self, failure: PartialFailure) -> Result<(), ServiceError> {
        let pending = failure.pending;
        self.run("resume", || {
            let count = pending.len();
            apply_writes(&self.repo, pending)?;
            Ok(((), count))
        })
    }

    fn run_structural<T, F>(&self, event: &'static str, plan: F) -> Result<T, ServiceError>
    where
        T: PlannedWrites,
        F: FnOnce(&mut Hierarchy) -> Result<T, TreeError>,
    {
        self.run(event, || {
            let mut hierarchy = self.repo.load_hierarchy()?;
            let outcome = plan(&mut hierarchy)?;
            let writes: Vec<HierarchyWrite> = outcome.writes();
            let count = writes.len();
            apply_writes(&self.repo, writes)?;
            Ok((outcome, count))
        })
    }

    /// Runs one mutating operation under the in-flight guard and logs it.
    fn run<T, F>(&self, event: &'static str, operation: F) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Result<(T, usize), ServiceError>,
    {
        let started = Instant::now();
        let result = self.begin().and_then(|_guard| operation());
        match result {
            Ok((value, writes)) => {
                info!(
                    "event={event} module=service status=ok writes={writes} duration_ms={}",
                    started.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                log_failure(event, &err, started);
                Err(err)
            }
        }
    }

    fn begin(&self) -> Result<OperationGuard<'_>, ServiceError> {
        if self.in_flight.replace(true) {
            return Err(ServiceError::Busy);
        }
        Ok(OperationGuard {
            in_flight: &self.in_flight,
        })
    }
}

fn log_failure(event: &'static str, err: &ServiceError, started: Instant) {
    let duration_ms = started.elapsed().as_millis();
    if err.is_rejection() {
        warn!(
            "event={event} module=service status=rejected reason={} duration_ms={duration_ms}",
            err.kind()
        );
    } else {
        error!(
            "event={event} module=service status=error reason={} duration_ms={duration_ms}",
            err.kind()
        );
    }
}

fn normalize_name(name: &str) -> Result<String, ServiceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidName);
    }
    Ok(trimmed.to_string())
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn next_order(sibling_count: usize) -> u32 {
    u32::try_from(sibling_count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{HierarchyService, NewContainer, ServiceError};
    use crate::config::CoreConfig;
    use crate::model::node::{ContainerKind, DepthPolicy, LeafKind, NodeRef};
    use crate::repo::memory_repo::MemoryHierarchyRepository;
    use crate::tree::TreeError;

    fn service() -> HierarchyService<MemoryHierarchyRepository> {
        HierarchyService::new(MemoryHierarchyRepository::new())
    }

    #[test]
    fn create_appends_and_trims() {
        let service = service();
        let first = service
            .create_container(None, NewContainer::new(ContainerKind::Folder, "  Inbox  "))
            .unwrap();
        let second = service
            .create_container(
                None,
                NewContainer::new(ContainerKind::Folder, "Archive").with_description("   "),
            )
            .unwrap();

        assert_eq!(first.name, "Inbox");
        assert_eq!(first.display_order, 0);
        assert_eq!(second.display_order, 1);
        assert_eq!(second.description, None);
    }

    #[test]
    fn blank_name_is_rejected() {
        let service = service();
        assert!(matches!(
            service.create_container(None, NewContainer::new(ContainerKind::Folder, " ")),
            Err(ServiceError::InvalidName)
        ));
        let folder = service
            .create_container(None, NewContainer::new(ContainerKind::Folder, "f"))
            .unwrap();
        assert!(matches!(
            service.edit_container(folder.id, "", None),
            Err(ServiceError::InvalidName)
        ));
    }

    #[test]
    fn edit_changes_details_only() {
        let service = service();
        let folder = service
            .create_container(None, NewContainer::new(ContainerKind::Folder, "old"))
            .unwrap();
        let edited = service
            .edit_container(folder.id, "new", Some("notes"))
            .unwrap();
        assert_eq!(edited.name, "new");
        assert_eq!(edited.description.as_deref(), Some("notes"));
        assert_eq!(edited.display_order, folder.display_order);
        assert_eq!(service.list_children(None).unwrap(), vec![edited]);
    }

    #[test]
    fn two_level_create_under_nested_parent_is_rejected() {
        let service = service();
        let top = service
            .create_container(None, NewContainer::new(ContainerKind::MenuGroup, "top"))
            .unwrap();
        let child = service
            .create_container(Some(top.id), NewContainer::new(ContainerKind::MenuGroup, "child"))
            .unwrap();

        assert!(matches!(
            service.create_container(
                Some(child.id),
                NewContainer::new(ContainerKind::MenuGroup, "deep")
            ),
            Err(ServiceError::Tree(TreeError::DepthLimitExceeded { .. }))
        ));
        let unbounded = service
            .create_container(
                Some(child.id),
                NewContainer::new(ContainerKind::MenuGroup, "deep")
                    .with_depth_policy(DepthPolicy::Unbounded),
            )
            .unwrap();
        assert_eq!(unbounded.parent_id, Some(child.id));
    }

    #[test]
    fn create_leaf_requires_existing_container() {
        let service = service();
        let ghost = uuid::Uuid::new_v4();
        assert!(matches!(
            service.create_leaf(Some(ghost), LeafKind::ContentItem, None),
            Err(ServiceError::Tree(TreeError::NotFound(NodeRef::Container(id)))) if id == ghost
        ));
        let leaf = service
            .create_leaf(None, LeafKind::ContentItem, Some("{}".to_string()))
            .unwrap();
        assert_eq!(service.list_leaves(None).unwrap(), vec![leaf]);
    }

    #[test]
    fn reentrant_operation_is_busy() {
        let service = service();
        let guard = service.begin().unwrap();
        assert!(matches!(
            service.create_leaf(None, LeafKind::MenuEntry, None),
            Err(ServiceError::Busy)
        ));
        drop(guard);
        assert!(service.create_leaf(None, LeafKind::MenuEntry, None).is_ok());
    }

    #[test]
    fn bulk_limit_comes_from_config() {
        let config = CoreConfig {
            max_bulk_move: 1,
            ..CoreConfig::default()
        };
        let service = HierarchyService::with_config(MemoryHierarchyRepository::new(), &config);
        let a = service.create_leaf(None, LeafKind::ContentItem, None).unwrap();
        let b = service.create_leaf(None, LeafKind::ContentItem, None).unwrap();

        assert!(matches!(
            service.move_leaves_bulk(&[a.id, b.id], None),
            Err(ServiceError::InvalidBatch {
                requested: 2,
                max: 1
            })
        ));
    }
}
