//! Persistence of planned structural writes.
//!
//! # Responsibility
//! - Apply one operation's writes as a single batch when the repository can.
//! - Otherwise apply them in order and report exactly what committed.
//!
//! # Invariants
//! - A failed batch commits nothing.
//! - A failed sequence stops at the first error; `committed` and `pending`
//!   together are the original write list in order.

use super::hierarchy_service::ServiceError;
use crate::model::node::NodeRef;
use crate::repo::hierarchy_repo::{HierarchyRepository, HierarchyWrite, RepoError};
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Structural result that knows the writes needed to persist it.
pub trait PlannedWrites {
    fn writes(&self) -> Vec<HierarchyWrite>;
}

/// A multi-step persistence sequence that failed after partial progress.
#[derive(Debug)]
pub struct PartialFailure {
    /// Writes that reached storage, in order.
    pub committed: Vec<HierarchyWrite>,
    /// The failing write followed by every write not attempted.
    pub pending: Vec<HierarchyWrite>,
    /// Error returned for the first pending write.
    pub source: RepoError,
}

impl PartialFailure {
    /// Records whose writes committed.
    pub fn committed_ids(&self) -> Vec<NodeRef> {
        self.committed.iter().map(HierarchyWrite::target).collect()
    }

    /// Records whose writes still need to be applied.
    pub fn pending_ids(&self) -> Vec<NodeRef> {
        self.pending.iter().map(HierarchyWrite::target).collect()
    }
}

impl Display for PartialFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "partial failure after {} of {} writes: {}",
            self.committed.len(),
            self.committed.len() + self.pending.len(),
            self.source
        )
    }
}

impl Error for PartialFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Applies `writes`, atomically when supported.
pub(crate) fn apply_writes<R>(repo: &R, writes: Vec<HierarchyWrite>) -> Result<(), ServiceError>
where
    R: HierarchyRepository + ?Sized,
{
    if writes.is_empty() {
        return Ok(());
    }

    if repo.supports_batch() {
        return repo.apply_batch(&writes).map_err(ServiceError::Repo);
    }

    let total = writes.len();
    let mut committed = Vec::with_capacity(total);
    let mut remaining = writes.into_iter();
    while let Some(write) = remaining.next() {
        if let Err(source) = repo.apply_write(&write) {
            let mut pending = vec![write];
            pending.extend(remaining);
            warn!(
                "event=persist_writes module=service status=partial committed={} pending={} total={}",
                committed.len(),
                pending.len(),
                total
            );
            return Err(ServiceError::PartialFailure(PartialFailure {
                committed,
                pending,
                source,
            }));
        }
        committed.push(write);
    }
    Ok(())
}
