// src/deps/object_deps.rs

//! Per-object and per-task dependency records.

use std::collections::BTreeSet;

use crate::types::{ObjectId, OwnerAddress, TaskId, WorkerId};

/// Bookkeeping for one required object, grouped under its creating task.
///
/// Membership of an object in the required-objects index is itself the
/// reference count: a record with no dependents must be deleted immediately.
#[derive(Debug, Clone)]
pub struct ObjectDependencies {
    /// Owner address captured at the first subscription that referenced the
    /// object. Later subscriptions may carry stale or absent addresses and
    /// must not overwrite it.
    pub owner: OwnerAddress,
    /// Subscribed tasks whose fetch-dependency list includes this object.
    pub dependent_tasks: BTreeSet<TaskId>,
    /// Subscribed workers waiting for this object to appear.
    pub dependent_workers: BTreeSet<WorkerId>,
}

impl ObjectDependencies {
    pub fn new(owner: OwnerAddress) -> Self {
        Self {
            owner,
            dependent_tasks: BTreeSet::new(),
            dependent_workers: BTreeSet::new(),
        }
    }

    /// True when no task or worker depends on the object any more.
    pub fn is_empty(&self) -> bool {
        self.dependent_tasks.is_empty() && self.dependent_workers.is_empty()
    }
}

/// Dependency state of one subscribed task.
#[derive(Debug, Clone, Default)]
pub struct TaskDependencies {
    /// Objects the task declared as fetch dependencies.
    pub get_dependencies: BTreeSet<ObjectId>,
    /// How many of `get_dependencies` are not in the local object registry.
    pub num_missing_get_dependencies: usize,
}
