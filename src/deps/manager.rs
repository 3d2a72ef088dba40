//! The task dependency manager.
//!
//! Sits between the node scheduler, the object transport and the
//! reconstruction policy, and maintains one invariant: an object is being
//! fetched iff at least one local subscriber needs it and it is neither
//! local nor about to be produced by a locally pending task.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;

use tracing::debug;

use crate::deps::object_deps::{ObjectDependencies, TaskDependencies};
use crate::metrics::DepMetrics;
use crate::remote::{ObjectTransport, ReconstructionPolicy};
use crate::types::{ObjectId, ObjectRef, OwnerAddress, Task, TaskId, WorkerId};

/// Tracks which remote objects locally queued tasks and locally blocked
/// workers are waiting on, and keeps the object transport fetching exactly
/// the objects that are genuinely needed.
///
/// It is responsible for:
/// - recording get/wait subscriptions and their reverse index, grouped by
///   the task that creates each object
/// - opening a pull (and a reconstruction listen) for an object exactly when
///   some subscriber needs it, it is not local, and no pending local task
///   will produce it
/// - closing the pull as soon as any of those conditions flips
/// - reporting which tasks become ready to run or must go back to waiting
///
/// Every operation runs to completion on the caller's thread and never calls
/// back into the collaborators re-entrantly. If the embedding environment is
/// multi-threaded, the embedder must serialize calls.
pub struct TaskDependencyManager<T, R> {
    transport: T,
    reconstruction: R,
    metrics: DepMetrics,
    /// Objects currently materialized on this node.
    local_objects: HashSet<ObjectId>,
    /// Per subscribed task: declared fetch dependencies and missing count.
    task_dependencies: HashMap<TaskId, TaskDependencies>,
    /// Per subscribed worker: remote objects its wait call is blocked on.
    worker_dependencies: HashMap<WorkerId, BTreeSet<ObjectId>>,
    /// Required objects grouped by the task that creates them. An object
    /// appears here iff some task or worker currently depends on it.
    required_tasks: HashMap<TaskId, BTreeMap<ObjectId, ObjectDependencies>>,
    /// Tasks scheduled to execute locally; their outputs need no pull.
    pending_tasks: HashSet<TaskId>,
    /// Objects with an outstanding pull/reconstruction.
    required_objects: HashSet<ObjectId>,
}

impl<T, R> TaskDependencyManager<T, R>
where
    T: ObjectTransport,
    R: ReconstructionPolicy,
{
    pub fn new(transport: T, reconstruction: R) -> Self {
        Self {
            transport,
            reconstruction,
            metrics: DepMetrics::new(),
            local_objects: HashSet::new(),
            task_dependencies: HashMap::new(),
            worker_dependencies: HashMap::new(),
            required_tasks: HashMap::new(),
            pending_tasks: HashSet::new(),
            required_objects: HashSet::new(),
        }
    }

    /// Whether `object_id` is currently materialized on this node.
    pub fn is_object_local(&self, object_id: ObjectId) -> bool {
        self.local_objects.contains(&object_id)
    }

    /// Whether a remote fetch for `object_id` is currently needed: some
    /// subscriber depends on it, it is not local, and its creating task is
    /// not pending local execution.
    fn object_is_required(&self, object_id: ObjectId) -> bool {
        let creator = object_id.creator_task_id();
        let Some(task_entry) = self.required_tasks.get(&creator) else {
            return false;
        };
        if !task_entry.contains_key(&object_id) {
            return false;
        }
        if self.local_objects.contains(&object_id) {
            return false;
        }
        if self.pending_tasks.contains(&creator) {
            return false;
        }
        true
    }

    /// Public surface of the required predicate.
    ///
    /// Returns the owner address cached at first subscription iff the object
    /// is currently required.
    pub fn check_object_required(&self, object_id: ObjectId) -> Option<&OwnerAddress> {
        if !self.object_is_required(object_id) {
            return None;
        }
        self.required_tasks
            .get(&object_id.creator_task_id())
            .and_then(|objects| objects.get(&object_id))
            .map(|entry| &entry.owner)
    }

    /// Owner address cached at the first subscription referencing
    /// `object_id`.
    ///
    /// Returns `None` when nothing is subscribed to the object, or when the
    /// cached address has no worker id (absent owner).
    pub fn owner_address(&self, object_id: ObjectId) -> Option<&OwnerAddress> {
        let entry = self
            .required_tasks
            .get(&object_id.creator_task_id())?
            .get(&object_id)?;
        if entry.owner.is_present() {
            Some(&entry.owner)
        } else {
            None
        }
    }

    /// Open a pull and a reconstruction listen for `object_id` if it is
    /// required and none is outstanding yet. At most one open per object.
    fn open_pull_if_required(&mut self, object_id: ObjectId) {
        let Some(owner) = self.check_object_required(object_id).cloned() else {
            return;
        };
        if self.required_objects.insert(object_id) {
            debug!(object = %object_id, "object required; opening pull");
            if let Err(e) = self.transport.pull(object_id, &owner) {
                panic!("object transport rejected pull for {object_id}: {e}");
            }
            self.reconstruction
                .listen_and_maybe_reconstruct(object_id, &owner);
        }
    }

    /// Close the outstanding pull for `object_id` if it is no longer
    /// required. At most one close per open.
    fn close_pull_if_not_required(&mut self, object_id: ObjectId) {
        if self.object_is_required(object_id) {
            return;
        }
        if self.required_objects.remove(&object_id) {
            debug!(object = %object_id, "object no longer required; closing pull");
            self.transport.cancel_pull(object_id);
            self.reconstruction.cancel(object_id);
        }
    }

    /// Delete `object_id`'s record if it has no dependents left, and the
    /// creator's entry if that was its last object.
    fn remove_object_entry_if_empty(&mut self, object_id: ObjectId) {
        let creator = object_id.creator_task_id();
        let Some(creating_entry) = self.required_tasks.get_mut(&creator) else {
            return;
        };
        if creating_entry
            .get(&object_id)
            .is_some_and(ObjectDependencies::is_empty)
        {
            creating_entry.remove(&object_id);
            if creating_entry.is_empty() {
                self.required_tasks.remove(&creator);
            }
        }
    }

    /// Subscribe `task_id` to the given fetch dependencies.
    ///
    /// Duplicate references within one call are collapsed silently, and
    /// re-subscribing an already-subscribed task is additive: new objects
    /// are recorded, existing membership is preserved.
    ///
    /// Returns `true` iff every declared dependency is local afterwards,
    /// i.e. the task can run immediately.
    pub fn subscribe_get_dependencies(&mut self, task_id: TaskId, refs: &[ObjectRef]) -> bool {
        let task_entry = self.task_dependencies.entry(task_id).or_default();

        for object_ref in refs {
            let object_id = object_ref.object_id;
            if !task_entry.get_dependencies.insert(object_id) {
                continue;
            }
            debug!(task = %task_id, object = %object_id, "task blocked on object");
            if !self.local_objects.contains(&object_id) {
                task_entry.num_missing_get_dependencies += 1;
            }
            // The first subscription's owner address wins for the lifetime
            // of the record.
            self.required_tasks
                .entry(object_id.creator_task_id())
                .or_default()
                .entry(object_id)
                .or_insert_with(|| ObjectDependencies::new(object_ref.owner.clone()))
                .dependent_tasks
                .insert(task_id);
        }

        let all_local = task_entry.num_missing_get_dependencies == 0;

        // Try to make the recorded dependencies local if necessary.
        for object_ref in refs {
            self.open_pull_if_required(object_ref.object_id);
        }

        all_local
    }

    /// Subscribe `worker_id`'s wait call to the given objects.
    ///
    /// References that are already local are skipped entirely: the wait is
    /// satisfied at call time. The worker's entry is removed only by
    /// [`Self::unsubscribe_wait_dependencies`].
    pub fn subscribe_wait_dependencies(&mut self, worker_id: WorkerId, refs: &[ObjectRef]) {
        let worker_entry = self.worker_dependencies.entry(worker_id).or_default();

        for object_ref in refs {
            let object_id = object_ref.object_id;
            if self.local_objects.contains(&object_id) {
                continue;
            }
            debug!(worker = %worker_id, object = %object_id, "worker waiting on remote object");
            if worker_entry.insert(object_id) {
                self.required_tasks
                    .entry(object_id.creator_task_id())
                    .or_default()
                    .entry(object_id)
                    .or_insert_with(|| ObjectDependencies::new(object_ref.owner.clone()))
                    .dependent_workers
                    .insert(worker_id);
            }
        }

        for object_ref in refs {
            self.open_pull_if_required(object_ref.object_id);
        }
    }

    /// Drop `task_id`'s get-dependency subscription entirely.
    ///
    /// Returns `false` if the task was not subscribed.
    pub fn unsubscribe_get_dependencies(&mut self, task_id: TaskId) -> bool {
        let Some(task_entry) = self.task_dependencies.remove(&task_id) else {
            return false;
        };
        debug!(task = %task_id, "task no longer blocked");

        for &object_id in &task_entry.get_dependencies {
            let object_entry = self
                .object_entry_mut(object_id)
                .unwrap_or_else(|| panic!("no dependency record for {object_id}"));
            assert!(
                object_entry.dependent_tasks.remove(&task_id),
                "task {task_id} was not recorded as dependent on {object_id}"
            );
            self.remove_object_entry_if_empty(object_id);
        }

        // The dependencies are no longer required by this task; cancel any
        // in-progress operations to make them local.
        for &object_id in &task_entry.get_dependencies {
            self.close_pull_if_not_required(object_id);
        }

        true
    }

    /// Drop `worker_id`'s wait subscription entirely. No-op if the worker
    /// has no entry.
    pub fn unsubscribe_wait_dependencies(&mut self, worker_id: WorkerId) {
        let Some(worker_entry) = self.worker_dependencies.remove(&worker_id) else {
            return;
        };
        debug!(worker = %worker_id, "worker no longer blocked");

        for &object_id in &worker_entry {
            let object_entry = self
                .object_entry_mut(object_id)
                .unwrap_or_else(|| panic!("no dependency record for {object_id}"));
            assert!(
                object_entry.dependent_workers.remove(&worker_id),
                "worker {worker_id} was not recorded as waiting on {object_id}"
            );
            self.remove_object_entry_if_empty(object_id);
        }

        for &object_id in &worker_entry {
            self.close_pull_if_not_required(object_id);
        }
    }

    /// Record that `object_id` has materialized on this node.
    ///
    /// Returns the subscribed tasks whose last missing dependency this was,
    /// in a deterministic order. Waits on the object are satisfied and
    /// cleared; the caller notifies those workers out of band, and the waits
    /// do not re-arm if the object later goes missing.
    ///
    /// # Panics
    ///
    /// Panics if the object was already recorded as local; that indicates a
    /// caller bug that corrupted scheduling state.
    pub fn handle_object_local(&mut self, object_id: ObjectId) -> Vec<TaskId> {
        assert!(
            self.local_objects.insert(object_id),
            "object {object_id} marked local twice"
        );
        debug!(object = %object_id, "object became local");

        let mut ready_tasks = Vec::new();
        let creator = object_id.creator_task_id();
        if let Some(creating_entry) = self.required_tasks.get_mut(&creator) {
            if let Some(object_entry) = creating_entry.get_mut(&object_id) {
                for &dependent_task_id in &object_entry.dependent_tasks {
                    let task_entry = self
                        .task_dependencies
                        .get_mut(&dependent_task_id)
                        .unwrap_or_else(|| {
                            panic!("no dependency state for subscribed task {dependent_task_id}")
                        });
                    task_entry.num_missing_get_dependencies -= 1;
                    if task_entry.num_missing_get_dependencies == 0 {
                        ready_tasks.push(dependent_task_id);
                    }
                }
                // Waits on this object can now return it as ready.
                for &dependent_worker_id in &object_entry.dependent_workers {
                    let waits = self
                        .worker_dependencies
                        .get_mut(&dependent_worker_id)
                        .unwrap_or_else(|| {
                            panic!("no wait state for subscribed worker {dependent_worker_id}")
                        });
                    assert!(
                        waits.remove(&object_id),
                        "worker {dependent_worker_id} was not waiting on {object_id}"
                    );
                }
                object_entry.dependent_workers.clear();
            }
        }
        self.remove_object_entry_if_empty(object_id);

        // The object is local now; cancel any in-progress operations to make
        // it local.
        self.close_pull_if_not_required(object_id);

        ready_tasks
    }

    /// Record that `object_id` is no longer materialized on this node.
    ///
    /// Returns the subscribed tasks that had all dependencies satisfied and
    /// must be switched back to waiting. Worker waits are not re-armed.
    ///
    /// # Panics
    ///
    /// Panics if the object was not recorded as local.
    pub fn handle_object_missing(&mut self, object_id: ObjectId) -> Vec<TaskId> {
        assert!(
            self.local_objects.remove(&object_id),
            "object {object_id} was not local"
        );
        debug!(object = %object_id, "object went missing");

        let mut waiting_tasks = Vec::new();
        let creator = object_id.creator_task_id();
        if let Some(creating_entry) = self.required_tasks.get_mut(&creator) {
            if let Some(object_entry) = creating_entry.get_mut(&object_id) {
                for &dependent_task_id in &object_entry.dependent_tasks {
                    let task_entry = self
                        .task_dependencies
                        .get_mut(&dependent_task_id)
                        .unwrap_or_else(|| {
                            panic!("no dependency state for subscribed task {dependent_task_id}")
                        });
                    // A task with no missing dependencies was considered
                    // ready and must be reported before the counter changes.
                    if task_entry.num_missing_get_dependencies == 0 {
                        waiting_tasks.push(dependent_task_id);
                    }
                    task_entry.num_missing_get_dependencies += 1;
                }
            }
        }

        // The object is no longer local; try to make it local if necessary.
        self.open_pull_if_required(object_id);

        waiting_tasks
    }

    /// Record that `task`'s execution has been scheduled on this node.
    ///
    /// Only actor-creation tasks resubmitted by the node itself (no dispatch
    /// callback) are tracked: their outputs will materialize locally, so any
    /// outstanding pulls for them are closed. Tasks dispatched through a
    /// worker lease are ignored.
    pub fn task_pending(&mut self, task: &Task) {
        if !(task.is_actor_creation() && task.on_dispatch().is_none()) {
            return;
        }

        let task_id = task.id();
        debug!(task = %task_id, "task execution pending");
        if self.pending_tasks.insert(task_id) {
            // Objects created by the pending task will appear locally once
            // it finishes; stop fetching them from peers.
            let created: Vec<ObjectId> = self
                .required_tasks
                .get(&task_id)
                .map(|objects| objects.keys().copied().collect())
                .unwrap_or_default();
            for object_id in created {
                self.close_pull_if_not_required(object_id);
            }
        }
    }

    /// Record that `task_id` is no longer pending local execution. No-op if
    /// the task was not pending.
    pub fn task_canceled(&mut self, task_id: TaskId) {
        if !self.pending_tasks.remove(&task_id) {
            return;
        }
        debug!(task = %task_id, "task execution canceled");

        // Objects created by the canceled task will no longer appear
        // locally; try to make them local if necessary.
        let created: Vec<ObjectId> = self
            .required_tasks
            .get(&task_id)
            .map(|objects| objects.keys().copied().collect())
            .unwrap_or_default();
        for object_id in created {
            self.open_pull_if_required(object_id);
        }
    }

    /// Bulk purge of `task_ids` and every object they were subscribed to.
    ///
    /// Dropping an object's creator entry drops *all* subscribers on that
    /// creator's outputs, which is sound only because the caller guarantees
    /// those subscribers are themselves in `task_ids`.
    ///
    /// # Panics
    ///
    /// Panics if a task outside `task_ids` still depends on an output of a
    /// purged task afterwards; that indicates a caller contract violation.
    pub fn remove_tasks_and_related_objects(&mut self, task_ids: &HashSet<TaskId>) {
        // Collect the unique objects the purged tasks were subscribed to.
        let mut removed_objects: BTreeSet<ObjectId> = BTreeSet::new();
        for &task_id in task_ids {
            if let Some(task_entry) = self.task_dependencies.remove(&task_id) {
                removed_objects.extend(task_entry.get_dependencies);
            }
            self.pending_tasks.remove(&task_id);
        }

        for &object_id in &removed_objects {
            self.required_tasks.remove(&object_id.creator_task_id());
        }
        for &object_id in &removed_objects {
            self.close_pull_if_not_required(object_id);
        }

        for &task_id in task_ids {
            if self.required_tasks.contains_key(&task_id) {
                panic!(
                    "task {task_id} was purged but a task outside the purge set \
                     still depends on its outputs"
                );
            }
        }
    }

    /// Multi-line summary of the primary index sizes.
    pub fn debug_string(&self) -> String {
        let mut out = String::from("TaskDependencyManager:");
        let _ = write!(out, "\n- task dep map size: {}", self.task_dependencies.len());
        let _ = write!(out, "\n- task req map size: {}", self.required_tasks.len());
        let _ = write!(out, "\n- req objects map size: {}", self.required_objects.len());
        let _ = write!(out, "\n- local objects map size: {}", self.local_objects.len());
        let _ = write!(out, "\n- pending tasks map size: {}", self.pending_tasks.len());
        out
    }

    /// Report the primary index sizes to the metrics sink.
    pub fn record_metrics(&self) {
        self.metrics
            .set_subscribed_tasks(self.task_dependencies.len());
        self.metrics.set_required_tasks(self.required_tasks.len());
        self.metrics
            .set_required_objects(self.required_objects.len());
        self.metrics.set_pending_tasks(self.pending_tasks.len());
    }

    /// Number of tasks with an active get-dependency subscription.
    pub fn subscribed_task_count(&self) -> usize {
        self.task_dependencies.len()
    }

    /// Number of creating tasks with at least one required output object.
    pub fn required_task_count(&self) -> usize {
        self.required_tasks.len()
    }

    /// Number of objects with an outstanding pull.
    pub fn active_pull_count(&self) -> usize {
        self.required_objects.len()
    }

    /// Whether a pull is outstanding for `object_id`.
    pub fn pull_active(&self, object_id: ObjectId) -> bool {
        self.required_objects.contains(&object_id)
    }

    /// Number of tasks pending local execution.
    pub fn pending_task_count(&self) -> usize {
        self.pending_tasks.len()
    }

    /// Missing-dependency count of a subscribed task, or `None` if the task
    /// is not subscribed.
    pub fn missing_dependency_count(&self, task_id: TaskId) -> Option<usize> {
        self.task_dependencies
            .get(&task_id)
            .map(|entry| entry.num_missing_get_dependencies)
    }

    /// Number of objects a subscribed worker is still waiting on, or `None`
    /// if the worker is not subscribed.
    pub fn worker_wait_count(&self, worker_id: WorkerId) -> Option<usize> {
        self.worker_dependencies
            .get(&worker_id)
            .map(BTreeSet::len)
    }

    fn object_entry_mut(&mut self, object_id: ObjectId) -> Option<&mut ObjectDependencies> {
        self.required_tasks
            .get_mut(&object_id.creator_task_id())
            .and_then(|objects| objects.get_mut(&object_id))
    }
}
