use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a task, unique across the cluster.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(raw: u64) -> Self {
        TaskId(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{:08x}", self.0)
    }
}

/// Identifier of an object produced by a task.
///
/// The identifier structurally embeds the producing task and the output
/// index, so the creator is derivable without any lookup.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ObjectId {
    creator: TaskId,
    index: u32,
}

impl ObjectId {
    pub const fn new(creator: TaskId, index: u32) -> Self {
        ObjectId { creator, index }
    }

    /// The task whose execution produces this object.
    pub const fn creator_task_id(self) -> TaskId {
        self.creator
    }

    /// Position of this object among the creator's outputs.
    pub const fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "o{:08x}.{}", self.creator.as_u64(), self.index)
    }
}

/// Identifier of a local worker process.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct WorkerId(u64);

impl WorkerId {
    pub const fn new(raw: u64) -> Self {
        WorkerId(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{:08x}", self.0)
    }
}

/// Address of the remote actor that owns an object.
///
/// An address is "present" when its worker id is non-empty; subscriptions may
/// legitimately carry an absent owner (e.g. references forwarded before the
/// owner registered itself).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerAddress {
    pub node_id: String,
    pub ip_address: String,
    pub port: u16,
    pub worker_id: String,
}

impl OwnerAddress {
    /// Whether the address actually names an owning worker.
    pub fn is_present(&self) -> bool {
        !self.worker_id.is_empty()
    }
}

/// An object reference as received from the RPC layer: the object identifier
/// plus the owner address to cache for later pulls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub object_id: ObjectId,
    pub owner: OwnerAddress,
}

impl ObjectRef {
    pub fn new(object_id: ObjectId, owner: OwnerAddress) -> Self {
        ObjectRef { object_id, owner }
    }
}

/// What kind of work a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// An ordinary remote function invocation.
    Normal,
    /// A task whose execution instantiates an actor.
    ActorCreation,
}

/// Callback invoked when the scheduler dispatches the task to a leased
/// worker.
pub type DispatchCallback = Box<dyn FnOnce() + Send + 'static>;

/// A unit of work queued on this node.
///
/// The dispatch callback is set when the task was submitted through a worker
/// lease; it is absent when the node resubmitted the task itself, e.g. to
/// restart an actor. Only the latter shape executes locally without remote
/// assistance.
pub struct Task {
    id: TaskId,
    kind: TaskKind,
    on_dispatch: Option<DispatchCallback>,
}

impl Task {
    pub fn new(id: TaskId, kind: TaskKind) -> Self {
        Task {
            id,
            kind,
            on_dispatch: None,
        }
    }

    /// Attach the worker-lease dispatch callback.
    #[must_use]
    pub fn with_dispatch(mut self, callback: DispatchCallback) -> Self {
        self.on_dispatch = Some(callback);
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn is_actor_creation(&self) -> bool {
        matches!(self.kind, TaskKind::ActorCreation)
    }

    /// The dispatch callback, if the task was submitted through a worker
    /// lease.
    pub fn on_dispatch(&self) -> Option<&DispatchCallback> {
        self.on_dispatch.as_ref()
    }

    /// Consume the dispatch callback for invocation.
    pub fn take_dispatch(&mut self) -> Option<DispatchCallback> {
        self.on_dispatch.take()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("has_dispatch", &self.on_dispatch.is_some())
            .finish()
    }
}
