#![allow(dead_code)]

//! Builder helpers for ids, references and tasks used across tests.

use taskdep::types::{ObjectId, ObjectRef, OwnerAddress, Task, TaskId, TaskKind, WorkerId};

pub fn task_id(raw: u64) -> TaskId {
    TaskId::new(raw)
}

pub fn worker_id(raw: u64) -> WorkerId {
    WorkerId::new(raw)
}

pub fn object(creator: TaskId, index: u32) -> ObjectId {
    ObjectId::new(creator, index)
}

/// Owner address with the given worker id set (present).
pub fn owner(worker: &str) -> OwnerAddress {
    OwnerAddress {
        node_id: "node-1".to_string(),
        ip_address: "10.0.0.1".to_string(),
        port: 7000,
        worker_id: worker.to_string(),
    }
}

/// Owner address with no worker id (absent owner).
pub fn absent_owner() -> OwnerAddress {
    OwnerAddress::default()
}

pub fn obj_ref(object_id: ObjectId, owner: OwnerAddress) -> ObjectRef {
    ObjectRef::new(object_id, owner)
}

/// Actor-creation task resubmitted by the node itself (no dispatch
/// callback): the only shape tracked as pending.
pub fn actor_restart_task(id: TaskId) -> Task {
    Task::new(id, TaskKind::ActorCreation)
}

/// Task submitted through a worker lease; carries a dispatch callback and is
/// ignored by pending-task tracking.
pub fn leased_task(id: TaskId, kind: TaskKind) -> Task {
    Task::new(id, kind).with_dispatch(Box::new(|| {}))
}
