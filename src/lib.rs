// src/lib.rs

//! Per-node task dependency management for a distributed task-execution
//! runtime.
//!
//! Each node runs one [`TaskDependencyManager`]. The node scheduler
//! subscribes the fetch dependencies of queued tasks and the wait sets of
//! blocked workers; the manager keeps a reference-counted reverse index of
//! everything that is required, and opens a pull against the object
//! transport (plus a reconstruction listen) for exactly those objects that
//! are needed, not local, and not about to be produced by a locally pending
//! task. When an object arrives or goes missing, the manager reports which
//! tasks became ready or must be re-queued.
//!
//! The component is purely in-memory and single-threaded; on restart the
//! scheduler resubscribes.

pub mod deps;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod remote;
pub mod types;

pub use deps::TaskDependencyManager;
pub use remote::{ObjectTransport, ReconstructionPolicy};
pub use types::{ObjectId, ObjectRef, OwnerAddress, Task, TaskId, TaskKind, WorkerId};
