//! Recording fakes for the manager's collaborators.
//!
//! Both fakes append to a shared [`RemoteLog`] so tests can assert the exact
//! sequence of outgoing calls across the transport and the reconstruction
//! policy together.

use std::sync::{Arc, Mutex};

use taskdep::errors::Result;
use taskdep::remote::{ObjectTransport, ReconstructionPolicy};
use taskdep::types::{ObjectId, OwnerAddress};

/// One outgoing call observed by the fakes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    Pull(ObjectId, OwnerAddress),
    CancelPull(ObjectId),
    Listen(ObjectId, OwnerAddress),
    CancelListen(ObjectId),
}

/// Shared, cloneable log of outgoing calls.
#[derive(Debug, Clone, Default)]
pub struct RemoteLog {
    events: Arc<Mutex<Vec<RemoteEvent>>>,
}

impl RemoteLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: RemoteEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// Snapshot of all recorded events.
    pub fn events(&self) -> Vec<RemoteEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Drain recorded events, leaving the log empty.
    pub fn take(&self) -> Vec<RemoteEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    /// How many recorded events match `pred`.
    pub fn count(&self, pred: impl Fn(&RemoteEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    /// Total `Pull` calls issued for `object_id`.
    pub fn pulls_of(&self, object_id: ObjectId) -> usize {
        self.count(|e| matches!(e, RemoteEvent::Pull(id, _) if *id == object_id))
    }

    /// Total `CancelPull` calls issued for `object_id`.
    pub fn cancels_of(&self, object_id: ObjectId) -> usize {
        self.count(|e| matches!(e, RemoteEvent::CancelPull(id) if *id == object_id))
    }
}

/// Object transport that records pulls instead of fetching anything.
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    log: RemoteLog,
}

impl RecordingTransport {
    pub fn new(log: RemoteLog) -> Self {
        Self { log }
    }
}

impl ObjectTransport for RecordingTransport {
    fn pull(&mut self, object_id: ObjectId, owner: &OwnerAddress) -> Result<()> {
        self.log.push(RemoteEvent::Pull(object_id, owner.clone()));
        Ok(())
    }

    fn cancel_pull(&mut self, object_id: ObjectId) {
        self.log.push(RemoteEvent::CancelPull(object_id));
    }
}

/// Reconstruction policy that records listens instead of monitoring owners.
#[derive(Debug, Clone)]
pub struct RecordingPolicy {
    log: RemoteLog,
}

impl RecordingPolicy {
    pub fn new(log: RemoteLog) -> Self {
        Self { log }
    }
}

impl ReconstructionPolicy for RecordingPolicy {
    fn listen_and_maybe_reconstruct(&mut self, object_id: ObjectId, owner: &OwnerAddress) {
        self.log.push(RemoteEvent::Listen(object_id, owner.clone()));
    }

    fn cancel(&mut self, object_id: ObjectId) {
        self.log.push(RemoteEvent::CancelListen(object_id));
    }
}
