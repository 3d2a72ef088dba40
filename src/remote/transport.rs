// src/remote/transport.rs

//! Pluggable object-transport abstraction.
//!
//! The dependency manager talks to an [`ObjectTransport`] instead of the
//! object manager directly. This makes it easy to swap in a recording fake in
//! tests while keeping the production implementation a thin forwarder.
//!
//! - [`ChannelTransport`] is the production implementation: it forwards
//!   commands to the object-manager loop over an unbounded channel. The send
//!   side is synchronous, so the dependency manager never suspends.

use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::{Result, TaskdepError};
use crate::types::{ObjectId, OwnerAddress};

/// Trait abstracting how object fetches are opened and closed.
pub trait ObjectTransport {
    /// Begin fetching `object_id` from peers, using `owner` to locate it.
    ///
    /// The transport owns retry and acknowledgement. An error means the
    /// transport itself is unusable; the caller treats that as fatal.
    fn pull(&mut self, object_id: ObjectId, owner: &OwnerAddress) -> Result<()>;

    /// Close any outstanding fetch for `object_id`.
    ///
    /// Called at most once per successful `pull`.
    fn cancel_pull(&mut self, object_id: ObjectId);
}

/// Command forwarded to the object-manager loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    Pull {
        object_id: ObjectId,
        owner: OwnerAddress,
    },
    CancelPull {
        object_id: ObjectId,
    },
}

/// Production transport backed by a channel to the object-manager loop.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<TransportCommand>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::UnboundedSender<TransportCommand>) -> Self {
        Self { tx }
    }
}

impl ObjectTransport for ChannelTransport {
    fn pull(&mut self, object_id: ObjectId, owner: &OwnerAddress) -> Result<()> {
        self.tx
            .send(TransportCommand::Pull {
                object_id,
                owner: owner.clone(),
            })
            .map_err(|_| {
                TaskdepError::TransportUnavailable("object manager channel closed".to_string())
            })
    }

    fn cancel_pull(&mut self, object_id: ObjectId) {
        // Nothing left to cancel if the object manager is already gone.
        if self
            .tx
            .send(TransportCommand::CancelPull { object_id })
            .is_err()
        {
            debug!(object = %object_id, "cancel after object manager shutdown; dropping");
        }
    }
}
