// src/remote/reconstruction.rs

//! Pluggable reconstruction-policy abstraction.
//!
//! The policy monitors an object's owner so that loss events trigger
//! lineage-based re-execution. The dependency manager only opens and closes
//! listens; deciding *when* to reconstruct is the policy's job.

use tokio::sync::mpsc;
use tracing::debug;

use crate::types::{ObjectId, OwnerAddress};

/// Trait abstracting how reconstruction listens are opened and closed.
pub trait ReconstructionPolicy {
    /// Begin monitoring `object_id`'s owner for loss.
    fn listen_and_maybe_reconstruct(&mut self, object_id: ObjectId, owner: &OwnerAddress);

    /// Stop monitoring `object_id`.
    ///
    /// Called at most once per listen.
    fn cancel(&mut self, object_id: ObjectId);
}

/// Command forwarded to the reconstruction loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconstructionCommand {
    Listen {
        object_id: ObjectId,
        owner: OwnerAddress,
    },
    Cancel {
        object_id: ObjectId,
    },
}

/// Production policy handle backed by a channel to the reconstruction loop.
///
/// Both operations are fire-and-forget; a shut-down loop simply drops them.
#[derive(Debug, Clone)]
pub struct ChannelReconstructionPolicy {
    tx: mpsc::UnboundedSender<ReconstructionCommand>,
}

impl ChannelReconstructionPolicy {
    pub fn new(tx: mpsc::UnboundedSender<ReconstructionCommand>) -> Self {
        Self { tx }
    }
}

impl ReconstructionPolicy for ChannelReconstructionPolicy {
    fn listen_and_maybe_reconstruct(&mut self, object_id: ObjectId, owner: &OwnerAddress) {
        if self
            .tx
            .send(ReconstructionCommand::Listen {
                object_id,
                owner: owner.clone(),
            })
            .is_err()
        {
            debug!(object = %object_id, "listen after reconstruction shutdown; dropping");
        }
    }

    fn cancel(&mut self, object_id: ObjectId) {
        if self
            .tx
            .send(ReconstructionCommand::Cancel { object_id })
            .is_err()
        {
            debug!(object = %object_id, "cancel after reconstruction shutdown; dropping");
        }
    }
}
