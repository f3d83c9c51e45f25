//! Event payloads published by the simulation worker.

use actions_core::{
    ActionError, EntityId, GameError, GameTime, PerformedAction, PresentationCue, RecordId,
    ReplicationBatch, ReplicationError,
};
use serde::{Deserialize, Serialize};

/// Outcome of an execution request or of a periodic sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionEvent {
    /// The record ran and its bookkeeping was applied.
    Performed(PerformedAction),

    /// A sound or popup to play for the performer's observers.
    Presentation {
        performer: EntityId,
        action: RecordId,
        cue: PresentationCue,
    },

    /// Nothing handled the execution event. The world is unchanged.
    Unhandled {
        performer: EntityId,
        action: RecordId,
    },

    /// The request failed validation. The world is unchanged.
    Rejected {
        performer: EntityId,
        action: RecordId,
        code: String,
        reason: String,
    },

    /// Expired cooldown markers were evicted.
    CooldownsSwept { time: GameTime, evicted: usize },
}

impl ActionEvent {
    pub fn rejected(performer: EntityId, action: RecordId, error: &ActionError) -> Self {
        Self::Rejected {
            performer,
            action,
            code: error.error_code().to_owned(),
            reason: error.to_string(),
        }
    }

    /// The record this event concerns, if any.
    pub fn action(&self) -> Option<RecordId> {
        match self {
            Self::Performed(performed) => Some(performed.action),
            Self::Presentation { action, .. }
            | Self::Unhandled { action, .. }
            | Self::Rejected { action, .. } => Some(*action),
            Self::CooldownsSwept { .. } => None,
        }
    }
}

/// One encoded replication batch as it would travel on the wire.
///
/// Deltas are numbered from 1 in publish order. A full batch carries the
/// number of the last delta it already includes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationPacket {
    pub sequence: u64,
    pub time: GameTime,
    pub payload: Vec<u8>,
}

impl ReplicationPacket {
    pub fn encode(sequence: u64, batch: &ReplicationBatch) -> Result<Self, ReplicationError> {
        Ok(Self {
            sequence,
            time: batch.time,
            payload: batch.to_bytes()?,
        })
    }

    pub fn decode(&self) -> Result<ReplicationBatch, ReplicationError> {
        ReplicationBatch::from_bytes(&self.payload)
    }
}
