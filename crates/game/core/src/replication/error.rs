//! Replication errors.

use crate::error::{ErrorSeverity, GameError};

use super::NetEntity;

/// Errors raised while encoding, decoding or applying a replication batch.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReplicationError {
    /// Batches may only be applied to client replicas.
    #[error("replication batches can only be applied to a client replica")]
    NotReplica,

    /// A record claims a performer but no container.
    #[error("record {record} is granted but rests in no container")]
    OrphanGrant { record: NetEntity },

    /// After applying records, the replica's ledger disagrees with the server's.
    #[error("ledger of {performer} diverged from the authoritative copy")]
    LedgerMismatch { performer: NetEntity },

    #[error("failed to encode replication batch: {0}")]
    Encode(String),

    #[error("failed to decode replication batch: {0}")]
    Decode(String),
}

impl GameError for ReplicationError {
    fn severity(&self) -> ErrorSeverity {
        use ReplicationError::*;
        match self {
            NotReplica => ErrorSeverity::Internal,
            OrphanGrant { .. } | Decode(_) => ErrorSeverity::Validation,
            LedgerMismatch { .. } => ErrorSeverity::Fatal,
            Encode(_) => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        use ReplicationError::*;
        match self {
            NotReplica => "REPLICATION_NOT_REPLICA",
            OrphanGrant { .. } => "REPLICATION_ORPHAN_GRANT",
            LedgerMismatch { .. } => "REPLICATION_LEDGER_MISMATCH",
            Encode(_) => "REPLICATION_ENCODE",
            Decode(_) => "REPLICATION_DECODE",
        }
    }
}
