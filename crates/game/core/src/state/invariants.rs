//! Consistency audit of the relational indices.

use crate::error::{ErrorSeverity, GameError};

use super::{ActionWorld, EntityId, RecordId};

/// A broken relation between records, containers and ledgers.
///
/// These are programmer errors: the managers keep every index in step, so a
/// violation means some writer updated one side of a relation only.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InvariantViolation {
    #[error("record {record} is granted to {performer} but rests in no container")]
    GrantedWithoutContainer { record: RecordId, performer: EntityId },

    #[error("record {record} claims container {holder} which does not list it")]
    MissingFromContainer { record: RecordId, holder: EntityId },

    #[error("container {holder} lists record {record} which claims {claimed:?}")]
    ForeignContainerEntry {
        holder: EntityId,
        record: RecordId,
        claimed: Option<EntityId>,
    },

    #[error("record {record} claims performer {performer} whose ledger does not list it")]
    MissingFromLedger { record: RecordId, performer: EntityId },

    #[error("ledger of {performer} lists record {record} which claims {claimed:?}")]
    ForeignLedgerEntry {
        performer: EntityId,
        record: RecordId,
        claimed: Option<EntityId>,
    },
}

impl GameError for InvariantViolation {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        use InvariantViolation::*;
        match self {
            GrantedWithoutContainer { .. } => "INVARIANT_GRANTED_WITHOUT_CONTAINER",
            MissingFromContainer { .. } => "INVARIANT_MISSING_FROM_CONTAINER",
            ForeignContainerEntry { .. } => "INVARIANT_FOREIGN_CONTAINER_ENTRY",
            MissingFromLedger { .. } => "INVARIANT_MISSING_FROM_LEDGER",
            ForeignLedgerEntry { .. } => "INVARIANT_FOREIGN_LEDGER_ENTRY",
        }
    }
}

impl ActionWorld {
    /// Verifies that every record agrees with the container and ledger
    /// indices, returning the first violation found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for record in self.records() {
            let id = record.id();

            if let Some(performer) = record.attached_entity()
                && record.container().is_none()
            {
                return Err(InvariantViolation::GrantedWithoutContainer { record: id, performer });
            }

            if let Some(holder) = record.container()
                && !self.container(holder).is_some_and(|c| c.contains(id))
            {
                return Err(InvariantViolation::MissingFromContainer { record: id, holder });
            }

            if let Some(performer) = record.attached_entity()
                && !self.ledger(performer).is_some_and(|l| l.contains(id))
            {
                return Err(InvariantViolation::MissingFromLedger { record: id, performer });
            }
        }

        // Reverse direction: every index entry must point back.
        for container in self.containers() {
            for id in container.records() {
                let claimed = self.record(id).and_then(|r| r.container());
                if claimed != Some(container.holder()) {
                    return Err(InvariantViolation::ForeignContainerEntry {
                        holder: container.holder(),
                        record: id,
                        claimed,
                    });
                }
            }
        }

        for ledger in self.ledgers() {
            for id in ledger.records() {
                let claimed = self.record(id).and_then(|r| r.attached_entity());
                if claimed != Some(ledger.performer()) {
                    return Err(InvariantViolation::ForeignLedgerEntry {
                        performer: ledger.performer(),
                        record: id,
                        claimed,
                    });
                }
            }
        }

        Ok(())
    }

    /// Debug-build audit run after every mutating manager operation.
    #[inline]
    pub(crate) fn debug_audit(&self) {
        #[cfg(debug_assertions)]
        {
            if let Err(violation) = self.check_invariants() {
                panic!("action graph invariant broken: {violation}");
            }
        }
    }
}
