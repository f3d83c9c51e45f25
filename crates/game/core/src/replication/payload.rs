//! Replication payloads sent from the authoritative world to observers.

use std::time::Duration;

use crate::action::ActionKind;
use crate::state::{
    ActionRecord, ActionWorld, Cooldown, EntityId, EventKey, GameTime, Presentation, PrototypeId,
    UpgradeDescriptor,
};

use super::{NetEntity, RecordFields};

/// Full replicated state of one action record.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordState {
    pub net: NetEntity,

    /// Fields that changed since the previous flush.
    pub changed: RecordFields,

    pub prototype: PrototypeId,
    pub name: String,
    pub kind: ActionKind,
    pub enabled: bool,
    pub toggled: bool,
    pub cooldown: Option<Cooldown>,
    pub use_delay: Option<Duration>,
    pub charges: Option<i32>,
    pub priority: i32,
    pub check_can_interact: bool,
    pub presentation: Presentation,
    pub event: Option<EventKey>,
    pub upgrade: Option<UpgradeDescriptor>,

    pub container: Option<NetEntity>,
    pub attached_entity: Option<NetEntity>,
}

impl RecordState {
    pub(crate) fn capture(record: &ActionRecord, changed: RecordFields) -> Self {
        Self {
            net: NetEntity(record.id.0),
            changed,
            prototype: record.prototype.clone(),
            name: record.name.clone(),
            kind: record.kind.clone(),
            enabled: record.enabled,
            toggled: record.toggled,
            cooldown: record.cooldown,
            use_delay: record.use_delay,
            charges: record.charges,
            priority: record.priority,
            check_can_interact: record.check_can_interact,
            presentation: record.presentation.clone(),
            event: record.event.clone(),
            upgrade: record.upgrade.clone(),
            container: record.container.map(|holder| NetEntity(holder.0)),
            attached_entity: record.attached_entity.map(|performer| NetEntity(performer.0)),
        }
    }
}

/// Replicated grant ledger of one performer. An empty list means the ledger
/// was dropped or emptied.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LedgerState {
    pub performer: NetEntity,
    pub records: Vec<NetEntity>,
}

/// Everything that changed in the authoritative world since the last flush.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplicationBatch {
    pub time: GameTime,
    pub records: Vec<RecordState>,
    pub ledgers: Vec<LedgerState>,
    pub removed: Vec<NetEntity>,
}

impl ReplicationBatch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.ledgers.is_empty() && self.removed.is_empty()
    }

    pub fn record(&self, net: NetEntity) -> Option<&RecordState> {
        self.records.iter().find(|state| state.net == net)
    }
}

#[cfg(feature = "serde")]
impl ReplicationBatch {
    /// Encodes the batch for the wire.
    pub fn to_bytes(&self) -> Result<Vec<u8>, super::ReplicationError> {
        bincode::serialize(self).map_err(|err| super::ReplicationError::Encode(err.to_string()))
    }

    /// Decodes a batch received from the wire.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, super::ReplicationError> {
        bincode::deserialize(bytes).map_err(|err| super::ReplicationError::Decode(err.to_string()))
    }
}

impl ActionWorld {
    /// Drains pending changes into a batch stamped with `time`.
    ///
    /// Returns an empty batch on client replicas, which never replicate.
    pub fn drain_replication(&mut self, time: GameTime) -> ReplicationBatch {
        let (dirty, ledgers, removed) = self.replication_mut().take();

        let records = dirty
            .into_iter()
            .filter_map(|(id, changed)| {
                self.record(id)
                    .map(|record| RecordState::capture(record, changed))
            })
            .collect();

        let ledgers = ledgers
            .into_iter()
            .map(|performer| self.ledger_state(performer))
            .collect();

        ReplicationBatch {
            time,
            records,
            ledgers,
            removed: removed.into_iter().map(|id| NetEntity(id.0)).collect(),
        }
    }

    /// Captures every replicated record and ledger into one batch, for
    /// observers that lost part of the delta stream. The pending queue is
    /// left untouched.
    pub fn full_replication(&self, time: GameTime) -> ReplicationBatch {
        let records = self
            .records()
            .filter(|record| !record.client_exclusive)
            .map(|record| RecordState::capture(record, RecordFields::all()))
            .collect();

        let ledgers = self
            .ledgers()
            .map(|ledger| self.ledger_state(ledger.performer()))
            .collect();

        ReplicationBatch {
            time,
            records,
            ledgers,
            removed: Vec::new(),
        }
    }

    fn ledger_state(&self, performer: EntityId) -> LedgerState {
        LedgerState {
            performer: NetEntity(performer.0),
            records: self
                .ledger(performer)
                .into_iter()
                .flat_map(|ledger| ledger.records())
                .filter(|id| self.record(*id).is_some_and(|r| !r.client_exclusive))
                .map(|id| NetEntity(id.0))
                .collect(),
        }
    }
}
