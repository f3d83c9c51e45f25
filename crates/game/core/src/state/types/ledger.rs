use std::collections::BTreeSet;

use super::{EntityId, RecordId};

/// Records currently granted to one performer.
///
/// This is a denormalized index: it always equals the set of records whose
/// `attached_entity` names this performer. Iteration order is by record id and
/// carries no meaning (it is not preserved across upgrades).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GrantLedger {
    performer: EntityId,
    records: BTreeSet<RecordId>,
}

impl GrantLedger {
    pub fn new(performer: EntityId) -> Self {
        Self {
            performer,
            records: BTreeSet::new(),
        }
    }

    pub fn performer(&self) -> EntityId {
        self.performer
    }

    pub fn contains(&self, record: RecordId) -> bool {
        self.records.contains(&record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.records.iter().copied()
    }

    pub(crate) fn insert(&mut self, record: RecordId) -> bool {
        self.records.insert(record)
    }

    pub(crate) fn remove(&mut self, record: RecordId) -> bool {
        self.records.remove(&record)
    }
}
