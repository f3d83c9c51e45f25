use std::collections::{BTreeMap, BTreeSet};

use crate::state::{EntityId, RecordId};

use super::RecordFields;

/// Pending outbound changes, accumulated between flushes.
///
/// Mutations only enqueue; serialization happens when the host drains the
/// queue, so the same logic runs unchanged in a build with no observers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplicationQueue {
    records: BTreeMap<RecordId, RecordFields>,
    ledgers: BTreeSet<EntityId>,
    removed: BTreeSet<RecordId>,
}

impl ReplicationQueue {
    pub(crate) fn mark(&mut self, record: RecordId, fields: RecordFields) {
        *self.records.entry(record).or_default() |= fields;
    }

    pub(crate) fn mark_ledger(&mut self, performer: EntityId) {
        self.ledgers.insert(performer);
    }

    /// Replaces any pending field update with a removal.
    pub(crate) fn remove(&mut self, record: RecordId) {
        self.records.remove(&record);
        self.removed.insert(record);
    }

    pub fn dirty_fields(&self, record: RecordId) -> RecordFields {
        self.records.get(&record).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.ledgers.is_empty() && self.removed.is_empty()
    }

    pub(crate) fn take(
        &mut self,
    ) -> (
        BTreeMap<RecordId, RecordFields>,
        BTreeSet<EntityId>,
        BTreeSet<RecordId>,
    ) {
        (
            std::mem::take(&mut self.records),
            std::mem::take(&mut self.ledgers),
            std::mem::take(&mut self.removed),
        )
    }
}
