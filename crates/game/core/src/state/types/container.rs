use std::collections::BTreeSet;

use super::{EntityId, RecordId};

/// Membership set of action records resting inside one holder entity.
///
/// The holder can be an item, a mind, or a performer acting as its own holder.
/// A record appears in at most one container at a time.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionContainer {
    holder: EntityId,
    records: BTreeSet<RecordId>,
    capacity: Option<usize>,
}

impl ActionContainer {
    pub fn new(holder: EntityId, capacity: Option<usize>) -> Self {
        Self {
            holder,
            records: BTreeSet::new(),
            capacity,
        }
    }

    pub fn holder(&self) -> EntityId {
        self.holder
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
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

    /// Number of records that still fit, `None` when unbounded.
    pub fn free_slots(&self) -> Option<usize> {
        self.capacity
            .map(|cap| cap.saturating_sub(self.records.len()))
    }

    pub fn is_full(&self) -> bool {
        self.free_slots() == Some(0)
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
