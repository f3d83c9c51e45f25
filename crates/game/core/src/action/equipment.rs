//! Equipment seam: items contributing actions when equipped.
//!
//! When an item is equipped, a [`GetItemActionsEvent`] is raised at the item
//! and every registered [`ItemActionSource`] may add records (or prototypes to
//! materialize inside the item) to it. The engine then grants them to the
//! wearer. Unequipping revokes everything the item provides.

use std::collections::BTreeMap;
use std::sync::Arc;

use bitflags::bitflags;

use crate::state::{ActionWorld, EntityId, PrototypeId, RecordId};

bitflags! {
    /// Inventory slots an item can be equipped into.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct SlotFlags: u32 {
        const HEAD           = 1 << 0;
        const EYES           = 1 << 1;
        const EARS           = 1 << 2;
        const MASK           = 1 << 3;
        const OUTERCLOTHING  = 1 << 4;
        const INNERCLOTHING  = 1 << 5;
        const NECK           = 1 << 6;
        const BACK           = 1 << 7;
        const BELT           = 1 << 8;
        const GLOVES         = 1 << 9;
        const IDCARD         = 1 << 10;
        const POCKET         = 1 << 11;
        const FEET           = 1 << 12;
        const SUITSTORAGE    = 1 << 13;
        const HANDS          = 1 << 14;
    }
}

impl SlotFlags {
    /// Every slot that counts as worn clothing.
    pub const WORN: Self = Self::all().difference(Self::POCKET.union(Self::HANDS));
}

/// One contribution to an equip event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemAction {
    /// An existing record, moved into the item if it rests elsewhere.
    Record(RecordId),

    /// A prototype materialized inside the item. A record of the same
    /// prototype already resting in the item is reused.
    Prototype(PrototypeId),
}

/// Raised at an item when it is equipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetItemActionsEvent {
    pub item: EntityId,
    pub performer: EntityId,
    pub slot: SlotFlags,
    actions: Vec<ItemAction>,
}

impl GetItemActionsEvent {
    pub fn new(item: EntityId, performer: EntityId, slot: SlotFlags) -> Self {
        Self {
            item,
            performer,
            slot,
            actions: Vec::new(),
        }
    }

    pub fn add_record(&mut self, record: RecordId) {
        let action = ItemAction::Record(record);
        if !self.actions.contains(&action) {
            self.actions.push(action);
        }
    }

    pub fn add_prototype(&mut self, prototype: impl Into<PrototypeId>) {
        let action = ItemAction::Prototype(prototype.into());
        if !self.actions.contains(&action) {
            self.actions.push(action);
        }
    }

    pub fn actions(&self) -> &[ItemAction] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub(crate) fn into_actions(self) -> Vec<ItemAction> {
        self.actions
    }
}

/// Component-like collaborator that answers [`GetItemActionsEvent`]s.
pub trait ItemActionSource: Send + Sync {
    fn get_item_actions(&self, event: &mut GetItemActionsEvent, world: &ActionWorld);
}

/// Ordered set of item action sources consulted on every equip.
#[derive(Clone, Default)]
pub struct ItemActionSources {
    sources: Vec<Arc<dyn ItemActionSource>>,
}

impl ItemActionSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sources with [`ResidentActions`] pre-registered.
    pub fn with_defaults() -> Self {
        let mut sources = Self::new();
        sources.push(Arc::new(ResidentActions));
        sources
    }

    pub fn push(&mut self, source: Arc<dyn ItemActionSource>) {
        self.sources.push(source);
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub(crate) fn collect(&self, event: &mut GetItemActionsEvent, world: &ActionWorld) {
        for source in &self.sources {
            source.get_item_actions(event, world);
        }
    }
}

impl std::fmt::Debug for ItemActionSources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemActionSources")
            .field("sources", &self.sources.len())
            .finish()
    }
}

/// Contributes every record already resting in the item's container.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResidentActions;

impl ItemActionSource for ResidentActions {
    fn get_item_actions(&self, event: &mut GetItemActionsEvent, world: &ActionWorld) {
        if let Some(container) = world.container(event.item) {
            for record in container.records() {
                event.add_record(record);
            }
        }
    }
}

/// Actions an item provides while equipped in one of `slots`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProvidedActions {
    pub slots: SlotFlags,
    pub prototypes: Vec<PrototypeId>,
}

/// Data-driven source: per-item prototype lists gated by slot.
#[derive(Clone, Debug, Default)]
pub struct SlotActionTable {
    items: BTreeMap<EntityId, ProvidedActions>,
}

impl SlotActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: EntityId, provided: ProvidedActions) {
        self.items.insert(item, provided);
    }

    pub fn remove(&mut self, item: EntityId) -> Option<ProvidedActions> {
        self.items.remove(&item)
    }

    pub fn contains(&self, item: EntityId) -> bool {
        self.items.contains_key(&item)
    }
}

impl ItemActionSource for SlotActionTable {
    fn get_item_actions(&self, event: &mut GetItemActionsEvent, _world: &ActionWorld) {
        let Some(provided) = self.items.get(&event.item) else {
            return;
        };
        if !provided.slots.intersects(event.slot) {
            return;
        }
        for prototype in &provided.prototypes {
            event.add_prototype(prototype.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_table_respects_slots() {
        let item = EntityId(3);
        let mut table = SlotActionTable::new();
        table.insert(
            item,
            ProvidedActions {
                slots: SlotFlags::HEAD | SlotFlags::EYES,
                prototypes: vec![PrototypeId::from("ToggleVisor")],
            },
        );
        let world = ActionWorld::server();

        let mut in_hand = GetItemActionsEvent::new(item, EntityId(1), SlotFlags::HANDS);
        table.get_item_actions(&mut in_hand, &world);
        assert!(in_hand.is_empty());

        let mut worn = GetItemActionsEvent::new(item, EntityId(1), SlotFlags::EYES);
        table.get_item_actions(&mut worn, &world);
        assert_eq!(
            worn.actions(),
            &[ItemAction::Prototype(PrototypeId::from("ToggleVisor"))]
        );
    }

    #[test]
    fn worn_slots_exclude_hands_and_pockets() {
        assert!(SlotFlags::WORN.contains(SlotFlags::HEAD | SlotFlags::FEET));
        assert!(!SlotFlags::WORN.intersects(SlotFlags::HANDS | SlotFlags::POCKET));
    }
}
