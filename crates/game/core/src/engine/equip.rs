//! Equipment and innate grants.

use tracing::{debug, error};

use crate::action::{ContainerError, GetItemActionsEvent, ItemAction, ItemActionSources, SlotFlags};
use crate::state::{EntityId, PrototypeId, RecordId};

use super::{ActionEngine, ContainerManager};

impl<'a> ActionEngine<'a> {
    /// Grants `performer` every action `item` contributes when equipped in `slot`.
    ///
    /// Contributions that cannot be materialized are logged and skipped.
    /// Returns the records granted.
    pub fn equip(
        &mut self,
        performer: EntityId,
        item: EntityId,
        slot: SlotFlags,
        sources: &ItemActionSources,
    ) -> Vec<RecordId> {
        let mut event = GetItemActionsEvent::new(item, performer, slot);
        sources.collect(&mut event, &*self.world);
        if event.is_empty() {
            return Vec::new();
        }

        let mut granted = Vec::new();
        for contribution in event.into_actions() {
            let record = match self.materialize(item, &contribution) {
                Ok(record) => record,
                Err(err) => {
                    error!(%item, ?contribution, %err, "item action could not be materialized");
                    continue;
                }
            };
            if granted.contains(&record) {
                continue;
            }
            match self.grant(performer, record) {
                Ok(()) => granted.push(record),
                Err(err) => error!(%item, %record, %err, "failed to grant item action"),
            }
        }

        debug!(%performer, %item, ?slot, granted = granted.len(), "equipped item actions");
        granted
    }

    /// Revokes every action `item` provides to `performer`.
    pub fn unequip(&mut self, performer: EntityId, item: EntityId) -> usize {
        let revoked = self.revoke_all_from(performer, item);
        debug!(%performer, %item, revoked, "unequipped item actions");
        revoked
    }

    /// Ensures each prototype inside the performer's own container and grants
    /// it. Records the performer already holds for a prototype are reused.
    pub fn grant_innate(
        &mut self,
        performer: EntityId,
        prototypes: &[PrototypeId],
    ) -> Result<Vec<RecordId>, ContainerError> {
        let mut records = Vec::with_capacity(prototypes.len());
        for prototype in prototypes {
            let record = self.materialize(performer, &ItemAction::Prototype(prototype.clone()))?;
            if let Err(err) = self.grant(performer, record) {
                error!(%performer, %record, %err, "failed to grant innate action");
                continue;
            }
            records.push(record);
        }
        Ok(records)
    }

    fn materialize(
        &mut self,
        holder: EntityId,
        contribution: &ItemAction,
    ) -> Result<RecordId, ContainerError> {
        match contribution {
            ItemAction::Record(record) => {
                ContainerManager::new(&mut *self.world, self.env).add(holder, *record)?;
                Ok(*record)
            }
            ItemAction::Prototype(prototype) => {
                let existing = self.world.container(holder).and_then(|container| {
                    container.records().find(|id| {
                        self.world
                            .record(*id)
                            .is_some_and(|r| r.prototype() == prototype)
                    })
                });
                ContainerManager::new(&mut *self.world, self.env).ensure(
                    holder,
                    existing,
                    Some(prototype),
                )
            }
        }
    }
}
