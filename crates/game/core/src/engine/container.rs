//! Container manager: the only path that creates records or changes which
//! container a record rests in.

use tracing::{debug, error};

use crate::action::ContainerError;
use crate::env::ActionEnv;
use crate::state::{ActionRecord, ActionWorld, EntityId, PrototypeId, RecordId};

use super::ActionEngine;

/// Spawns, moves and destroys action records inside holder containers.
///
/// Grants are never broken by a plain container move. Operations that must
/// take a record out of every container (`remove`, `delete_record`) revoke it
/// through the [`ActionEngine`] first, so a granted record always rests
/// somewhere.
pub struct ContainerManager<'a> {
    world: &'a mut ActionWorld,
    env: ActionEnv<'a>,
}

impl<'a> ContainerManager<'a> {
    pub fn new(world: &'a mut ActionWorld, env: ActionEnv<'a>) -> Self {
        Self { world, env }
    }

    /// Creates `holder`'s container if it does not exist yet.
    ///
    /// `capacity` only applies to a newly created container.
    pub fn ensure_container(&mut self, holder: EntityId, capacity: Option<usize>) {
        self.world.ensure_container(holder, capacity);
    }

    /// Returns a record resting in `holder`, spawning one from `prototype` if
    /// `existing` does not name a usable record.
    ///
    /// Calling this again with the returned id is a no-op that returns the
    /// same id. A detached `existing` record is adopted into `holder`.
    ///
    /// # Errors
    ///
    /// - `ResidentElsewhere` if `existing` rests in another holder
    /// - `MissingPrototypeId` if a spawn is needed and no prototype was given
    /// - `NotAuthoritative` if this replica may not spawn into `holder`
    /// - `UnknownPrototype` / `ContainerFull` if the spawn cannot happen
    pub fn ensure(
        &mut self,
        holder: EntityId,
        existing: Option<RecordId>,
        prototype: Option<&PrototypeId>,
    ) -> Result<RecordId, ContainerError> {
        if let Some(record) = existing.and_then(|id| self.world.record(id)) {
            let id = record.id();
            return match record.container() {
                Some(current) if current == holder => Ok(id),
                Some(current) => {
                    error!(%id, %current, requested = %holder, "ensure found record in another container");
                    Err(ContainerError::ResidentElsewhere {
                        record: id,
                        current,
                        requested: holder,
                    })
                }
                None => {
                    self.add(holder, id)?;
                    Ok(id)
                }
            };
        }

        let Some(prototype) = prototype else {
            error!(%holder, "ensure called without a usable record or prototype id");
            return Err(ContainerError::MissingPrototypeId { holder });
        };
        self.spawn(holder, prototype)
    }

    /// Spawns a fresh record from `prototype` into `holder`'s container.
    pub fn spawn(
        &mut self,
        holder: EntityId,
        prototype: &PrototypeId,
    ) -> Result<RecordId, ContainerError> {
        if !self.world.authority().may_spawn_into(holder) {
            return Err(ContainerError::NotAuthoritative { holder });
        }

        let template = self
            .env
            .prototypes()?
            .prototype(prototype)
            .ok_or_else(|| {
                error!(%prototype, "unknown action prototype");
                ContainerError::UnknownPrototype(prototype.clone())
            })?;

        self.check_capacity(holder, 1)?;

        let id = self.world.allocate_entity_id();
        self.world
            .insert_record(ActionRecord::from_prototype(id, template));
        self.world.link_container(id, holder);
        self.world.debug_audit();

        debug!(record = %id, %holder, %prototype, "spawned action record");
        Ok(id)
    }

    /// Moves an existing record into `holder`'s container.
    ///
    /// If the record rested elsewhere it is taken out of that container first.
    /// Its grant, if any, is left untouched.
    pub fn add(&mut self, holder: EntityId, record: RecordId) -> Result<(), ContainerError> {
        let current = self
            .world
            .record(record)
            .ok_or(ContainerError::RecordNotFound(record))?
            .container();

        match current {
            Some(current) if current == holder => return Ok(()),
            Some(_) => {
                self.check_capacity(holder, 1)?;
                self.world.relink_container(record, holder);
            }
            None => {
                self.check_capacity(holder, 1)?;
                self.world.link_container(record, holder);
            }
        }
        self.world.debug_audit();

        debug!(%record, %holder, "record added to container");
        Ok(())
    }

    /// Takes a record out of its container, revoking it first if granted.
    ///
    /// The record stays alive, detached from every holder.
    pub fn remove(&mut self, record: RecordId) -> Result<(), ContainerError> {
        if !self.world.contains_record(record) {
            return Err(ContainerError::RecordNotFound(record));
        }

        self.engine().revoke_record(record);
        if let Some(holder) = self.world.unlink_container(record) {
            debug!(%record, %holder, "record removed from container");
        }
        self.world.debug_audit();
        Ok(())
    }

    /// Moves a record to another holder, re-granting it to the same performer.
    pub fn transfer(&mut self, record: RecordId, to_holder: EntityId) -> Result<(), ContainerError> {
        let current = self
            .world
            .record(record)
            .ok_or(ContainerError::RecordNotFound(record))?
            .container();
        if current == Some(to_holder) {
            return Ok(());
        }

        self.check_capacity(to_holder, 1)?;
        self.move_regranting(record, to_holder);
        self.world.debug_audit();
        Ok(())
    }

    /// Moves every record from one holder to another, preserving grants.
    ///
    /// Capacity is checked for the whole batch before anything moves. Returns
    /// the number of records moved.
    pub fn transfer_all(
        &mut self,
        from_holder: EntityId,
        to_holder: EntityId,
    ) -> Result<usize, ContainerError> {
        if from_holder == to_holder {
            return Ok(0);
        }

        let records: Vec<RecordId> = self
            .world
            .container(from_holder)
            .map(|c| c.records().collect())
            .unwrap_or_default();
        if records.is_empty() {
            return Ok(0);
        }

        self.check_capacity(to_holder, records.len())?;
        for record in &records {
            self.move_regranting(*record, to_holder);
        }
        self.world.debug_audit();

        debug!(%from_holder, %to_holder, moved = records.len(), "transferred all records");
        Ok(records.len())
    }

    /// Destroys a record: revoke, take out of its container, drop from the arena.
    pub fn delete_record(&mut self, record: RecordId) -> Result<(), ContainerError> {
        if !self.world.contains_record(record) {
            return Err(ContainerError::RecordNotFound(record));
        }

        self.engine().revoke_record(record);
        self.world.unlink_container(record);
        self.world.take_record(record);
        self.world.debug_audit();

        debug!(%record, "deleted action record");
        Ok(())
    }

    /// Tears down everything attached to a destroyed entity.
    ///
    /// Records resting in the holder are deleted. If the entity was also a
    /// performer, its grants are revoked (the records stay in their own
    /// containers) and its ledger is dropped. Returns the number of records
    /// deleted.
    pub fn destroy_holder(&mut self, holder: EntityId) -> usize {
        let resident: Vec<RecordId> = self
            .world
            .container(holder)
            .map(|c| c.records().collect())
            .unwrap_or_default();

        for record in &resident {
            self.engine().revoke_record(*record);
            self.world.unlink_container(*record);
            self.world.take_record(*record);
        }
        self.world.drop_container(holder);

        let revoked = self.engine().revoke_all(holder);
        self.world.drop_ledger(holder);
        self.world.debug_audit();

        debug!(%holder, deleted = resident.len(), revoked, "destroyed holder");
        resident.len()
    }

    fn move_regranting(&mut self, record: RecordId, to_holder: EntityId) {
        let performer = self.engine().revoke_record(record);
        if self.world.record(record).and_then(|r| r.container()).is_some() {
            self.world.relink_container(record, to_holder);
        } else {
            self.world.link_container(record, to_holder);
        }
        if let Some(performer) = performer
            && let Err(err) = self.engine().grant(performer, record)
        {
            error!(%record, %performer, %err, "failed to re-grant transferred record");
        }
    }

    fn check_capacity(&self, holder: EntityId, incoming: usize) -> Result<(), ContainerError> {
        let free = match self.world.container(holder) {
            Some(container) => container.free_slots(),
            None => self.world.config().default_container_capacity,
        };
        match free {
            Some(free) if free < incoming => {
                debug!(%holder, incoming, free, "container full");
                Err(ContainerError::ContainerFull { holder })
            }
            _ => Ok(()),
        }
    }

    fn engine(&mut self) -> ActionEngine<'_> {
        ActionEngine::new(&mut *self.world, self.env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{ActionPrototype, Env, PrototypeTable};
    use crate::state::Authority;
    use crate::config::ActionsConfig;

    fn table() -> PrototypeTable {
        PrototypeTable::new()
            .with(ActionPrototype::instant("Blink"))
            .with(ActionPrototype::instant("Jump"))
    }

    fn env(table: &PrototypeTable) -> ActionEnv<'_> {
        Env::new(Some(table as &dyn crate::env::PrototypeOracle), None, None)
    }

    #[test]
    fn ensure_is_idempotent() {
        let table = table();
        let mut world = ActionWorld::server();
        let holder = world.allocate_entity_id();
        let mut manager = ContainerManager::new(&mut world, env(&table));

        let record = manager
            .ensure(holder, None, Some(&PrototypeId::from("Blink")))
            .unwrap();
        let again = manager
            .ensure(holder, Some(record), Some(&PrototypeId::from("Blink")))
            .unwrap();

        assert_eq!(record, again);
        assert_eq!(world.records().count(), 1);
        assert_eq!(world.record(record).unwrap().container(), Some(holder));
    }

    #[test]
    fn ensure_without_prototype_fails() {
        let table = table();
        let mut world = ActionWorld::server();
        let holder = world.allocate_entity_id();
        let mut manager = ContainerManager::new(&mut world, env(&table));

        let err = manager.ensure(holder, Some(EntityId(999)), None).unwrap_err();
        assert_eq!(err, ContainerError::MissingPrototypeId { holder });
        assert_eq!(world.records().count(), 0);
    }

    #[test]
    fn ensure_rejects_record_resident_elsewhere() {
        let table = table();
        let mut world = ActionWorld::server();
        let a = world.allocate_entity_id();
        let b = world.allocate_entity_id();
        let mut manager = ContainerManager::new(&mut world, env(&table));

        let record = manager.spawn(a, &PrototypeId::from("Blink")).unwrap();
        let err = manager.ensure(b, Some(record), None).unwrap_err();
        assert!(matches!(err, ContainerError::ResidentElsewhere { current, .. } if current == a));
    }

    #[test]
    fn client_may_only_spawn_into_its_owner() {
        let table = table();
        let owner = EntityId(5);
        let mut world = ActionWorld::client(owner);
        let mut manager = ContainerManager::new(&mut world, env(&table));

        let local = manager.spawn(owner, &PrototypeId::from("Blink")).unwrap();
        assert!(local.is_client_local());

        let err = manager
            .spawn(EntityId(6), &PrototypeId::from("Blink"))
            .unwrap_err();
        assert_eq!(err, ContainerError::NotAuthoritative { holder: EntityId(6) });
    }

    #[test]
    fn add_moves_between_containers_without_duplication() {
        let table = table();
        let mut world = ActionWorld::server();
        let a = world.allocate_entity_id();
        let b = world.allocate_entity_id();
        let performer = world.allocate_entity_id();
        let record = {
            let mut manager = ContainerManager::new(&mut world, env(&table));
            manager.spawn(a, &PrototypeId::from("Blink")).unwrap()
        };
        ActionEngine::new(&mut world, env(&table))
            .grant(performer, record)
            .unwrap();

        ContainerManager::new(&mut world, env(&table))
            .add(b, record)
            .unwrap();

        assert!(!world.container(a).unwrap().contains(record));
        assert!(world.container(b).unwrap().contains(record));
        // Moving containers does not break the grant.
        assert!(world.is_granted_to(record, performer));
        world.check_invariants().unwrap();
    }

    #[test]
    fn remove_revokes_before_detaching() {
        let table = table();
        let mut world = ActionWorld::server();
        let holder = world.allocate_entity_id();
        let performer = world.allocate_entity_id();
        let record = ContainerManager::new(&mut world, env(&table))
            .spawn(holder, &PrototypeId::from("Blink"))
            .unwrap();
        ActionEngine::new(&mut world, env(&table))
            .grant(performer, record)
            .unwrap();

        ContainerManager::new(&mut world, env(&table))
            .remove(record)
            .unwrap();

        let state = world.record(record).unwrap();
        assert_eq!(state.container(), None);
        assert_eq!(state.attached_entity(), None);
        assert!(world.ledger(performer).unwrap().is_empty());
        world.check_invariants().unwrap();
    }

    #[test]
    fn transfer_all_keeps_grants() {
        let table = table();
        let mut world = ActionWorld::server();
        let mind = world.allocate_entity_id();
        let body = world.allocate_entity_id();
        let performer = world.allocate_entity_id();

        let (blink, jump) = {
            let mut manager = ContainerManager::new(&mut world, env(&table));
            (
                manager.spawn(mind, &PrototypeId::from("Blink")).unwrap(),
                manager.spawn(mind, &PrototypeId::from("Jump")).unwrap(),
            )
        };
        ActionEngine::new(&mut world, env(&table))
            .grant(performer, blink)
            .unwrap();

        let moved = ContainerManager::new(&mut world, env(&table))
            .transfer_all(mind, body)
            .unwrap();

        assert_eq!(moved, 2);
        assert!(world.container(mind).unwrap().is_empty());
        assert_eq!(world.record(jump).unwrap().container(), Some(body));
        assert!(world.is_granted_to(blink, performer));
        assert_eq!(world.record(jump).unwrap().attached_entity(), None);
        world.check_invariants().unwrap();
    }

    #[test]
    fn transfer_all_checks_capacity_up_front() {
        let table = table();
        let mut world = ActionWorld::new(Authority::Server, ActionsConfig::default());
        let from = world.allocate_entity_id();
        let to = world.allocate_entity_id();
        {
            let mut manager = ContainerManager::new(&mut world, env(&table));
            manager.spawn(from, &PrototypeId::from("Blink")).unwrap();
            manager.spawn(from, &PrototypeId::from("Jump")).unwrap();
            manager.ensure_container(to, Some(1));
        }

        let err = ContainerManager::new(&mut world, env(&table))
            .transfer_all(from, to)
            .unwrap_err();

        assert_eq!(err, ContainerError::ContainerFull { holder: to });
        assert_eq!(world.container(from).unwrap().len(), 2);
        assert!(world.container(to).unwrap().is_empty());
    }

    #[test]
    fn destroy_holder_deletes_residents_and_revokes_grants() {
        let table = table();
        let mut world = ActionWorld::server();
        let item = world.allocate_entity_id();
        let performer = world.allocate_entity_id();
        let (from_item, innate) = {
            let mut manager = ContainerManager::new(&mut world, env(&table));
            (
                manager.spawn(item, &PrototypeId::from("Blink")).unwrap(),
                manager.spawn(performer, &PrototypeId::from("Jump")).unwrap(),
            )
        };
        {
            let mut engine = ActionEngine::new(&mut world, env(&table));
            engine.grant(performer, from_item).unwrap();
            engine.grant(performer, innate).unwrap();
        }

        assert_eq!(
            ContainerManager::new(&mut world, env(&table)).destroy_holder(item),
            1
        );
        assert!(!world.contains_record(from_item));
        assert!(world.is_granted_to(innate, performer));

        ContainerManager::new(&mut world, env(&table)).destroy_holder(performer);
        assert!(world.ledger(performer).is_none());
        assert_eq!(world.records().count(), 0);
        world.check_invariants().unwrap();
    }
}
