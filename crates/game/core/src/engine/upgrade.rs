//! Tier replacement of action records.

use tracing::{debug, error};

use crate::action::{ContainerError, UpgradeError};
use crate::env::ActionEnv;
use crate::replication::RecordFields;
use crate::state::{ActionWorld, RecordId};

use super::{ActionEngine, ContainerManager};

/// Replaces records with higher-tier prototypes while keeping their place in
/// the container and grant graph.
pub struct UpgradeEngine<'a> {
    world: &'a mut ActionWorld,
    env: ActionEnv<'a>,
}

impl<'a> UpgradeEngine<'a> {
    pub fn new(world: &'a mut ActionWorld, env: ActionEnv<'a>) -> Self {
        Self { world, env }
    }

    /// Moves `record` to `new_level` (current level + 1 when `None`).
    ///
    /// If the level maps to no replacement, only the level counter advances
    /// and the same id is returned. Otherwise the old record is deleted and a
    /// fresh one is spawned into the same container, re-granted to the same
    /// performer, and returned. Ledger ordering is not preserved.
    ///
    /// # Errors
    ///
    /// Fails before touching the world if the record has no upgrade table,
    /// the level is not past the current one or beyond the table, or the
    /// replacement cannot be spawned.
    pub fn upgrade(
        &mut self,
        record: RecordId,
        new_level: Option<i32>,
    ) -> Result<RecordId, UpgradeError> {
        let entry = self
            .world
            .record(record)
            .ok_or(UpgradeError::RecordNotFound(record))?;
        let descriptor = entry
            .upgrade()
            .ok_or(UpgradeError::NoUpgradeDescriptor(record))?;

        let level = new_level.unwrap_or(descriptor.level + 1);
        if !descriptor.can_reach(level) {
            debug!(%record, level, max = ?descriptor.max_level(), "upgrade level out of range");
            return Err(UpgradeError::InvalidLevel { record, level });
        }

        let Some(replacement) = descriptor.replacement(level).cloned() else {
            if let Some(descriptor) = self
                .world
                .record_mut(record)
                .and_then(|r| r.upgrade.as_mut())
            {
                descriptor.level = level;
            }
            self.world.mark_dirty(record, RecordFields::UPGRADE);
            debug!(%record, level, "upgrade level advanced without replacement");
            return Ok(record);
        };

        let mut carried = descriptor.clone();
        let holder = entry.container().ok_or(UpgradeError::NoContainer(record))?;
        let performer = entry.attached_entity();

        if !self.world.authority().may_spawn_into(holder) {
            return Err(ContainerError::NotAuthoritative { holder }.into());
        }
        if self
            .env
            .prototypes()
            .map_err(ContainerError::from)?
            .prototype(&replacement)
            .is_none()
        {
            error!(%record, %replacement, "upgrade replacement prototype does not exist");
            return Err(ContainerError::UnknownPrototype(replacement).into());
        }

        let mut manager = ContainerManager::new(&mut *self.world, self.env);
        manager.delete_record(record)?;
        let upgraded = manager.ensure(holder, None, Some(&replacement))?;

        if let Some(performer) = performer
            && let Err(err) =
                ActionEngine::new(&mut *self.world, self.env).grant(performer, upgraded)
        {
            error!(%upgraded, %performer, %err, "failed to re-grant upgraded record");
        }

        if let Some(entry) = self.world.record_mut(upgraded) {
            match entry.upgrade.as_mut() {
                Some(own) => own.level = level,
                None => {
                    carried.level = level;
                    entry.upgrade = Some(carried);
                }
            }
        }
        self.world.mark_dirty(upgraded, RecordFields::UPGRADE);

        debug!(old = %record, new = %upgraded, level, %holder, "upgraded action record");
        Ok(upgraded)
    }
}
