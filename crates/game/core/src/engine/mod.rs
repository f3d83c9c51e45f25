//! Grant lifecycle and execution pipeline.
//!
//! The [`ActionEngine`] is the authoritative writer of grant state. It
//! attaches records to performers, runs execution requests through the gating
//! and targeting pipeline, and owns the cooldown/charge/toggle state machine.
//! Record existence and container membership belong to the
//! [`ContainerManager`]; tier replacement belongs to the [`UpgradeEngine`].

mod container;
mod equip;
mod handlers;
mod sweep;
mod upgrade;

pub use container::ContainerManager;
pub use handlers::{ActionHandler, HandlerRegistry};
pub use upgrade::UpgradeEngine;

use std::time::Duration;

use tracing::{debug, error};

use crate::action::{ActionError, ExecutionOutcome, ExecutionRequest, GrantError};
use crate::action::execute;
use crate::env::ActionEnv;
use crate::replication::RecordFields;
use crate::state::{ActionWorld, Cooldown, EntityId, GameTime, RecordId};

/// Engine that manages grants and executes action requests.
///
/// Borrowing the world mutably for the lifetime of the engine keeps every
/// write to `attached_entity` and the grant ledgers in one place.
pub struct ActionEngine<'a> {
    world: &'a mut ActionWorld,
    env: ActionEnv<'a>,
}

impl<'a> ActionEngine<'a> {
    pub fn new(world: &'a mut ActionWorld, env: ActionEnv<'a>) -> Self {
        Self { world, env }
    }

    pub fn world(&self) -> &ActionWorld {
        &*self.world
    }

    // ------------------------------------------------------------------------
    // Grants
    // ------------------------------------------------------------------------

    /// Grants `record` to `performer`.
    ///
    /// Granting a record that is already attached to `performer` is a no-op.
    /// A record attached to someone else is moved over.
    ///
    /// # Errors
    ///
    /// Fails, leaving the world unchanged, if the record does not exist or
    /// rests in no container.
    pub fn grant(&mut self, performer: EntityId, record: RecordId) -> Result<(), GrantError> {
        let Some(entry) = self.world.record(record) else {
            error!(%record, %performer, "grant of unknown record");
            return Err(GrantError::RecordNotFound(record));
        };
        if entry.container().is_none() {
            error!(%record, %performer, "grant of record that rests in no container");
            return Err(GrantError::NoContainer { record, performer });
        }

        match entry.attached_entity() {
            Some(current) if current == performer => return Ok(()),
            Some(_) => {
                self.world.unlink_ledger(record);
            }
            None => {}
        }
        self.world.link_ledger(record, performer);
        self.world.debug_audit();

        debug!(%record, %performer, "granted action");
        Ok(())
    }

    /// Grants every record in `records` that rests in `provider`.
    ///
    /// Records resting elsewhere are skipped and logged. Returns the number of
    /// records granted.
    pub fn grant_all(
        &mut self,
        performer: EntityId,
        records: impl IntoIterator<Item = RecordId>,
        provider: EntityId,
    ) -> usize {
        let mut granted = 0;
        for record in records {
            let container = self.world.record(record).and_then(|r| r.container());
            if container != Some(provider) {
                error!(%record, %provider, ?container, "record is not provided by the expected holder");
                continue;
            }
            if self.grant(performer, record).is_ok() {
                granted += 1;
            }
        }
        granted
    }

    /// Revokes `record` from `performer`. Returns false (a no-op) if the
    /// record was not granted to that performer.
    pub fn revoke(&mut self, performer: EntityId, record: RecordId) -> bool {
        if !self.world.is_granted_to(record, performer) {
            return false;
        }
        self.revoke_record(record).is_some()
    }

    /// Revokes `record` from whoever holds the grant, returning that performer.
    pub fn revoke_record(&mut self, record: RecordId) -> Option<EntityId> {
        let performer = self.world.unlink_ledger(record)?;
        self.world.debug_audit();
        debug!(%record, %performer, "revoked action");
        Some(performer)
    }

    /// Revokes every record granted to `performer` that rests in `provider`.
    pub fn revoke_all_from(&mut self, performer: EntityId, provider: EntityId) -> usize {
        let provided: Vec<RecordId> = self
            .granted(performer)
            .into_iter()
            .filter(|id| {
                self.world
                    .record(*id)
                    .is_some_and(|r| r.container() == Some(provider))
            })
            .collect();
        for record in &provided {
            self.revoke_record(*record);
        }
        provided.len()
    }

    /// Revokes every record granted to `performer`.
    pub fn revoke_all(&mut self, performer: EntityId) -> usize {
        let granted = self.granted(performer);
        for record in &granted {
            self.revoke_record(*record);
        }
        granted.len()
    }

    fn granted(&self, performer: EntityId) -> Vec<RecordId> {
        self.world
            .ledger(performer)
            .map(|ledger| ledger.records().collect())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------------

    /// Runs an execution request from `performer` at simulation time `now`.
    ///
    /// Rejections leave the world untouched. An `Unhandled` outcome also
    /// leaves it untouched.
    pub fn execute(
        &mut self,
        performer: EntityId,
        request: &ExecutionRequest,
        now: GameTime,
        handlers: &HandlerRegistry,
    ) -> Result<ExecutionOutcome, ActionError> {
        execute::run(&mut *self.world, &self.env, handlers, performer, request, now)
    }

    /// Dispatches an already validated record, skipping membership, gating and
    /// targeting (used by delayed effects that re-validated themselves).
    pub fn perform(
        &mut self,
        performer: EntityId,
        request: &ExecutionRequest,
        now: GameTime,
        handlers: &HandlerRegistry,
    ) -> Result<ExecutionOutcome, ActionError> {
        execute::perform(&mut *self.world, handlers, performer, request, now)
    }

    // ------------------------------------------------------------------------
    // Field setters
    // ------------------------------------------------------------------------

    pub fn set_enabled(&mut self, record: RecordId, enabled: bool) -> bool {
        self.update(record, RecordFields::ENABLED, |r| {
            std::mem::replace(&mut r.enabled, enabled) != enabled
        })
    }

    pub fn set_toggled(&mut self, record: RecordId, toggled: bool) -> bool {
        self.update(record, RecordFields::TOGGLED, |r| {
            std::mem::replace(&mut r.toggled, toggled) != toggled
        })
    }

    pub fn set_charges(&mut self, record: RecordId, charges: Option<i32>) -> bool {
        self.update(record, RecordFields::CHARGES, |r| {
            std::mem::replace(&mut r.charges, charges) != charges
        })
    }

    pub fn set_use_delay(&mut self, record: RecordId, delay: Option<Duration>) -> bool {
        self.update(record, RecordFields::USE_DELAY, |r| {
            std::mem::replace(&mut r.use_delay, delay) != delay
        })
    }

    pub fn set_cooldown(&mut self, record: RecordId, start: GameTime, end: GameTime) -> bool {
        let cooldown = Some(Cooldown { start, end });
        self.update(record, RecordFields::COOLDOWN, |r| {
            std::mem::replace(&mut r.cooldown, cooldown) != cooldown
        })
    }

    pub fn clear_cooldown(&mut self, record: RecordId) -> bool {
        self.update(record, RecordFields::COOLDOWN, |r| r.cooldown.take().is_some())
    }

    /// Applies `change` and marks `fields` dirty if it reported a change.
    fn update(
        &mut self,
        record: RecordId,
        fields: RecordFields,
        change: impl FnOnce(&mut crate::state::ActionRecord) -> bool,
    ) -> bool {
        let Some(entry) = self.world.record_mut(record) else {
            return false;
        };
        let changed = change(entry);
        if changed {
            self.world.mark_dirty(record, fields);
        }
        changed
    }
}
