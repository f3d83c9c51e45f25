//! Client-side application of replication batches.
//!
//! The replica goes through the same index writers as the authoritative
//! world, so its container and ledger indices stay consistent with the
//! records it holds.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::state::{ActionRecord, ActionWorld, RecordId};

use super::{NetEntity, NetEntityMap, RecordState, ReplicationBatch, ReplicationError};

impl ActionWorld {
    /// Applies an authoritative batch to this client replica.
    ///
    /// Returns the local ids of every record that was created or updated.
    ///
    /// # Errors
    ///
    /// Fails on a server world, on a record granted without a container, and
    /// when a replicated ledger disagrees with the replica after the update.
    pub fn apply_replication(
        &mut self,
        map: &mut NetEntityMap,
        batch: &ReplicationBatch,
    ) -> Result<Vec<RecordId>, ReplicationError> {
        if self.authority().is_server() {
            return Err(ReplicationError::NotReplica);
        }

        for net in &batch.removed {
            let Some(local) = map.forget(*net) else {
                continue;
            };
            if self.drop_replicated(local) {
                debug!(record = %local, %net, "replica dropped removed record");
            }
        }

        let mut updated = Vec::with_capacity(batch.records.len());
        for state in &batch.records {
            updated.push(self.apply_record(map, state)?);
        }

        for ledger in &batch.ledgers {
            let performer = map.resolve(ledger.performer);
            let expected: BTreeSet<RecordId> =
                ledger.records.iter().map(|net| map.resolve(*net)).collect();
            let actual: BTreeSet<RecordId> = self
                .ledger(performer)
                .into_iter()
                .flat_map(|l| l.records())
                .filter(|id| !id.is_client_local())
                .collect();
            if expected != actual {
                warn!(%performer, ?expected, ?actual, "replicated ledger diverged");
                return Err(ReplicationError::LedgerMismatch {
                    performer: ledger.performer,
                });
            }
        }

        Ok(updated)
    }

    /// Rebuilds the replica from a full batch (see
    /// [`ActionWorld::full_replication`]). Replicated records missing from the
    /// batch are dropped; client-local records are kept.
    ///
    /// # Errors
    ///
    /// Same as [`ActionWorld::apply_replication`].
    pub fn resync_replication(
        &mut self,
        map: &mut NetEntityMap,
        batch: &ReplicationBatch,
    ) -> Result<Vec<RecordId>, ReplicationError> {
        if self.authority().is_server() {
            return Err(ReplicationError::NotReplica);
        }

        let present: BTreeSet<NetEntity> = batch.records.iter().map(|state| state.net).collect();
        let stale: Vec<RecordId> = self
            .records()
            .map(ActionRecord::id)
            .filter(|id| !id.is_client_local())
            .filter(|id| map.net(*id).is_none_or(|net| !present.contains(&net)))
            .collect();
        for local in &stale {
            if let Some(net) = map.net(*local) {
                map.forget(net);
            }
            self.drop_replicated(*local);
        }
        debug!(dropped = stale.len(), records = batch.records.len(), "replica resynchronised");

        self.apply_replication(map, batch)
    }

    fn drop_replicated(&mut self, local: RecordId) -> bool {
        if !self.contains_record(local) {
            return false;
        }
        self.unlink_ledger(local);
        self.unlink_container(local);
        self.take_record(local);
        true
    }

    fn apply_record(
        &mut self,
        map: &mut NetEntityMap,
        state: &RecordState,
    ) -> Result<RecordId, ReplicationError> {
        let id = map.resolve(state.net);
        let container = state.container.map(|net| map.resolve(net));
        let attached = state.attached_entity.map(|net| map.resolve(net));
        if attached.is_some() && container.is_none() {
            return Err(ReplicationError::OrphanGrant { record: state.net });
        }

        match self.record_mut(id) {
            Some(record) => overwrite_fields(record, state),
            None => self.insert_record(spawn_replica(id, state)),
        }

        let (current_container, current_attached) = self
            .record(id)
            .map(|r| (r.container, r.attached_entity))
            .unwrap_or_default();

        if current_attached.is_some() && current_attached != attached {
            self.unlink_ledger(id);
        }
        if current_container != container {
            match (current_container, container) {
                (_, None) => {
                    self.unlink_container(id);
                }
                (None, Some(holder)) => self.link_container(id, holder),
                (Some(_), Some(holder)) => self.relink_container(id, holder),
            }
        }
        if let Some(performer) = attached
            && current_attached != attached
        {
            self.link_ledger(id, performer);
        }

        Ok(id)
    }
}

fn spawn_replica(id: RecordId, state: &RecordState) -> ActionRecord {
    ActionRecord {
        id,
        prototype: state.prototype.clone(),
        name: state.name.clone(),
        kind: state.kind.clone(),
        enabled: state.enabled,
        toggled: state.toggled,
        cooldown: state.cooldown,
        use_delay: state.use_delay,
        charges: state.charges,
        priority: state.priority,
        check_can_interact: state.check_can_interact,
        client_exclusive: false,
        presentation: state.presentation.clone(),
        event: state.event.clone(),
        upgrade: state.upgrade.clone(),
        container: None,
        attached_entity: None,
    }
}

fn overwrite_fields(record: &mut ActionRecord, state: &RecordState) {
    record.prototype = state.prototype.clone();
    record.name = state.name.clone();
    record.kind = state.kind.clone();
    record.enabled = state.enabled;
    record.toggled = state.toggled;
    record.cooldown = state.cooldown;
    record.use_delay = state.use_delay;
    record.charges = state.charges;
    record.priority = state.priority;
    record.check_can_interact = state.check_can_interact;
    record.presentation = state.presentation.clone();
    record.event = state.event.clone();
    record.upgrade = state.upgrade.clone();
}
