//! Authoritative in-memory model of the action graph.
//!
//! [`ActionWorld`] is an arena of action records indexed by id, plus two
//! secondary indices: holder → container membership and performer → grant
//! ledger. Runtime layers query the world freely, but mutate it exclusively
//! through [`crate::ContainerManager`], [`crate::ActionEngine`] and
//! [`crate::UpgradeEngine`].
mod invariants;
pub mod types;

use std::collections::BTreeMap;

use tracing::trace;

use crate::config::ActionsConfig;
use crate::replication::{RecordFields, ReplicationQueue};

pub use invariants::InvariantViolation;
pub use types::{
    ActionContainer, ActionRecord, Cooldown, EntityId, EventKey, GameTime, GrantLedger, MapId,
    Presentation, PrototypeId, RecordId, UpgradeDescriptor, WorldPosition,
};

/// Which side of the network this world instance runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Authority {
    /// Authoritative server: may spawn anywhere, replicates every change.
    Server,

    /// Predicting client replica controlling `owner`. It may only spawn into
    /// `owner`'s own container and never replicates.
    Client { owner: EntityId },
}

impl Authority {
    pub fn is_server(&self) -> bool {
        matches!(self, Authority::Server)
    }

    /// Returns true if this side may spawn records into `holder`.
    pub fn may_spawn_into(&self, holder: EntityId) -> bool {
        match self {
            Authority::Server => true,
            Authority::Client { owner } => *owner == holder,
        }
    }
}

/// Arena of action records with container and ledger indices.
#[derive(Clone, Debug)]
pub struct ActionWorld {
    authority: Authority,
    config: ActionsConfig,

    /// Sequential entity id allocator (monotonically increasing, never reused).
    next_entity_id: u32,

    records: BTreeMap<RecordId, ActionRecord>,
    containers: BTreeMap<EntityId, ActionContainer>,
    ledgers: BTreeMap<EntityId, GrantLedger>,

    replication: ReplicationQueue,
}

impl ActionWorld {
    pub fn new(authority: Authority, config: ActionsConfig) -> Self {
        let next_entity_id = match authority {
            Authority::Server => 1,
            Authority::Client { .. } => EntityId::CLIENT_BASE,
        };
        Self {
            authority,
            config,
            next_entity_id,
            records: BTreeMap::new(),
            containers: BTreeMap::new(),
            ledgers: BTreeMap::new(),
            replication: ReplicationQueue::default(),
        }
    }

    /// Creates an authoritative world with default configuration.
    pub fn server() -> Self {
        Self::new(Authority::Server, ActionsConfig::default())
    }

    /// Creates a client replica controlling `owner`.
    pub fn client(owner: EntityId) -> Self {
        Self::new(Authority::Client { owner }, ActionsConfig::default())
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn config(&self) -> &ActionsConfig {
        &self.config
    }

    /// Allocates a new unique EntityId for a holder, performer or record.
    ///
    /// # Panics
    ///
    /// Panics if the id space is exhausted.
    pub fn allocate_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id = self
            .next_entity_id
            .checked_add(1)
            .expect("EntityId overflow");
        id
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn record(&self, id: RecordId) -> Option<&ActionRecord> {
        self.records.get(&id)
    }

    pub fn contains_record(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn records(&self) -> impl Iterator<Item = &ActionRecord> + '_ {
        self.records.values()
    }

    pub fn container(&self, holder: EntityId) -> Option<&ActionContainer> {
        self.containers.get(&holder)
    }

    pub fn containers(&self) -> impl Iterator<Item = &ActionContainer> + '_ {
        self.containers.values()
    }

    pub fn ledger(&self, performer: EntityId) -> Option<&GrantLedger> {
        self.ledgers.get(&performer)
    }

    pub fn ledgers(&self) -> impl Iterator<Item = &GrantLedger> + '_ {
        self.ledgers.values()
    }

    /// Returns true if `record` is currently granted to `performer`.
    pub fn is_granted_to(&self, record: RecordId, performer: EntityId) -> bool {
        self.ledgers
            .get(&performer)
            .is_some_and(|ledger| ledger.contains(record))
    }

    /// Records granted to `performer`, highest priority first.
    pub fn granted_by_priority(&self, performer: EntityId) -> Vec<&ActionRecord> {
        let mut granted: Vec<&ActionRecord> = self
            .ledgers
            .get(&performer)
            .into_iter()
            .flat_map(|ledger| ledger.records())
            .filter_map(|id| self.records.get(&id))
            .collect();
        granted.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        granted
    }

    // ------------------------------------------------------------------------
    // Index writers (crate-private; callers keep both sides in step)
    // ------------------------------------------------------------------------

    pub(crate) fn record_mut(&mut self, id: RecordId) -> Option<&mut ActionRecord> {
        self.records.get_mut(&id)
    }

    pub(crate) fn insert_record(&mut self, record: ActionRecord) {
        let id = record.id;
        debug_assert!(record.container.is_none() && record.attached_entity.is_none());
        self.records.insert(id, record);
        self.mark_dirty(id, RecordFields::all());
    }

    /// Removes a fully detached record from the arena.
    pub(crate) fn take_record(&mut self, id: RecordId) -> Option<ActionRecord> {
        let record = self.records.remove(&id)?;
        debug_assert!(record.container.is_none() && record.attached_entity.is_none());
        if self.authority.is_server() && !record.client_exclusive {
            self.replication.remove(id);
        }
        Some(record)
    }

    /// Creates the holder's container if missing.
    pub(crate) fn ensure_container(
        &mut self,
        holder: EntityId,
        capacity: Option<usize>,
    ) -> &mut ActionContainer {
        let default_capacity = self.config.default_container_capacity;
        self.containers
            .entry(holder)
            .or_insert_with(|| ActionContainer::new(holder, capacity.or(default_capacity)))
    }

    pub(crate) fn drop_container(&mut self, holder: EntityId) -> Option<ActionContainer> {
        self.containers.remove(&holder)
    }

    pub(crate) fn drop_ledger(&mut self, performer: EntityId) -> Option<GrantLedger> {
        let ledger = self.ledgers.remove(&performer)?;
        self.replication.mark_ledger(performer);
        Some(ledger)
    }

    /// Places a record that rests nowhere into `holder`'s container.
    pub(crate) fn link_container(&mut self, record: RecordId, holder: EntityId) {
        let Some(entry) = self.records.get_mut(&record) else {
            return;
        };
        debug_assert!(entry.container.is_none(), "record {record} already contained");
        entry.container = Some(holder);
        self.ensure_container(holder, None).insert(record);
        self.mark_dirty(record, RecordFields::CONTAINER);
        trace!(%record, %holder, "record linked to container");
    }

    /// Takes a record out of its container, returning the former holder.
    pub(crate) fn unlink_container(&mut self, record: RecordId) -> Option<EntityId> {
        let entry = self.records.get_mut(&record)?;
        debug_assert!(
            entry.attached_entity.is_none(),
            "record {record} must be revoked before leaving its container"
        );
        let holder = entry.container.take()?;
        if let Some(container) = self.containers.get_mut(&holder) {
            container.remove(record);
        }
        self.mark_dirty(record, RecordFields::CONTAINER);
        trace!(%record, %holder, "record unlinked from container");
        Some(holder)
    }

    /// Moves a contained record to another container without touching its grant.
    pub(crate) fn relink_container(&mut self, record: RecordId, holder: EntityId) {
        let Some(entry) = self.records.get_mut(&record) else {
            return;
        };
        let previous = entry.container.replace(holder);
        if let Some(previous) = previous
            && let Some(container) = self.containers.get_mut(&previous)
        {
            container.remove(record);
        }
        self.ensure_container(holder, None).insert(record);
        self.mark_dirty(record, RecordFields::CONTAINER);
    }

    /// Attaches a contained, unattached record to `performer`'s ledger.
    pub(crate) fn link_ledger(&mut self, record: RecordId, performer: EntityId) {
        let Some(entry) = self.records.get_mut(&record) else {
            return;
        };
        debug_assert!(entry.container.is_some(), "granting uncontained record {record}");
        debug_assert!(entry.attached_entity.is_none(), "record {record} already attached");
        entry.attached_entity = Some(performer);
        self.ledgers
            .entry(performer)
            .or_insert_with(|| GrantLedger::new(performer))
            .insert(record);
        self.mark_dirty(record, RecordFields::ATTACHED);
        self.replication.mark_ledger(performer);
    }

    /// Detaches a record from its performer's ledger, returning the performer.
    pub(crate) fn unlink_ledger(&mut self, record: RecordId) -> Option<EntityId> {
        let entry = self.records.get_mut(&record)?;
        let performer = entry.attached_entity.take()?;
        if let Some(ledger) = self.ledgers.get_mut(&performer) {
            ledger.remove(record);
        }
        self.mark_dirty(record, RecordFields::ATTACHED);
        self.replication.mark_ledger(performer);
        Some(performer)
    }

    // ------------------------------------------------------------------------
    // Replication
    // ------------------------------------------------------------------------

    /// Queues changed fields of a record for replication to observers.
    ///
    /// Client replicas and client-exclusive records never replicate.
    pub(crate) fn mark_dirty(&mut self, record: RecordId, fields: RecordFields) {
        if !self.authority.is_server() {
            return;
        }
        if self.records.get(&record).is_some_and(|r| r.client_exclusive) {
            return;
        }
        self.replication.mark(record, fields);
    }

    pub(crate) fn replication_mut(&mut self) -> &mut ReplicationQueue {
        &mut self.replication
    }

    /// Returns true if changes are waiting to be replicated.
    pub fn has_pending_replication(&self) -> bool {
        !self.replication.is_empty()
    }
}

impl Default for ActionWorld {
    fn default() -> Self {
        Self::server()
    }
}
