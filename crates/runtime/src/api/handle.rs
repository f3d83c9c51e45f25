//! Cloneable façade for issuing commands to the runtime.
//!
//! [`RuntimeHandle`] hides channel plumbing and offers async helpers for every
//! container, grant, upgrade and execution operation plus event streaming.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};

use actions_core::action::ProvidedActions;
use actions_core::{
    ActionHandler, ActionRecord, ActionWorld, EntityId, EventKey, ExecutionOutcome,
    ExecutionRequest, GameTime, NetEntity, NetExecutionRequest, PrototypeId, RecordId, SlotFlags,
    WorldPosition,
};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, ReplicationPacket, Topic};
use crate::oracle::EntitySpec;
use crate::workers::{Command, HandlerTarget};

/// Client-facing handle to interact with the runtime
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl RuntimeHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    /// Sends one command and waits for the worker's reply.
    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    // ------------------------------------------------------------------------
    // World model
    // ------------------------------------------------------------------------

    /// Registers a new entity with the spatial model and returns its id.
    pub async fn spawn_entity(&self, spec: EntitySpec) -> Result<EntityId> {
        self.request(|reply| Command::SpawnEntity { spec, reply })
            .await
    }

    /// Spawns an item entity that provides `provided` while equipped.
    pub async fn spawn_item(&self, spec: EntitySpec, provided: ProvidedActions) -> Result<EntityId> {
        let item = self.spawn_entity(spec).await?;
        self.request(|reply| Command::BindItemKit {
            item,
            provided,
            reply,
        })
        .await??;
        Ok(item)
    }

    pub async fn place_entity(&self, entity: EntityId, position: WorldPosition) -> Result<()> {
        self.request(|reply| Command::PlaceEntity {
            entity,
            position,
            reply,
        })
        .await?
    }

    /// Moves `entity` into (or, with `None`, out of) a parent entity.
    pub async fn set_parent(&self, entity: EntityId, parent: Option<EntityId>) -> Result<()> {
        self.request(|reply| Command::SetParent {
            entity,
            parent,
            reply,
        })
        .await?
    }

    /// Marks `entity` as unable to interact (stunned, cuffed, ...).
    pub async fn set_blocked(&self, entity: EntityId, blocked: bool) -> Result<()> {
        self.request(|reply| Command::SetBlocked {
            entity,
            blocked,
            reply,
        })
        .await?
    }

    /// Destroys `entity`, deleting its container's records and dropping its
    /// ledger. Returns the number of records deleted.
    pub async fn despawn_entity(&self, entity: EntityId) -> Result<usize> {
        self.request(|reply| Command::DespawnEntity { entity, reply })
            .await
    }

    // ------------------------------------------------------------------------
    // Containers
    // ------------------------------------------------------------------------

    pub async fn ensure_action(
        &self,
        holder: EntityId,
        existing: Option<RecordId>,
        prototype: Option<PrototypeId>,
    ) -> Result<RecordId> {
        self.request(|reply| Command::Ensure {
            holder,
            existing,
            prototype,
            reply,
        })
        .await?
    }

    /// Spawns a record of `prototype` inside `holder`.
    pub async fn spawn_action(
        &self,
        holder: EntityId,
        prototype: impl Into<PrototypeId>,
    ) -> Result<RecordId> {
        self.ensure_action(holder, None, Some(prototype.into()))
            .await
    }

    pub async fn add_action(&self, holder: EntityId, record: RecordId) -> Result<()> {
        self.request(|reply| Command::AddAction {
            holder,
            record,
            reply,
        })
        .await?
    }

    pub async fn remove_action(&self, record: RecordId) -> Result<()> {
        self.request(|reply| Command::RemoveAction { record, reply })
            .await?
    }

    pub async fn transfer_action(&self, record: RecordId, to_holder: EntityId) -> Result<()> {
        self.request(|reply| Command::Transfer {
            record,
            to_holder,
            reply,
        })
        .await?
    }

    pub async fn transfer_all(&self, from_holder: EntityId, to_holder: EntityId) -> Result<usize> {
        self.request(|reply| Command::TransferAll {
            from_holder,
            to_holder,
            reply,
        })
        .await?
    }

    pub async fn delete_action(&self, record: RecordId) -> Result<()> {
        self.request(|reply| Command::DeleteRecord { record, reply })
            .await?
    }

    // ------------------------------------------------------------------------
    // Grants
    // ------------------------------------------------------------------------

    pub async fn grant(&self, performer: EntityId, record: RecordId) -> Result<()> {
        self.request(|reply| Command::Grant {
            performer,
            record,
            reply,
        })
        .await?
    }

    /// Returns false if `record` was not granted to `performer`.
    pub async fn revoke(&self, performer: EntityId, record: RecordId) -> Result<bool> {
        self.request(|reply| Command::Revoke {
            performer,
            record,
            reply,
        })
        .await
    }

    pub async fn revoke_all_from(&self, performer: EntityId, provider: EntityId) -> Result<usize> {
        self.request(|reply| Command::RevokeAllFrom {
            performer,
            provider,
            reply,
        })
        .await
    }

    /// Equips `item` on `performer` and grants whatever the item provides.
    pub async fn equip(
        &self,
        performer: EntityId,
        item: EntityId,
        slot: SlotFlags,
    ) -> Result<Vec<RecordId>> {
        self.request(|reply| Command::Equip {
            performer,
            item,
            slot,
            reply,
        })
        .await
    }

    pub async fn unequip(&self, performer: EntityId, item: EntityId) -> Result<usize> {
        self.request(|reply| Command::Unequip {
            performer,
            item,
            reply,
        })
        .await
    }

    /// Spawns `prototypes` inside the performer's own container and grants
    /// them.
    pub async fn grant_innate(
        &self,
        performer: EntityId,
        prototypes: Vec<PrototypeId>,
    ) -> Result<Vec<RecordId>> {
        self.request(|reply| Command::GrantInnate {
            performer,
            prototypes,
            reply,
        })
        .await?
    }

    /// Replaces `record` with the tier at `level` (or the next one).
    pub async fn upgrade(&self, record: RecordId, level: Option<i32>) -> Result<RecordId> {
        self.request(|reply| Command::Upgrade {
            record,
            level,
            reply,
        })
        .await?
    }

    // ------------------------------------------------------------------------
    // Execution and clock
    // ------------------------------------------------------------------------

    /// Runs an execution request at the current simulation time.
    pub async fn execute(
        &self,
        performer: EntityId,
        request: ExecutionRequest,
    ) -> Result<ExecutionOutcome> {
        self.request(|reply| Command::Execute {
            performer,
            request,
            reply,
        })
        .await?
    }

    /// Executes a request received over the network from `performer`.
    pub async fn submit(
        &self,
        performer: NetEntity,
        request: NetExecutionRequest,
    ) -> Result<ExecutionOutcome> {
        self.request(|reply| Command::Submit {
            performer,
            request,
            reply,
        })
        .await?
    }

    /// Advances the simulation clock, returning the new time.
    ///
    /// `advance(Duration::ZERO)` only flushes pending replication.
    pub async fn advance(&self, by: Duration) -> Result<GameTime> {
        self.request(|reply| Command::Advance { by, reply }).await
    }

    pub async fn flush(&self) -> Result<GameTime> {
        self.advance(Duration::ZERO).await
    }

    /// Registers a handler for every record raising `key`.
    pub async fn on_event(
        &self,
        key: impl Into<EventKey>,
        handler: Arc<dyn ActionHandler>,
    ) -> Result<()> {
        let target = HandlerTarget::Event(key.into());
        self.request(|reply| Command::RegisterHandler {
            target,
            handler,
            reply,
        })
        .await
    }

    /// Registers a handler for every record provided by `provider`.
    pub async fn on_provider(&self, provider: EntityId, handler: Arc<dyn ActionHandler>) -> Result<()> {
        let target = HandlerTarget::Provider(provider);
        self.request(|reply| Command::RegisterHandler {
            target,
            handler,
            reply,
        })
        .await
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub async fn query_record(&self, record: RecordId) -> Result<Option<ActionRecord>> {
        self.request(|reply| Command::QueryRecord { record, reply })
            .await
    }

    /// Records granted to `performer`, highest priority first.
    pub async fn query_ledger(&self, performer: EntityId) -> Result<Vec<RecordId>> {
        self.request(|reply| Command::QueryLedger { performer, reply })
            .await
    }

    /// Query the authoritative world (read-only snapshot)
    pub async fn snapshot(&self) -> Result<ActionWorld> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Full replicated state for an observer that fell behind the
    /// replication topic. Deltas numbered at or below the packet's sequence
    /// are already included in it.
    pub async fn resync(&self) -> Result<ReplicationPacket> {
        self.request(|reply| Command::Resync { reply }).await?
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Actions` - Execution outcomes, rejections and sweeps
    /// - `Topic::Replication` - Encoded replication batches
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use actions_runtime::Topic;
    ///
    /// let mut actions = handle.subscribe(Topic::Actions);
    /// while let Ok(event) = actions.recv().await {
    ///     // Handle action events
    /// }
    /// ```
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
