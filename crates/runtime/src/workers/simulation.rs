//! Simulation worker that owns the authoritative [`ActionWorld`].
//!
//! Receives commands from [`RuntimeHandle`](crate::RuntimeHandle), runs them
//! through the core managers, and publishes execution outcomes and replication
//! batches to the EventBus.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use actions_core::action::{ProvidedActions, SlotActionTable};
use actions_core::{
    ActionEngine, ActionEnv, ActionHandler, ActionRecord, ActionWorld, BlockerOracle,
    ContainerManager, EntityId, Env, EventKey, ExecutionOutcome, ExecutionRequest, GameTime,
    HandlerRegistry, ItemActionSource, ItemActionSources, NetEntity, NetExecutionRequest,
    PrototypeId, PrototypeOracle, RecordId, SlotFlags, SpatialOracle, UpgradeEngine,
    WorldPosition,
};

use crate::api::{Result, RuntimeError};
use crate::events::{ActionEvent, Event, EventBus, ReplicationPacket};
use crate::oracle::{EntitySpec, WorldModel};

/// What a runtime-registered handler listens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerTarget {
    /// Every record raising this event key.
    Event(EventKey),
    /// Every record provided by this entity.
    Provider(EntityId),
}

/// Commands that can be sent to the simulation worker
pub enum Command {
    SpawnEntity {
        spec: EntitySpec,
        reply: oneshot::Sender<EntityId>,
    },
    /// Declares the prototypes an item provides while equipped.
    BindItemKit {
        item: EntityId,
        provided: ProvidedActions,
        reply: oneshot::Sender<Result<()>>,
    },
    PlaceEntity {
        entity: EntityId,
        position: WorldPosition,
        reply: oneshot::Sender<Result<()>>,
    },
    SetParent {
        entity: EntityId,
        parent: Option<EntityId>,
        reply: oneshot::Sender<Result<()>>,
    },
    SetBlocked {
        entity: EntityId,
        blocked: bool,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Destroys an entity and everything the action world attached to it.
    DespawnEntity {
        entity: EntityId,
        reply: oneshot::Sender<usize>,
    },

    Ensure {
        holder: EntityId,
        existing: Option<RecordId>,
        prototype: Option<PrototypeId>,
        reply: oneshot::Sender<Result<RecordId>>,
    },
    AddAction {
        holder: EntityId,
        record: RecordId,
        reply: oneshot::Sender<Result<()>>,
    },
    RemoveAction {
        record: RecordId,
        reply: oneshot::Sender<Result<()>>,
    },
    Transfer {
        record: RecordId,
        to_holder: EntityId,
        reply: oneshot::Sender<Result<()>>,
    },
    TransferAll {
        from_holder: EntityId,
        to_holder: EntityId,
        reply: oneshot::Sender<Result<usize>>,
    },
    DeleteRecord {
        record: RecordId,
        reply: oneshot::Sender<Result<()>>,
    },

    Grant {
        performer: EntityId,
        record: RecordId,
        reply: oneshot::Sender<Result<()>>,
    },
    Revoke {
        performer: EntityId,
        record: RecordId,
        reply: oneshot::Sender<bool>,
    },
    RevokeAllFrom {
        performer: EntityId,
        provider: EntityId,
        reply: oneshot::Sender<usize>,
    },
    Equip {
        performer: EntityId,
        item: EntityId,
        slot: SlotFlags,
        reply: oneshot::Sender<Vec<RecordId>>,
    },
    Unequip {
        performer: EntityId,
        item: EntityId,
        reply: oneshot::Sender<usize>,
    },
    GrantInnate {
        performer: EntityId,
        prototypes: Vec<PrototypeId>,
        reply: oneshot::Sender<Result<Vec<RecordId>>>,
    },
    Upgrade {
        record: RecordId,
        level: Option<i32>,
        reply: oneshot::Sender<Result<RecordId>>,
    },

    /// Executes a request issued on the server itself.
    Execute {
        performer: EntityId,
        request: ExecutionRequest,
        reply: oneshot::Sender<Result<ExecutionOutcome>>,
    },
    /// Executes a request received from a client.
    Submit {
        performer: NetEntity,
        request: NetExecutionRequest,
        reply: oneshot::Sender<Result<ExecutionOutcome>>,
    },

    /// Advances the clock by one tick, sweeps if due, flushes replication.
    Advance {
        by: Duration,
        reply: oneshot::Sender<GameTime>,
    },

    QueryRecord {
        record: RecordId,
        reply: oneshot::Sender<Option<ActionRecord>>,
    },
    /// Granted records of a performer, highest priority first.
    QueryLedger {
        performer: EntityId,
        reply: oneshot::Sender<Vec<RecordId>>,
    },
    Snapshot {
        reply: oneshot::Sender<ActionWorld>,
    },
    /// Flushes pending deltas, then captures the full replicated state.
    Resync {
        reply: oneshot::Sender<Result<ReplicationPacket>>,
    },
    RegisterHandler {
        target: HandlerTarget,
        handler: Arc<dyn ActionHandler>,
        reply: oneshot::Sender<()>,
    },
}

/// Bundles the read-only collaborators for one core call.
fn env<'a>(prototypes: &'a (dyn PrototypeOracle + 'a), model: &'a WorldModel) -> ActionEnv<'a> {
    Env::with_all(
        prototypes,
        model as &dyn SpatialOracle,
        model as &dyn BlockerOracle,
    )
}

/// Background task that processes action commands.
///
/// The worker is the only writer of the authoritative world; every command is
/// handled to completion before the next one is received.
pub struct SimulationWorker {
    world: ActionWorld,
    clock: GameTime,
    last_sweep: GameTime,
    /// Number of the last published replication delta.
    sequence: u64,
    prototypes: Arc<dyn PrototypeOracle>,
    model: WorldModel,
    handlers: HandlerRegistry,
    item_sources: ItemActionSources,
    kits: Arc<SlotActionTable>,
    command_rx: mpsc::Receiver<Command>,
    event_bus: EventBus,
}

impl SimulationWorker {
    pub fn new(
        world: ActionWorld,
        prototypes: Arc<dyn PrototypeOracle>,
        model: WorldModel,
        handlers: HandlerRegistry,
        item_sources: ItemActionSources,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
    ) -> Self {
        info!(
            sweep_interval_ms = world.config().cooldown_sweep_interval_ms,
            entities = model.len(),
            "SimulationWorker initialized"
        );

        Self {
            world,
            clock: GameTime::ZERO,
            last_sweep: GameTime::ZERO,
            sequence: 0,
            prototypes,
            model,
            handlers,
            item_sources,
            kits: Arc::new(SlotActionTable::new()),
            command_rx,
            event_bus,
        }
    }

    /// Main worker loop. Ends when every handle has been dropped.
    pub async fn run(mut self) {
        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd);
        }
        info!(time = %self.clock, "SimulationWorker stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::SpawnEntity { spec, reply } => {
                let entity = self.world.allocate_entity_id();
                self.model.insert(entity, spec);
                debug!(target: "runtime::worker", %entity, "spawned entity");
                respond(reply, entity, "SpawnEntity");
            }
            Command::BindItemKit {
                item,
                provided,
                reply,
            } => {
                let result = if self.model.contains(item) {
                    Arc::make_mut(&mut self.kits).insert(item, provided);
                    Ok(())
                } else {
                    Err(RuntimeError::UnknownEntity(item))
                };
                respond(reply, result, "BindItemKit");
            }
            Command::PlaceEntity {
                entity,
                position,
                reply,
            } => {
                let result = known(entity, self.model.set_position(entity, position));
                respond(reply, result, "PlaceEntity");
            }
            Command::SetParent {
                entity,
                parent,
                reply,
            } => {
                let result = known(entity, self.model.set_parent(entity, parent));
                respond(reply, result, "SetParent");
            }
            Command::SetBlocked {
                entity,
                blocked,
                reply,
            } => {
                let result = known(entity, self.model.set_blocked(entity, blocked));
                respond(reply, result, "SetBlocked");
            }
            Command::DespawnEntity { entity, reply } => {
                let deleted = self.despawn(entity);
                respond(reply, deleted, "DespawnEntity");
            }

            Command::Ensure {
                holder,
                existing,
                prototype,
                reply,
            } => {
                let result = self
                    .containers()
                    .ensure(holder, existing, prototype.as_ref())
                    .map_err(RuntimeError::from);
                respond(reply, result, "Ensure");
            }
            Command::AddAction {
                holder,
                record,
                reply,
            } => {
                let result = self.containers().add(holder, record).map_err(Into::into);
                respond(reply, result, "AddAction");
            }
            Command::RemoveAction { record, reply } => {
                let result = self.containers().remove(record).map_err(Into::into);
                respond(reply, result, "RemoveAction");
            }
            Command::Transfer {
                record,
                to_holder,
                reply,
            } => {
                let result = self
                    .containers()
                    .transfer(record, to_holder)
                    .map_err(Into::into);
                respond(reply, result, "Transfer");
            }
            Command::TransferAll {
                from_holder,
                to_holder,
                reply,
            } => {
                let result = self
                    .containers()
                    .transfer_all(from_holder, to_holder)
                    .map_err(Into::into);
                respond(reply, result, "TransferAll");
            }
            Command::DeleteRecord { record, reply } => {
                let result = self.containers().delete_record(record).map_err(Into::into);
                respond(reply, result, "DeleteRecord");
            }

            Command::Grant {
                performer,
                record,
                reply,
            } => {
                let result = self.engine().grant(performer, record).map_err(Into::into);
                respond(reply, result, "Grant");
            }
            Command::Revoke {
                performer,
                record,
                reply,
            } => {
                let revoked = self.engine().revoke(performer, record);
                respond(reply, revoked, "Revoke");
            }
            Command::RevokeAllFrom {
                performer,
                provider,
                reply,
            } => {
                let revoked = self.engine().revoke_all_from(performer, provider);
                respond(reply, revoked, "RevokeAllFrom");
            }
            Command::Equip {
                performer,
                item,
                slot,
                reply,
            } => {
                let granted = self.equip(performer, item, slot);
                respond(reply, granted, "Equip");
            }
            Command::Unequip {
                performer,
                item,
                reply,
            } => {
                let revoked = self.engine().unequip(performer, item);
                respond(reply, revoked, "Unequip");
            }
            Command::GrantInnate {
                performer,
                prototypes,
                reply,
            } => {
                let result = self
                    .engine()
                    .grant_innate(performer, &prototypes)
                    .map_err(Into::into);
                respond(reply, result, "GrantInnate");
            }
            Command::Upgrade {
                record,
                level,
                reply,
            } => {
                let result = UpgradeEngine::new(
                    &mut self.world,
                    env(self.prototypes.as_ref(), &self.model),
                )
                .upgrade(record, level)
                .map_err(Into::into);
                respond(reply, result, "Upgrade");
            }

            Command::Execute {
                performer,
                request,
                reply,
            } => {
                let result = self.execute(performer, request);
                respond(reply, result, "Execute");
            }
            Command::Submit {
                performer,
                request,
                reply,
            } => {
                let performer = EntityId(performer.0);
                let request = ExecutionRequest {
                    action: EntityId(request.action.0),
                    entity_target: request.entity_target.map(|net| EntityId(net.0)),
                    world_target: request.world_target,
                };
                let result = self.execute(performer, request);
                respond(reply, result, "Submit");
            }

            Command::Advance { by, reply } => {
                let now = self.tick(by);
                respond(reply, now, "Advance");
            }

            Command::QueryRecord { record, reply } => {
                respond(reply, self.world.record(record).cloned(), "QueryRecord");
            }
            Command::QueryLedger { performer, reply } => {
                let records = self
                    .world
                    .granted_by_priority(performer)
                    .into_iter()
                    .map(ActionRecord::id)
                    .collect();
                respond(reply, records, "QueryLedger");
            }
            Command::Snapshot { reply } => {
                respond(reply, self.world.clone(), "Snapshot");
            }
            Command::Resync { reply } => {
                self.flush_replication();
                let batch = self.world.full_replication(self.clock);
                let packet: Result<ReplicationPacket> =
                    ReplicationPacket::encode(self.sequence, &batch).map_err(Into::into);
                debug!(
                    target: "runtime::worker",
                    sequence = self.sequence,
                    records = batch.records.len(),
                    "captured full replication"
                );
                respond(reply, packet, "Resync");
            }
            Command::RegisterHandler {
                target,
                handler,
                reply,
            } => {
                match target {
                    HandlerTarget::Event(key) => self.handlers.on_event(key, handler),
                    HandlerTarget::Provider(provider) => {
                        self.handlers.on_provider(provider, handler)
                    }
                }
                respond(reply, (), "RegisterHandler");
            }
        }
    }

    fn engine(&mut self) -> ActionEngine<'_> {
        ActionEngine::new(&mut self.world, env(self.prototypes.as_ref(), &self.model))
    }

    fn containers(&mut self) -> ContainerManager<'_> {
        ContainerManager::new(&mut self.world, env(self.prototypes.as_ref(), &self.model))
    }

    fn equip(&mut self, performer: EntityId, item: EntityId, slot: SlotFlags) -> Vec<RecordId> {
        let mut sources = self.item_sources.clone();
        sources.push(self.kits.clone() as Arc<dyn ItemActionSource>);
        self.engine().equip(performer, item, slot, &sources)
    }

    fn despawn(&mut self, entity: EntityId) -> usize {
        let deleted = self.containers().destroy_holder(entity);
        self.handlers.forget_provider(entity);
        if self.kits.as_ref().contains(entity) {
            Arc::make_mut(&mut self.kits).remove(entity);
        }
        self.model.remove(entity);
        debug!(target: "runtime::worker", %entity, deleted, "despawned entity");
        deleted
    }

    /// Runs one request through the pipeline and publishes its outcome.
    fn execute(
        &mut self,
        performer: EntityId,
        request: ExecutionRequest,
    ) -> Result<ExecutionOutcome> {
        let now = self.clock;
        let result = ActionEngine::new(&mut self.world, env(self.prototypes.as_ref(), &self.model))
            .execute(performer, &request, now, &self.handlers);

        match &result {
            Ok(ExecutionOutcome::Performed(performed)) => {
                if let Some(cue) = &performed.cue {
                    self.event_bus
                        .publish(Event::Action(ActionEvent::Presentation {
                            performer,
                            action: performed.action,
                            cue: cue.clone(),
                        }));
                }
                self.event_bus
                    .publish(Event::Action(ActionEvent::Performed(performed.clone())));
            }
            Ok(ExecutionOutcome::Unhandled { performer, action }) => {
                self.event_bus.publish(Event::Action(ActionEvent::Unhandled {
                    performer: *performer,
                    action: *action,
                }));
            }
            Err(error) => {
                debug!(
                    target: "runtime::worker",
                    %performer,
                    action = %request.action,
                    %error,
                    "execution rejected"
                );
                self.event_bus.publish(Event::Action(ActionEvent::rejected(
                    performer,
                    request.action,
                    error,
                )));
            }
        }

        result.map_err(Into::into)
    }

    /// Advances the clock, sweeps expired cooldowns when the interval has
    /// elapsed, and flushes pending replication.
    fn tick(&mut self, by: Duration) -> GameTime {
        self.clock += by;
        let now = self.clock;

        if now.saturating_since(self.last_sweep) >= self.world.config().sweep_interval() {
            let evicted = self.engine().sweep_cooldowns(now);
            self.last_sweep = now;
            if evicted > 0 {
                self.event_bus
                    .publish(Event::Action(ActionEvent::CooldownsSwept { time: now, evicted }));
            }
        }

        self.flush_replication();
        now
    }

    fn flush_replication(&mut self) {
        let batch = self.world.drain_replication(self.clock);
        if batch.is_empty() {
            return;
        }
        match ReplicationPacket::encode(self.sequence + 1, &batch) {
            Ok(packet) => {
                self.sequence = packet.sequence;
                debug!(
                    target: "runtime::worker",
                    sequence = packet.sequence,
                    records = batch.records.len(),
                    ledgers = batch.ledgers.len(),
                    removed = batch.removed.len(),
                    bytes = packet.payload.len(),
                    "flushed replication"
                );
                self.event_bus.publish(Event::Replication(packet));
            }
            Err(error) => error!(target: "runtime::worker", %error, "failed to encode replication batch"),
        }
    }
}

fn known(entity: EntityId, found: bool) -> Result<()> {
    if found {
        Ok(())
    } else {
        Err(RuntimeError::UnknownEntity(entity))
    }
}

fn respond<T>(reply: oneshot::Sender<T>, value: T, command: &'static str) {
    if reply.send(value).is_err() {
        debug!(target: "runtime::worker", command, "reply channel closed (caller dropped)");
    }
}
