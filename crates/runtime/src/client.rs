//! Predicting client session.
//!
//! A [`ClientSession`] keeps a replica of the authoritative world for one
//! player. Client-exclusive records run locally without a round trip; every
//! other request is forwarded to the server and stays pending until a
//! replication update for the record arrives, or until the server reports a
//! performed state the replica already holds.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};

use actions_core::{
    ActionEngine, ActionError, ActionHandler, ActionWorld, BlockerOracle, ContainerManager,
    EntityId, Env, EventKey, ExecutionOutcome, ExecutionRequest, GameTime, HandlerRegistry,
    NetEntity, NetEntityMap, NetExecutionRequest, PerformedAction, PrototypeId, PrototypeOracle, RecordId,
    ReplicationBatch, SpatialOracle,
};

use crate::api::{Result, RuntimeError, RuntimeHandle};
use crate::events::{Event, Topic};
use crate::oracle::{EntitySpec, WorldModel};

/// Where a client request ended up.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientOutcome {
    /// Executed against the replica (client-exclusive record).
    Local(ExecutionOutcome),
    /// Confirmed by the server. Field updates arrive through replication.
    Forwarded(ExecutionOutcome),
}

impl ClientOutcome {
    pub fn outcome(&self) -> &ExecutionOutcome {
        match self {
            Self::Local(outcome) | Self::Forwarded(outcome) => outcome,
        }
    }
}

pub struct ClientSession {
    owner: EntityId,
    world: ActionWorld,
    net_map: NetEntityMap,
    pending: BTreeSet<RecordId>,
    prototypes: Arc<dyn PrototypeOracle>,
    model: WorldModel,
    handlers: HandlerRegistry,
    clock: GameTime,
    /// Sequence of the last replication delta reflected in the replica.
    sequence: u64,
    server: RuntimeHandle,
    replication_rx: broadcast::Receiver<Event>,
}

impl ClientSession {
    /// Opens a session for the server entity `owner`.
    ///
    /// Server ids are bound to identical local ids, so `owner` is valid on both
    /// sides.
    pub fn connect(
        server: RuntimeHandle,
        owner: EntityId,
        prototypes: Arc<dyn PrototypeOracle>,
    ) -> Self {
        let mut net_map = NetEntityMap::new();
        if let Some(net) = NetEntity::from_server(owner) {
            net_map.bind(net, owner);
        }
        let mut model = WorldModel::new();
        model.insert(owner, EntitySpec::default());

        debug!(%owner, "client session connected");

        Self {
            owner,
            world: ActionWorld::client(owner),
            net_map,
            pending: BTreeSet::new(),
            prototypes,
            model,
            handlers: HandlerRegistry::new(),
            clock: GameTime::ZERO,
            sequence: 0,
            replication_rx: server.subscribe(Topic::Replication),
            server,
        }
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// The replica world.
    pub fn world(&self) -> &ActionWorld {
        &self.world
    }

    /// Time of the most recent batch applied.
    pub fn clock(&self) -> GameTime {
        self.clock
    }

    pub fn is_pending(&self, record: RecordId) -> bool {
        self.pending.contains(&record)
    }

    pub fn pending(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.pending.iter().copied()
    }

    /// Local view used when validating client-exclusive executions.
    pub fn model_mut(&mut self) -> &mut WorldModel {
        &mut self.model
    }

    /// Registers a local handler for client-exclusive records raising `key`.
    pub fn on_event(&mut self, key: impl Into<EventKey>, handler: Arc<dyn ActionHandler>) {
        self.handlers.on_event(key, handler);
    }

    /// Spawns a client-exclusive record into the owner's container and grants
    /// it to the owner.
    pub fn spawn_local(&mut self, prototype: impl Into<PrototypeId>) -> Result<RecordId> {
        let prototype = prototype.into();
        let env = Env::with_all(
            self.prototypes.as_ref(),
            &self.model as &dyn SpatialOracle,
            &self.model as &dyn BlockerOracle,
        );
        let record = ContainerManager::new(&mut self.world, env).spawn(self.owner, &prototype)?;
        ActionEngine::new(&mut self.world, env).grant(self.owner, record)?;
        debug!(%record, %prototype, "spawned client-exclusive action");
        Ok(record)
    }

    /// Executes `request` for the owner.
    ///
    /// Client-exclusive records run against the replica immediately. Anything
    /// else is forwarded to the server; the record stays pending until the
    /// server replicates its updated fields.
    pub async fn execute(&mut self, request: ExecutionRequest) -> Result<ClientOutcome> {
        let Some(record) = self.world.record(request.action) else {
            return Err(ActionError::RecordNotFound.into());
        };

        if record.client_exclusive() {
            let env = Env::with_all(
                self.prototypes.as_ref(),
                &self.model as &dyn SpatialOracle,
                &self.model as &dyn BlockerOracle,
            );
            let outcome = ActionEngine::new(&mut self.world, env).execute(
                self.owner,
                &request,
                self.clock,
                &self.handlers,
            )?;
            return Ok(ClientOutcome::Local(outcome));
        }

        let net_request = self.to_net(&request)?;
        let performer = self
            .net_map
            .net(self.owner)
            .ok_or(RuntimeError::NotReplicated(self.owner))?;

        self.pending.insert(request.action);
        let result = self.server.submit(performer, net_request).await;
        match &result {
            // A performed request that changed nothing is never replicated.
            Ok(ExecutionOutcome::Performed(performed)) => {
                if self.reflects(performed) {
                    self.pending.remove(&request.action);
                }
            }
            Ok(ExecutionOutcome::Unhandled { .. }) | Err(_) => {
                self.pending.remove(&request.action);
            }
        }
        result.map(ClientOutcome::Forwarded)
    }

    /// Returns true if the replica already holds the fields the server
    /// reported after performing the request.
    fn reflects(&self, performed: &PerformedAction) -> bool {
        self.world.record(performed.action).is_some_and(|record| {
            record.charges() == performed.charges
                && record.enabled() == performed.enabled
                && record.toggled() == performed.toggled
                && record.cooldown() == performed.cooldown
        })
    }

    fn to_net(&self, request: &ExecutionRequest) -> Result<NetExecutionRequest> {
        let net = |local: EntityId| {
            self.net_map
                .net(local)
                .ok_or(RuntimeError::NotReplicated(local))
        };
        Ok(NetExecutionRequest {
            action: net(request.action)?,
            entity_target: request.entity_target.map(net).transpose()?,
            world_target: request.world_target,
        })
    }

    /// Applies one authoritative batch and clears pending flags for every
    /// record it touched.
    pub fn apply(&mut self, batch: &ReplicationBatch) -> Result<Vec<RecordId>> {
        let updated = self.world.apply_replication(&mut self.net_map, batch)?;
        self.settle(batch.time, &updated);
        Ok(updated)
    }

    fn settle(&mut self, time: GameTime, updated: &[RecordId]) {
        if time > self.clock {
            self.clock = time;
        }
        for record in updated {
            self.pending.remove(record);
        }
        let world = &self.world;
        self.pending.retain(|record| world.contains_record(*record));
    }

    /// Drains every replication packet received so far. Returns the number of
    /// batches applied.
    ///
    /// If the session fell behind the replication topic, the replica is
    /// rebuilt from a full batch requested from the server, and buffered
    /// deltas already covered by it are skipped.
    pub async fn sync(&mut self) -> Result<usize> {
        let mut applied = 0;
        loop {
            match self.replication_rx.try_recv() {
                Ok(Event::Replication(packet)) => {
                    if packet.sequence <= self.sequence {
                        continue;
                    }
                    let batch = packet.decode()?;
                    self.apply(&batch)?;
                    self.sequence = packet.sequence;
                    applied += 1;
                }
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "client session lagged behind replication, resyncing");
                    self.resync().await?;
                    applied += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        Ok(applied)
    }

    /// Rebuilds the replica from the server's full replicated state.
    pub async fn resync(&mut self) -> Result<()> {
        let packet = self.server.resync().await?;
        let batch = packet.decode()?;
        let updated = self.world.resync_replication(&mut self.net_map, &batch)?;
        self.settle(batch.time, &updated);
        self.sequence = packet.sequence;
        debug!(sequence = packet.sequence, records = updated.len(), "client session resynced");
        Ok(())
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("owner", &self.owner)
            .field("pending", &self.pending)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
