//! Scripted sandbox for the action runtime.
//!
//! Starts a runtime from the environment (see `RuntimeConfig::from_env`),
//! spawns a wizard with a handful of abilities, and walks through cooldowns,
//! targeting, charges, equipment, upgrades and client replication while
//! logging every published event.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p actions-sandbox
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{info, warn};

use actions_content::{ItemKitLoader, PrototypeRegistry};
use actions_core::{
    ActionWorld, EntityId, ExecutionEvent, ExecutionRequest, MapId, PrototypeOracle, SlotFlags,
    WorldPosition,
};
use actions_runtime::{
    ClientSession, EntitySpec, Event, Runtime, RuntimeConfig, RuntimeHandle, Topic, Wall,
    WorldModel,
};

const MAP: MapId = MapId(1);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = RuntimeConfig::from_env();
    let prototypes: Arc<dyn PrototypeOracle> = match &config.prototype_dir {
        Some(dir) => Arc::new(PrototypeRegistry::load_dir(dir)?),
        None => Arc::new(PrototypeRegistry::load_embedded()?),
    };

    let mut model = WorldModel::new();
    model.add_wall(Wall::new(MAP, (5.0, -5.0), (5.0, 5.0)));

    let runtime = Runtime::builder()
        .config(config)
        .prototypes(prototypes.clone())
        .world_model(model)
        .on_event("blink", Arc::new(log_handled))
        .on_event("smite", Arc::new(log_handled))
        .on_event("jaunt", Arc::new(log_handled))
        .start()
        .await?;
    let handle = runtime.handle();

    let logger = tokio::spawn(log_events(handle.subscribe(Topic::Actions)));

    let wizard = handle
        .spawn_entity(EntitySpec::at(WorldPosition::new(MAP, 0.0, 0.0)))
        .await?;
    let mob = handle
        .spawn_entity(EntitySpec::at(WorldPosition::new(MAP, 1.0, 0.0)).with_tag("mob"))
        .await?;
    let ghost = handle
        .spawn_entity(
            EntitySpec::at(WorldPosition::new(MAP, 0.0, 1.0))
                .with_tag("mob")
                .with_tag("ghost"),
        )
        .await?;

    let innate = handle
        .grant_innate(
            wizard,
            ["Scream", "Blink", "Smite", "Jaunt", "Fireball"]
                .into_iter()
                .map(Into::into)
                .collect(),
        )
        .await?;
    let [scream, blink, smite, jaunt, fireball] = innate[..] else {
        anyhow::bail!("expected five innate actions, got {}", innate.len());
    };

    let mut session = ClientSession::connect(handle.clone(), wizard, prototypes);
    handle.flush().await?;
    session.sync().await?;
    info!(
        replicated = session.world().records().count(),
        "client replica in sync"
    );

    cooldowns(&handle, wizard, blink).await?;
    targeting(&handle, wizard, smite, mob, ghost).await?;
    charges(&handle, wizard, jaunt).await?;

    try_execute(&handle, wizard, ExecutionRequest::instant(scream)).await?;

    let upgraded = handle.upgrade(fireball, None).await?;
    info!(%fireball, %upgraded, "fireball upgraded");

    equipment(&handle, wizard).await?;

    let outcome = session.execute(ExecutionRequest::instant(blink)).await;
    info!(?outcome, pending = session.is_pending(blink), "client forwarded blink");
    handle.advance(Duration::from_millis(100)).await?;
    session.sync().await?;
    info!(pending = session.is_pending(blink), "client caught up");

    let world = handle.snapshot().await?;
    world
        .check_invariants()
        .context("authoritative world violated an invariant")?;

    drop(session);
    drop(handle);
    logger.abort();
    runtime.shutdown().await?;
    Ok(())
}

fn log_handled(event: &mut ExecutionEvent, _world: &ActionWorld) {
    info!(performer = %event.performer, action = %event.action, aim = ?event.target, "ability fired");
    event.handle();
}

async fn log_events(mut rx: broadcast::Receiver<Event>) {
    while let Ok(event) = rx.recv().await {
        match event.to_json() {
            Ok(json) => info!(topic = %event.topic(), "{json}"),
            Err(error) => warn!(%error, "failed to render event"),
        }
    }
}

async fn try_execute(
    handle: &RuntimeHandle,
    performer: EntityId,
    request: ExecutionRequest,
) -> Result<()> {
    match handle.execute(performer, request).await {
        Ok(outcome) => info!(performed = outcome.is_performed(), "executed"),
        Err(error) => match error.as_rejection() {
            Some(rejection) => info!(%rejection, "rejected"),
            None => return Err(error.into()),
        },
    }
    Ok(())
}

async fn cooldowns(handle: &RuntimeHandle, wizard: EntityId, blink: EntityId) -> Result<()> {
    info!("--- cooldowns ---");
    try_execute(handle, wizard, ExecutionRequest::instant(blink)).await?;
    handle.advance(Duration::from_secs(1)).await?;
    try_execute(handle, wizard, ExecutionRequest::instant(blink)).await?;
    handle.advance(Duration::from_millis(1100)).await?;
    try_execute(handle, wizard, ExecutionRequest::instant(blink)).await
}

async fn targeting(
    handle: &RuntimeHandle,
    wizard: EntityId,
    smite: EntityId,
    mob: EntityId,
    ghost: EntityId,
) -> Result<()> {
    info!("--- targeting ---");
    try_execute(handle, wizard, ExecutionRequest::at_entity(smite, ghost)).await?;
    try_execute(handle, wizard, ExecutionRequest::at_entity(smite, wizard)).await?;
    try_execute(handle, wizard, ExecutionRequest::at_entity(smite, mob)).await
}

async fn charges(handle: &RuntimeHandle, wizard: EntityId, jaunt: EntityId) -> Result<()> {
    info!("--- charges ---");
    // Behind the wall, but jaunt ignores obstructions.
    let beyond = WorldPosition::new(MAP, 7.0, 0.0);
    for _ in 0..4 {
        try_execute(handle, wizard, ExecutionRequest::at_world(jaunt, beyond)).await?;
    }
    let record = handle.query_record(jaunt).await?;
    info!(charges = ?record.as_ref().and_then(|r| r.charges()), "jaunt exhausted");
    Ok(())
}

async fn equipment(handle: &RuntimeHandle, wizard: EntityId) -> Result<()> {
    info!("--- equipment ---");
    let kits = ItemKitLoader::load_embedded()?;
    let kit = kits
        .get("WeldingVisor")
        .context("embedded item kits lack WeldingVisor")?;

    let visor = handle
        .spawn_item(EntitySpec::inside(wizard), kit.provides.clone())
        .await?;
    let granted = handle.equip(wizard, visor, SlotFlags::EYES).await?;
    info!(?granted, "visor equipped");
    for record in &granted {
        try_execute(handle, wizard, ExecutionRequest::instant(*record)).await?;
    }
    let revoked = handle.unequip(wizard, visor).await?;
    info!(revoked, "visor unequipped");
    Ok(())
}
