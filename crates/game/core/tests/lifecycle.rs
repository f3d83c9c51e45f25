//! Multi-step scenarios across the container manager, grant engine and
//! replication, checking the relational invariants after every step.

use std::sync::Arc;
use std::time::Duration;

use actions_core::{
    ActionEngine, ActionEnv, ActionError, ActionPrototype, ActionWorld, ContainerManager, Env,
    ExecutionEvent, ExecutionRequest, GameTime, HandlerRegistry, NetEntity, NetEntityMap,
    PrototypeId, PrototypeOracle, PrototypeTable,
};

fn table() -> PrototypeTable {
    PrototypeTable::new()
        .with(
            ActionPrototype::instant("Blink")
                .with_use_delay(Duration::from_secs(2))
                .with_event("blink")
                .without_interact_check(),
        )
        .with(
            ActionPrototype::instant("Scream")
                .with_sound("/audio/scream.ogg")
                .without_interact_check(),
        )
}

fn env(table: &PrototypeTable) -> ActionEnv<'_> {
    Env::new(Some(table as &dyn PrototypeOracle), None, None)
}

fn blink_handlers() -> HandlerRegistry {
    let mut handlers = HandlerRegistry::new();
    handlers.on_event(
        "blink",
        Arc::new(|event: &mut ExecutionEvent, _world: &ActionWorld| event.handle()),
    );
    handlers
}

#[test]
fn item_actions_follow_the_item_between_bags() {
    let table = table();
    let mut world = ActionWorld::server();
    let wizard = world.allocate_entity_id();
    let satchel = world.allocate_entity_id();
    let chest = world.allocate_entity_id();

    let blink = ContainerManager::new(&mut world, env(&table))
        .spawn(satchel, &PrototypeId::from("Blink"))
        .unwrap();
    ActionEngine::new(&mut world, env(&table))
        .grant(wizard, blink)
        .unwrap();
    world.check_invariants().unwrap();

    let moved = ContainerManager::new(&mut world, env(&table))
        .transfer_all(satchel, chest)
        .unwrap();
    assert_eq!(moved, 1);
    assert_eq!(world.record(blink).unwrap().container(), Some(chest));
    assert!(world.is_granted_to(blink, wizard));
    assert!(world.container(satchel).is_none_or(|c| c.is_empty()));
    world.check_invariants().unwrap();

    let deleted = ContainerManager::new(&mut world, env(&table)).destroy_holder(chest);
    assert_eq!(deleted, 1);
    assert!(world.record(blink).is_none());
    assert!(world.ledger(wizard).is_none_or(|l| l.is_empty()));
    world.check_invariants().unwrap();
}

#[test]
fn destroying_a_performer_keeps_provided_records() {
    let table = table();
    let mut world = ActionWorld::server();
    let wizard = world.allocate_entity_id();
    let staff = world.allocate_entity_id();

    let (innate, provided) = {
        let mut manager = ContainerManager::new(&mut world, env(&table));
        (
            manager.spawn(wizard, &PrototypeId::from("Scream")).unwrap(),
            manager.spawn(staff, &PrototypeId::from("Blink")).unwrap(),
        )
    };
    let mut engine = ActionEngine::new(&mut world, env(&table));
    engine.grant(wizard, innate).unwrap();
    engine.grant(wizard, provided).unwrap();

    assert_eq!(
        ContainerManager::new(&mut world, env(&table)).destroy_holder(wizard),
        1
    );

    assert!(world.record(innate).is_none());
    let staff_blink = world.record(provided).unwrap();
    assert_eq!(staff_blink.container(), Some(staff));
    assert_eq!(staff_blink.attached_entity(), None);
    assert!(world.ledger(wizard).is_none());
    world.check_invariants().unwrap();
}

#[test]
fn replica_tracks_execution_bookkeeping() {
    let table = table();
    let handlers = blink_handlers();
    let mut server = ActionWorld::server();
    let wizard = server.allocate_entity_id();
    let blink = ContainerManager::new(&mut server, env(&table))
        .spawn(wizard, &PrototypeId::from("Blink"))
        .unwrap();
    ActionEngine::new(&mut server, env(&table))
        .grant(wizard, blink)
        .unwrap();

    let mut client = ActionWorld::client(wizard);
    let mut map = NetEntityMap::new();
    let batch = server.drain_replication(GameTime::ZERO);
    client.apply_replication(&mut map, &batch).unwrap();
    assert!(client.is_granted_to(blink, wizard));

    let now = GameTime::from_secs_f64(1.0);
    ActionEngine::new(&mut server, env(&table))
        .execute(wizard, &ExecutionRequest::instant(blink), now, &handlers)
        .unwrap();
    let batch = server.drain_replication(now);
    let updated = client.apply_replication(&mut map, &batch).unwrap();

    assert_eq!(updated, vec![blink]);
    let cooldown = client.record(blink).unwrap().cooldown().unwrap();
    assert_eq!(cooldown.end, GameTime::from_secs_f64(3.0));
    client.check_invariants().unwrap();

    // The replica gates exactly like the server.
    let err = ActionEngine::new(&mut client, env(&table))
        .execute(
            wizard,
            &ExecutionRequest::instant(blink),
            GameTime::from_secs_f64(2.0),
            &handlers,
        )
        .unwrap_err();
    assert_eq!(
        err,
        ActionError::OnCooldown {
            until: GameTime::from_secs_f64(3.0)
        }
    );
}

#[test]
fn deleted_records_disappear_from_the_replica() {
    let table = table();
    let mut server = ActionWorld::server();
    let wizard = server.allocate_entity_id();
    let scream = ContainerManager::new(&mut server, env(&table))
        .spawn(wizard, &PrototypeId::from("Scream"))
        .unwrap();
    ActionEngine::new(&mut server, env(&table))
        .grant(wizard, scream)
        .unwrap();

    let mut client = ActionWorld::client(wizard);
    let mut map = NetEntityMap::new();
    client
        .apply_replication(&mut map, &server.drain_replication(GameTime::ZERO))
        .unwrap();

    ContainerManager::new(&mut server, env(&table))
        .delete_record(scream)
        .unwrap();
    client
        .apply_replication(&mut map, &server.drain_replication(GameTime::ZERO))
        .unwrap();

    assert!(client.record(scream).is_none());
    assert!(!client.is_granted_to(scream, wizard));
    assert!(map.local(NetEntity(scream.0)).is_none());
    client.check_invariants().unwrap();
}

#[test]
fn full_batch_repairs_a_replica_that_missed_deltas() {
    let table = table().with(ActionPrototype::instant("Wave").client_exclusive());
    let handlers = blink_handlers();
    let mut server = ActionWorld::server();
    let wizard = server.allocate_entity_id();
    let scream = ContainerManager::new(&mut server, env(&table))
        .spawn(wizard, &PrototypeId::from("Scream"))
        .unwrap();
    ActionEngine::new(&mut server, env(&table))
        .grant(wizard, scream)
        .unwrap();

    let mut client = ActionWorld::client(wizard);
    let mut map = NetEntityMap::new();
    client
        .apply_replication(&mut map, &server.drain_replication(GameTime::ZERO))
        .unwrap();
    let wave = ContainerManager::new(&mut client, env(&table))
        .spawn(wizard, &PrototypeId::from("Wave"))
        .unwrap();
    ActionEngine::new(&mut client, env(&table))
        .grant(wizard, wave)
        .unwrap();

    // Two deltas never reach the replica.
    ContainerManager::new(&mut server, env(&table))
        .delete_record(scream)
        .unwrap();
    let blink = ContainerManager::new(&mut server, env(&table))
        .spawn(wizard, &PrototypeId::from("Blink"))
        .unwrap();
    ActionEngine::new(&mut server, env(&table))
        .grant(wizard, blink)
        .unwrap();
    server.drain_replication(GameTime::ZERO);

    let now = GameTime::from_secs_f64(1.0);
    ActionEngine::new(&mut server, env(&table))
        .execute(wizard, &ExecutionRequest::instant(blink), now, &handlers)
        .unwrap();
    let full = server.full_replication(now);
    assert!(server.has_pending_replication());

    client.resync_replication(&mut map, &full).unwrap();

    assert!(client.record(scream).is_none());
    assert!(map.local(NetEntity(scream.0)).is_none());
    assert!(client.is_granted_to(blink, wizard));
    assert_eq!(
        client.record(blink).unwrap().cooldown().map(|c| c.end),
        Some(GameTime::from_secs_f64(3.0))
    );
    assert!(client.is_granted_to(wave, wizard));
    client.check_invariants().unwrap();

    // The delta queued before the full capture still applies cleanly.
    client
        .apply_replication(&mut map, &server.drain_replication(now))
        .unwrap();
    client.check_invariants().unwrap();
}
