//! End-to-end tests driving the worker through a `RuntimeHandle`.

use std::sync::Arc;
use std::time::Duration;

use actions_core::action::ProvidedActions;
use actions_core::{
    ActionError, ActionWorld, EntityId, ExecutionEvent, ExecutionOutcome, ExecutionRequest,
    GameTime, MapId, NetEntity, NetExecutionRequest, SlotFlags, WorldPosition,
};
use actions_runtime::{
    ActionEvent, EntitySpec, Event, ReplicationPacket, Runtime, RuntimeConfig, RuntimeHandle,
    Topic,
};
use tokio::sync::broadcast;

fn handled(event: &mut ExecutionEvent, _world: &ActionWorld) {
    event.handle();
}

async fn spawn_performer(handle: &RuntimeHandle) -> EntityId {
    handle
        .spawn_entity(EntitySpec::at(WorldPosition::new(MapId(1), 0.0, 0.0)))
        .await
        .unwrap()
}

async fn next_action_event(rx: &mut broadcast::Receiver<Event>) -> ActionEvent {
    match rx.recv().await.unwrap() {
        Event::Action(event) => event,
        other => panic!("unexpected event on actions topic: {other:?}"),
    }
}

#[tokio::test]
async fn blink_respects_its_cooldown() {
    let runtime = Runtime::builder().start().await.unwrap();
    let handle = runtime.handle();
    let mut events = handle.subscribe(Topic::Actions);

    let performer = spawn_performer(&handle).await;
    let granted = handle
        .grant_innate(performer, vec!["Blink".into()])
        .await
        .unwrap();
    let blink = granted[0];
    handle.on_event("blink", Arc::new(handled)).await.unwrap();

    let outcome = handle
        .execute(performer, ExecutionRequest::instant(blink))
        .await
        .unwrap();
    assert!(outcome.is_performed());
    assert!(matches!(
        next_action_event(&mut events).await,
        ActionEvent::Performed(p) if p.action == blink
    ));

    handle.advance(Duration::from_secs(1)).await.unwrap();
    let err = handle
        .execute(performer, ExecutionRequest::instant(blink))
        .await
        .unwrap_err();
    assert_eq!(
        err.as_rejection(),
        Some(&ActionError::OnCooldown {
            until: GameTime::from_secs_f64(2.0)
        })
    );
    match next_action_event(&mut events).await {
        ActionEvent::Rejected { code, .. } => assert_eq!(code, "ACTION_ON_COOLDOWN"),
        other => panic!("expected a rejection, got {other:?}"),
    }

    let now = handle.advance(Duration::from_millis(1100)).await.unwrap();
    assert_eq!(now, GameTime::from_millis(2100));
    let outcome = handle
        .execute(performer, ExecutionRequest::instant(blink))
        .await
        .unwrap();
    assert!(outcome.is_performed());

    drop(handle);
    tokio::time::timeout(Duration::from_secs(5), runtime.shutdown())
        .await
        .expect("worker did not stop after the last handle was dropped")
        .unwrap();
}

#[tokio::test]
async fn unhandled_blink_publishes_unhandled() {
    let runtime = Runtime::builder().start().await.unwrap();
    let handle = runtime.handle();
    let mut events = handle.subscribe(Topic::Actions);

    let performer = spawn_performer(&handle).await;
    let blink = handle.spawn_action(performer, "Blink").await.unwrap();
    handle.grant(performer, blink).await.unwrap();

    let outcome = handle
        .execute(performer, ExecutionRequest::instant(blink))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ExecutionOutcome::Unhandled {
            performer,
            action: blink
        }
    );
    assert_eq!(
        next_action_event(&mut events).await,
        ActionEvent::Unhandled {
            performer,
            action: blink
        }
    );
    let record = handle.query_record(blink).await.unwrap().unwrap();
    assert_eq!(record.cooldown(), None);
}

#[tokio::test]
async fn scream_publishes_its_sound_cue() {
    let runtime = Runtime::builder().start().await.unwrap();
    let handle = runtime.handle();
    let mut events = handle.subscribe(Topic::Actions);

    let performer = spawn_performer(&handle).await;
    let scream = handle
        .grant_innate(performer, vec!["Scream".into()])
        .await
        .unwrap()[0];

    handle
        .execute(performer, ExecutionRequest::instant(scream))
        .await
        .unwrap();

    match next_action_event(&mut events).await {
        ActionEvent::Presentation { action, cue, .. } => {
            assert_eq!(action, scream);
            assert_eq!(cue.sound.as_deref(), Some("/audio/voice/scream.ogg"));
        }
        other => panic!("expected a presentation cue, got {other:?}"),
    }
}

#[tokio::test]
async fn blocked_performer_cannot_act() {
    let runtime = Runtime::builder().start().await.unwrap();
    let handle = runtime.handle();

    let performer = spawn_performer(&handle).await;
    let blink = handle
        .grant_innate(performer, vec!["Blink".into()])
        .await
        .unwrap()[0];
    handle.on_event("blink", Arc::new(handled)).await.unwrap();
    handle.set_blocked(performer, true).await.unwrap();

    let err = handle
        .execute(performer, ExecutionRequest::instant(blink))
        .await
        .unwrap_err();
    assert_eq!(err.as_rejection(), Some(&ActionError::CannotInteract));
}

#[tokio::test]
async fn forged_submission_is_rejected() {
    let runtime = Runtime::builder().start().await.unwrap();
    let handle = runtime.handle();

    let performer = spawn_performer(&handle).await;
    let other = spawn_performer(&handle).await;
    let theirs = handle
        .grant_innate(other, vec!["Blink".into()])
        .await
        .unwrap()[0];
    handle
        .grant_innate(performer, vec!["Scream".into()])
        .await
        .unwrap();

    let err = handle
        .submit(
            NetEntity(performer.0),
            NetExecutionRequest {
                action: NetEntity(theirs.0),
                entity_target: None,
                world_target: None,
            },
        )
        .await
        .unwrap_err();
    assert!(err.as_rejection().is_some_and(ActionError::is_forged));
}

#[tokio::test]
async fn equip_grants_item_actions_until_unequipped() {
    let runtime = Runtime::builder().start().await.unwrap();
    let handle = runtime.handle();

    let performer = spawn_performer(&handle).await;
    let visor = handle
        .spawn_item(
            EntitySpec::inside(performer),
            ProvidedActions {
                slots: SlotFlags::HEAD | SlotFlags::EYES,
                prototypes: vec!["ToggleVisor".into()],
            },
        )
        .await
        .unwrap();

    let in_hand = handle
        .equip(performer, visor, SlotFlags::HANDS)
        .await
        .unwrap();
    assert!(in_hand.is_empty());

    let granted = handle
        .equip(performer, visor, SlotFlags::EYES)
        .await
        .unwrap();
    assert_eq!(granted.len(), 1);
    assert_eq!(handle.query_ledger(performer).await.unwrap(), granted);

    // Re-equipping reuses the record already resting in the item.
    let again = handle
        .equip(performer, visor, SlotFlags::HEAD)
        .await
        .unwrap();
    assert_eq!(again, granted);

    assert_eq!(handle.unequip(performer, visor).await.unwrap(), 1);
    assert!(handle.query_ledger(performer).await.unwrap().is_empty());
    let record = handle.query_record(granted[0]).await.unwrap().unwrap();
    assert_eq!(record.container(), Some(visor));

    let world = handle.snapshot().await.unwrap();
    world.check_invariants().unwrap();
}

#[tokio::test]
async fn despawning_an_item_deletes_its_records() {
    let runtime = Runtime::builder().start().await.unwrap();
    let handle = runtime.handle();

    let performer = spawn_performer(&handle).await;
    let lamp = handle
        .spawn_item(
            EntitySpec::inside(performer),
            ProvidedActions {
                slots: SlotFlags::BELT,
                prototypes: vec!["ToggleLight".into()],
            },
        )
        .await
        .unwrap();
    let granted = handle.equip(performer, lamp, SlotFlags::BELT).await.unwrap();

    assert_eq!(handle.despawn_entity(lamp).await.unwrap(), 1);
    assert!(handle.query_record(granted[0]).await.unwrap().is_none());
    assert!(handle.query_ledger(performer).await.unwrap().is_empty());
}

#[tokio::test]
async fn upgrade_replaces_the_granted_record() {
    let runtime = Runtime::builder().start().await.unwrap();
    let handle = runtime.handle();

    let performer = spawn_performer(&handle).await;
    let fireball = handle
        .grant_innate(performer, vec!["Fireball".into()])
        .await
        .unwrap()[0];

    let upgraded = handle.upgrade(fireball, None).await.unwrap();
    assert_ne!(upgraded, fireball);
    assert!(handle.query_record(fireball).await.unwrap().is_none());
    let record = handle.query_record(upgraded).await.unwrap().unwrap();
    assert_eq!(record.prototype().0, "FireballII");
    assert_eq!(handle.query_ledger(performer).await.unwrap(), vec![upgraded]);

    assert!(handle.upgrade(upgraded, Some(7)).await.is_err());
}

#[tokio::test]
async fn tick_sweeps_expired_cooldowns() {
    let mut config = RuntimeConfig::default();
    config.actions.cooldown_sweep_interval_ms = 1_000;
    let runtime = Runtime::builder().config(config).start().await.unwrap();
    let handle = runtime.handle();

    let performer = spawn_performer(&handle).await;
    let blink = handle
        .grant_innate(performer, vec!["Blink".into()])
        .await
        .unwrap()[0];
    handle.on_event("blink", Arc::new(handled)).await.unwrap();
    handle
        .execute(performer, ExecutionRequest::instant(blink))
        .await
        .unwrap();

    let mut events = handle.subscribe(Topic::Actions);
    handle.advance(Duration::from_secs(3)).await.unwrap();

    assert_eq!(
        next_action_event(&mut events).await,
        ActionEvent::CooldownsSwept {
            time: GameTime::from_secs_f64(3.0),
            evicted: 1
        }
    );
    let record = handle.query_record(blink).await.unwrap().unwrap();
    assert_eq!(record.cooldown(), None);
}

#[tokio::test]
async fn flush_publishes_a_decodable_batch() {
    let runtime = Runtime::builder().start().await.unwrap();
    let handle = runtime.handle();
    let mut replication = handle.subscribe(Topic::Replication);

    let performer = spawn_performer(&handle).await;
    let blink = handle
        .grant_innate(performer, vec!["Blink".into()])
        .await
        .unwrap()[0];
    handle.flush().await.unwrap();

    let packet: ReplicationPacket = match replication.recv().await.unwrap() {
        Event::Replication(packet) => packet,
        other => panic!("unexpected event on replication topic: {other:?}"),
    };
    let batch = packet.decode().unwrap();
    assert_eq!(packet.sequence, 1);
    assert!(batch.record(NetEntity(blink.0)).is_some());
    assert_eq!(batch.ledgers.len(), 1);

    // Nothing pending: no second packet.
    handle.flush().await.unwrap();
    assert!(replication.try_recv().is_err());

    // A full capture covers every delta published so far.
    let full = handle.resync().await.unwrap();
    assert_eq!(full.sequence, 1);
    assert_eq!(full.decode().unwrap().records.len(), 1);
    assert!(replication.try_recv().is_err());
}

#[tokio::test]
async fn start_loads_content_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "cooldown_sweep_interval_ms = 500\n").unwrap();
    let prototype_dir = dir.path().join("actions");
    std::fs::create_dir(&prototype_dir).unwrap();
    std::fs::write(
        prototype_dir.join("custom.ron"),
        r#"(prototypes: [(id: "Wave", presentation: (sound: Some("/audio/wave.ogg")))])"#,
    )
    .unwrap();

    let config = RuntimeConfig {
        config_path: Some(config_path),
        prototype_dir: Some(prototype_dir),
        ..RuntimeConfig::default()
    };
    let runtime = Runtime::builder().config(config).start().await.unwrap();
    let handle = runtime.handle();

    let performer = spawn_performer(&handle).await;
    let wave = handle
        .grant_innate(performer, vec!["Wave".into()])
        .await
        .unwrap()[0];
    assert!(
        handle
            .execute(performer, ExecutionRequest::instant(wave))
            .await
            .unwrap()
            .is_performed()
    );

    // Embedded catalogs are not loaded when a directory is given.
    assert!(
        handle
            .grant_innate(performer, vec!["Blink".into()])
            .await
            .is_err()
    );
    assert_eq!(
        handle.snapshot().await.unwrap().config().cooldown_sweep_interval_ms,
        500
    );
}

#[tokio::test]
async fn start_reports_broken_content() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "cooldown_sweep_interval_ms = 0\n").unwrap();

    let config = RuntimeConfig {
        config_path: Some(config_path),
        ..RuntimeConfig::default()
    };
    let err = Runtime::builder().config(config).start().await.err().unwrap();
    assert!(matches!(err, actions_runtime::RuntimeError::Content(_)));
}
