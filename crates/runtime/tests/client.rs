//! Client sessions kept in sync through the replication topic.

use std::sync::Arc;
use std::time::Duration;

use actions_content::PrototypeRegistry;
use actions_core::{
    ActionWorld, EntityId, ExecutionEvent, ExecutionRequest, MapId, PrototypeOracle,
    WorldPosition,
};
use actions_runtime::{
    ClientOutcome, ClientSession, EntitySpec, Runtime, RuntimeConfig, RuntimeHandle,
};

fn prototypes() -> Arc<dyn PrototypeOracle> {
    Arc::new(PrototypeRegistry::load_embedded().unwrap())
}

fn handled(event: &mut ExecutionEvent, _world: &ActionWorld) {
    event.handle();
}

async fn connect(handle: &RuntimeHandle) -> (EntityId, ClientSession) {
    let performer = handle
        .spawn_entity(EntitySpec::at(WorldPosition::new(MapId(1), 0.0, 0.0)))
        .await
        .unwrap();
    let session = ClientSession::connect(handle.clone(), performer, prototypes());
    (performer, session)
}

#[tokio::test]
async fn replica_follows_server_grants() {
    let runtime = Runtime::builder().start().await.unwrap();
    let handle = runtime.handle();
    let (performer, mut session) = connect(&handle).await;

    let blink = handle
        .grant_innate(performer, vec!["Blink".into()])
        .await
        .unwrap()[0];
    handle.flush().await.unwrap();

    assert_eq!(session.sync().await.unwrap(), 1);
    assert!(session.world().is_granted_to(blink, performer));
    session.world().check_invariants().unwrap();

    handle.revoke(performer, blink).await.unwrap();
    handle.flush().await.unwrap();
    session.sync().await.unwrap();
    assert!(!session.world().is_granted_to(blink, performer));
    assert_eq!(
        session.world().record(blink).unwrap().container(),
        Some(performer)
    );
}

#[tokio::test]
async fn forwarded_request_stays_pending_until_replicated() {
    let runtime = Runtime::builder().start().await.unwrap();
    let handle = runtime.handle();
    let (performer, mut session) = connect(&handle).await;

    let blink = handle
        .grant_innate(performer, vec!["Blink".into()])
        .await
        .unwrap()[0];
    handle.on_event("blink", Arc::new(handled)).await.unwrap();
    handle.flush().await.unwrap();
    session.sync().await.unwrap();

    let outcome = session
        .execute(ExecutionRequest::instant(blink))
        .await
        .unwrap();
    assert!(matches!(outcome, ClientOutcome::Forwarded(ref o) if o.is_performed()));
    assert!(session.is_pending(blink));
    // No optimistic cooldown on the replica.
    assert_eq!(session.world().record(blink).unwrap().cooldown(), None);

    handle.advance(Duration::from_millis(100)).await.unwrap();
    session.sync().await.unwrap();

    assert!(!session.is_pending(blink));
    let cooldown = session.world().record(blink).unwrap().cooldown().unwrap();
    assert_eq!(cooldown.end.saturating_since(cooldown.start), Duration::from_secs(2));
}

#[tokio::test]
async fn performed_request_without_changes_is_not_left_pending() {
    let runtime = Runtime::builder().start().await.unwrap();
    let handle = runtime.handle();
    let (performer, mut session) = connect(&handle).await;

    let examine = handle
        .grant_innate(performer, vec!["Examine".into()])
        .await
        .unwrap()[0];
    handle.on_event("examine", Arc::new(handled)).await.unwrap();
    handle.flush().await.unwrap();
    session.sync().await.unwrap();

    let outcome = session
        .execute(ExecutionRequest::at_entity(examine, performer))
        .await
        .unwrap();
    assert!(matches!(outcome, ClientOutcome::Forwarded(ref o) if o.is_performed()));
    assert!(!session.is_pending(examine));

    handle.advance(Duration::from_secs(11)).await.unwrap();
    assert_eq!(session.sync().await.unwrap(), 0);
    assert_eq!(session.pending().count(), 0);
}

#[tokio::test]
async fn lagging_session_resyncs_from_full_state() {
    let config = RuntimeConfig {
        event_buffer_size: 1,
        ..RuntimeConfig::default()
    };
    let runtime = Runtime::builder().config(config).start().await.unwrap();
    let handle = runtime.handle();
    let (performer, mut session) = connect(&handle).await;

    let scream = handle
        .grant_innate(performer, vec!["Scream".into()])
        .await
        .unwrap()[0];
    handle.flush().await.unwrap();
    session.sync().await.unwrap();
    assert!(session.world().is_granted_to(scream, performer));

    // Three deltas against a one-slot buffer: the session misses the first two.
    handle.delete_action(scream).await.unwrap();
    handle.flush().await.unwrap();
    let blink = handle
        .grant_innate(performer, vec!["Blink".into()])
        .await
        .unwrap()[0];
    handle.flush().await.unwrap();
    handle.on_event("blink", Arc::new(handled)).await.unwrap();
    handle
        .execute(performer, ExecutionRequest::instant(blink))
        .await
        .unwrap();
    handle.flush().await.unwrap();

    assert!(session.sync().await.unwrap() >= 1);

    let replica = session.world();
    assert!(replica.record(scream).is_none());
    assert!(replica.is_granted_to(blink, performer));
    assert!(replica.record(blink).unwrap().cooldown().is_some());
    replica.check_invariants().unwrap();
    assert_eq!(handle.query_ledger(performer).await.unwrap(), vec![blink]);

    // Later deltas apply on top of the rebuilt replica.
    handle.revoke(performer, blink).await.unwrap();
    handle.flush().await.unwrap();
    assert_eq!(session.sync().await.unwrap(), 1);
    assert!(!session.world().is_granted_to(blink, performer));
}

#[tokio::test]
async fn unhandled_forward_clears_pending() {
    let runtime = Runtime::builder().start().await.unwrap();
    let handle = runtime.handle();
    let (performer, mut session) = connect(&handle).await;

    let blink = handle
        .grant_innate(performer, vec!["Blink".into()])
        .await
        .unwrap()[0];
    handle.flush().await.unwrap();
    session.sync().await.unwrap();

    let outcome = session
        .execute(ExecutionRequest::instant(blink))
        .await
        .unwrap();
    assert!(!outcome.outcome().is_performed());
    assert!(!session.is_pending(blink));
}

#[tokio::test]
async fn client_exclusive_toggle_runs_locally() {
    let runtime = Runtime::builder().start().await.unwrap();
    let handle = runtime.handle();
    let (_, mut session) = connect(&handle).await;

    session.on_event(
        "toggle_combat_mode",
        Arc::new(|event: &mut ExecutionEvent, _world: &ActionWorld| {
            event.toggle = Some(true);
            event.handle();
        }),
    );
    let combat = session.spawn_local("ToggleCombatMode").unwrap();
    assert!(combat.is_client_local());

    let outcome = session
        .execute(ExecutionRequest::instant(combat))
        .await
        .unwrap();

    assert!(matches!(outcome, ClientOutcome::Local(ref o) if o.is_performed()));
    assert!(session.world().record(combat).unwrap().toggled());
    assert!(!session.is_pending(combat));

    // The server never hears about it.
    handle.flush().await.unwrap();
    assert_eq!(session.sync().await.unwrap(), 0);
    assert!(handle.query_record(combat).await.unwrap().is_none());
}
