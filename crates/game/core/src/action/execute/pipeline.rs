//! Execution pipeline orchestration.
//!
//! 1. Membership: the record must be in the performer's grant ledger
//! 2. Gating: enabled, cooldown over
//! 3. Targeting: kind-specific validator
//! 4. Dispatch: raise the execution event at the provider
//! 5. Unhandled abort: nothing observable happened, nothing changes
//! 6. Bookkeeping: toggle, charges, cooldown, replication
//!
//! Steps 1-3 and 5 never write to the world, so a rejection needs no rollback.

use tracing::{debug, info, warn};

use crate::action::ActionError;
use crate::engine::HandlerRegistry;
use crate::env::ActionEnv;
use crate::replication::RecordFields;
use crate::state::{ActionWorld, Cooldown, EntityId, GameTime, RecordId};

use super::validation::{check_gating, validate_target};
use super::{
    ActionTarget, ExecutionEvent, ExecutionOutcome, ExecutionRequest, PerformedAction,
    PresentationCue,
};

/// Log target for the administrative record of who performed what.
pub const ADMIN_LOG_TARGET: &str = "action_admin";

/// Runs every step of the pipeline for a request received from `performer`.
pub(crate) fn run(
    world: &mut ActionWorld,
    env: &ActionEnv<'_>,
    handlers: &HandlerRegistry,
    performer: EntityId,
    request: &ExecutionRequest,
    now: GameTime,
) -> Result<ExecutionOutcome, ActionError> {
    // 1. Membership
    let Some(ledger) = world.ledger(performer) else {
        debug!(%performer, action = %request.action, "execution request from performer without actions");
        return Err(ActionError::PerformerHasNoActions);
    };
    if !ledger.contains(request.action) {
        warn!(
            target: ADMIN_LOG_TARGET,
            %performer,
            action = %request.action,
            "attempted to perform an action they do not have"
        );
        return Err(if world.contains_record(request.action) {
            ActionError::not_granted(performer, request.action)
        } else {
            ActionError::RecordNotFound
        });
    }
    let record = world
        .record(request.action)
        .ok_or(ActionError::RecordNotFound)?;

    // 2. Gating
    check_gating(record, now)?;

    // 3. Targeting
    let target = validate_target(record, performer, request, env)?;

    match record.container() {
        Some(provider) if provider != performer => info!(
            target: ADMIN_LOG_TARGET,
            %performer,
            action = record.name(),
            %provider,
            aim = ?target,
            "performing action"
        ),
        _ => info!(
            target: ADMIN_LOG_TARGET,
            %performer,
            action = record.name(),
            aim = ?target,
            "performing action"
        ),
    }

    dispatch(world, handlers, performer, request.action, target, now)
}

/// Runs steps 4-6 only. The caller vouches for membership, gating and
/// targeting.
pub(crate) fn perform(
    world: &mut ActionWorld,
    handlers: &HandlerRegistry,
    performer: EntityId,
    request: &ExecutionRequest,
    now: GameTime,
) -> Result<ExecutionOutcome, ActionError> {
    if !world.contains_record(request.action) {
        return Err(ActionError::RecordNotFound);
    }
    dispatch(world, handlers, performer, request.action, request.target(), now)
}

fn dispatch(
    world: &mut ActionWorld,
    handlers: &HandlerRegistry,
    performer: EntityId,
    action: RecordId,
    target: ActionTarget,
    now: GameTime,
) -> Result<ExecutionOutcome, ActionError> {
    // 4. Dispatch
    let record = world.record(action).ok_or(ActionError::RecordNotFound)?;
    let mut event = ExecutionEvent {
        performer,
        action,
        provider: record.container().unwrap_or(performer),
        event: record.event().cloned(),
        kind: record.kind().tag(),
        target,
        handled: false,
        toggle: None,
    };
    handlers.dispatch(&mut event, world);

    // Presentation cues count as an observable effect on their own.
    let record = world.record(action).ok_or(ActionError::RecordNotFound)?;
    let toggled = event.toggle.unwrap_or(record.toggled());
    let cue = PresentationCue::from_presentation(record.presentation(), toggled);

    // 5. Unhandled abort
    if !event.handled && cue.is_none() {
        debug!(%performer, %action, "execution event was not handled");
        return Ok(ExecutionOutcome::Unhandled { performer, action });
    }

    // 6. Bookkeeping
    let entry = world.record_mut(action).ok_or(ActionError::RecordNotFound)?;
    let mut changed = RecordFields::empty();

    if let Some(toggle) = event.toggle
        && entry.toggled != toggle
    {
        entry.toggled = toggle;
        changed |= RecordFields::TOGGLED;
    }

    if let Some(charges) = entry.charges.as_mut() {
        *charges = (*charges - 1).max(0);
        changed |= RecordFields::CHARGES;
        if *charges == 0 && entry.enabled {
            entry.enabled = false;
            changed |= RecordFields::ENABLED;
        }
    }

    let cooldown = entry.use_delay.map(|delay| Cooldown::starting_at(now, delay));
    if entry.cooldown != cooldown {
        entry.cooldown = cooldown;
        changed |= RecordFields::COOLDOWN;
    }

    let performed = PerformedAction {
        performer,
        action,
        provider: event.provider,
        target,
        charges: entry.charges,
        enabled: entry.enabled,
        toggled: entry.toggled,
        cooldown: entry.cooldown,
        cue,
    };

    if !changed.is_empty() {
        world.mark_dirty(action, changed);
    }

    debug!(%performer, %action, ?changed, "action performed");
    Ok(ExecutionOutcome::Performed(performed))
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::action::{ActionKind, TargetWhitelist};
    use crate::engine::{ActionEngine, ContainerManager};
    use crate::env::{
        ActionPrototype, BlockerOracle, Env, PrototypeOracle, PrototypeTable, SpatialOracle,
    };
    use crate::state::{MapId, PrototypeId, WorldPosition};

    #[derive(Default)]
    struct Spatial {
        positions: BTreeMap<EntityId, WorldPosition>,
        tags: BTreeMap<EntityId, Vec<&'static str>>,
        walls_between: BTreeSet<(EntityId, EntityId)>,
    }

    impl SpatialOracle for Spatial {
        fn exists(&self, entity: EntityId) -> bool {
            self.positions.contains_key(&entity)
        }

        fn position(&self, entity: EntityId) -> Option<WorldPosition> {
            self.positions.get(&entity).copied()
        }

        fn has_tag(&self, entity: EntityId, tag: &str) -> bool {
            self.tags.get(&entity).is_some_and(|tags| tags.contains(&tag))
        }

        fn in_range_unobstructed(&self, user: EntityId, target: WorldPosition, range: f32) -> bool {
            let blocked = self
                .walls_between
                .iter()
                .any(|(a, b)| *a == user && self.positions.get(b) == Some(&target));
            let origin = self.positions[&user];
            !blocked && (range <= 0.0 || origin.in_range(&target, range))
        }

        fn in_same_or_parent_container(&self, _user: EntityId, _target: EntityId) -> bool {
            true
        }
    }

    struct Blocker(bool);

    impl BlockerOracle for Blocker {
        fn can_interact(&self, _performer: EntityId, _target: Option<EntityId>) -> bool {
            self.0
        }
    }

    struct Fixture {
        table: PrototypeTable,
        spatial: Spatial,
        blocker: Blocker,
        world: ActionWorld,
        performer: EntityId,
        other: EntityId,
    }

    impl Fixture {
        fn new() -> Self {
            let table = PrototypeTable::new()
                .with(
                    ActionPrototype::instant("Blink")
                        .with_use_delay(Duration::from_secs(5))
                        .with_event("blink"),
                )
                .with(ActionPrototype::instant("Flare").with_charges(1).with_event("flare"))
                .with(ActionPrototype::instant("Bell").with_sound("/audio/bell.ogg"))
                .with(
                    ActionPrototype::instant("Smite")
                        .with_kind(ActionKind::entity(3.0, true))
                        .with_event("smite"),
                )
                .with(
                    ActionPrototype::instant("Jaunt")
                        .with_kind(ActionKind::world(4.0, false))
                        .with_event("jaunt"),
                );

            let mut world = ActionWorld::server();
            let performer = world.allocate_entity_id();
            let other = world.allocate_entity_id();
            let map = MapId(1);
            let mut spatial = Spatial::default();
            spatial.positions.insert(performer, WorldPosition::new(map, 0.0, 0.0));
            spatial.positions.insert(other, WorldPosition::new(map, 2.0, 0.0));

            Self {
                table,
                spatial,
                blocker: Blocker(true),
                world,
                performer,
                other,
            }
        }

        fn grant(&mut self, prototype: &str) -> RecordId {
            let env = Env::new(
                Some(&self.table as &dyn PrototypeOracle),
                Some(&self.spatial as &dyn SpatialOracle),
                Some(&self.blocker as &dyn BlockerOracle),
            );
            let record = ContainerManager::new(&mut self.world, env)
                .spawn(self.performer, &PrototypeId::from(prototype))
                .unwrap();
            ActionEngine::new(&mut self.world, env)
                .grant(self.performer, record)
                .unwrap();
            record
        }

        fn execute(
            &mut self,
            request: ExecutionRequest,
            secs: f64,
            handlers: &HandlerRegistry,
        ) -> Result<ExecutionOutcome, ActionError> {
            let env = Env::new(
                Some(&self.table as &dyn PrototypeOracle),
                Some(&self.spatial as &dyn SpatialOracle),
                Some(&self.blocker as &dyn BlockerOracle),
            );
            ActionEngine::new(&mut self.world, env).execute(
                self.performer,
                &request,
                GameTime::from_secs_f64(secs),
                handlers,
            )
        }
    }

    fn handling(key: &str) -> (HandlerRegistry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut handlers = HandlerRegistry::new();
        handlers.on_event(
            key,
            Arc::new(move |event: &mut ExecutionEvent, _: &ActionWorld| {
                counter.fetch_add(1, Ordering::SeqCst);
                event.handle();
            }),
        );
        (handlers, calls)
    }

    #[test]
    fn cooldown_gates_until_it_ends() {
        let mut fx = Fixture::new();
        let blink = fx.grant("Blink");
        let (handlers, calls) = handling("blink");

        let outcome = fx
            .execute(ExecutionRequest::instant(blink), 0.0, &handlers)
            .unwrap();
        assert!(outcome.is_performed());
        let cooldown = fx.world.record(blink).unwrap().cooldown().unwrap();
        assert_eq!(cooldown.end, GameTime::from_millis(5_000));

        let before = fx.world.record(blink).cloned();
        let err = fx
            .execute(ExecutionRequest::instant(blink), 3.0, &handlers)
            .unwrap_err();
        assert_eq!(err, ActionError::OnCooldown { until: cooldown.end });
        assert_eq!(fx.world.record(blink).cloned(), before);

        assert!(
            fx.execute(ExecutionRequest::instant(blink), 6.0, &handlers)
                .unwrap()
                .is_performed()
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unhandled_event_changes_nothing() {
        let mut fx = Fixture::new();
        let blink = fx.grant("Blink");
        fx.world.drain_replication(GameTime::ZERO);
        let before = fx.world.record(blink).cloned();

        let outcome = fx
            .execute(ExecutionRequest::instant(blink), 0.0, &HandlerRegistry::new())
            .unwrap();

        assert_eq!(
            outcome,
            ExecutionOutcome::Unhandled {
                performer: fx.performer,
                action: blink
            }
        );
        assert_eq!(fx.world.record(blink).cloned(), before);
        assert!(!fx.world.has_pending_replication());
    }

    #[test]
    fn sound_alone_counts_as_handled() {
        let mut fx = Fixture::new();
        let bell = fx.grant("Bell");

        let outcome = fx
            .execute(ExecutionRequest::instant(bell), 0.0, &HandlerRegistry::new())
            .unwrap();

        let ExecutionOutcome::Performed(performed) = outcome else {
            panic!("expected the sound cue to handle the event");
        };
        assert_eq!(
            performed.cue.and_then(|cue| cue.sound).as_deref(),
            Some("/audio/bell.ogg")
        );
    }

    #[test]
    fn last_charge_disables_the_record() {
        let mut fx = Fixture::new();
        let flare = fx.grant("Flare");
        let (handlers, _) = handling("flare");

        fx.execute(ExecutionRequest::instant(flare), 0.0, &handlers)
            .unwrap();
        let record = fx.world.record(flare).unwrap();
        assert_eq!(record.charges(), Some(0));
        assert!(!record.enabled());

        let err = fx
            .execute(ExecutionRequest::instant(flare), 1.0, &handlers)
            .unwrap_err();
        assert_eq!(err, ActionError::Disabled);
    }

    #[test]
    fn handler_toggle_applies_only_when_handled() {
        let mut fx = Fixture::new();
        let blink = fx.grant("Blink");
        let mut handlers = HandlerRegistry::new();
        handlers.on_event(
            "blink",
            Arc::new(|event: &mut ExecutionEvent, _: &ActionWorld| {
                event.toggle = Some(true);
            }),
        );

        fx.execute(ExecutionRequest::instant(blink), 0.0, &handlers)
            .unwrap();
        assert!(!fx.world.record(blink).unwrap().toggled());

        let mut handlers = HandlerRegistry::new();
        handlers.on_provider(
            fx.performer,
            Arc::new(|event: &mut ExecutionEvent, _: &ActionWorld| event.handle_toggle(true)),
        );
        fx.execute(ExecutionRequest::instant(blink), 0.0, &handlers)
            .unwrap();
        assert!(fx.world.record(blink).unwrap().toggled());
    }

    #[test]
    fn forged_requests_are_rejected() {
        let mut fx = Fixture::new();
        let (handlers, calls) = handling("blink");

        let err = fx
            .execute(ExecutionRequest::instant(EntityId(77)), 0.0, &handlers)
            .unwrap_err();
        assert_eq!(err, ActionError::PerformerHasNoActions);

        let blink = fx.grant("Blink");
        let env = Env::new(Some(&fx.table as &dyn PrototypeOracle), None, None);
        ActionEngine::new(&mut fx.world, env).revoke(fx.performer, blink);
        fx.grant("Flare");

        let err = fx
            .execute(ExecutionRequest::instant(blink), 0.0, &handlers)
            .unwrap_err();
        assert!(matches!(err, ActionError::NotGranted { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn self_target_follows_record_policy() {
        let mut fx = Fixture::new();
        let smite = fx.grant("Smite");
        let (handlers, _) = handling("smite");

        let err = fx
            .execute(ExecutionRequest::at_entity(smite, fx.performer), 0.0, &handlers)
            .unwrap_err();
        assert_eq!(err, ActionError::SelfTargetNotAllowed);

        assert!(
            fx.execute(ExecutionRequest::at_entity(smite, fx.other), 0.0, &handlers)
                .unwrap()
                .is_performed()
        );
    }

    #[test]
    fn entity_target_checks_whitelist_blocker_and_walls() {
        let mut fx = Fixture::new();
        let smite = fx.grant("Smite");
        let (handlers, _) = handling("smite");

        if let Some(entry) = fx.world.record_mut(smite)
            && let ActionKind::EntityTarget(params) = &mut entry.kind
        {
            params.whitelist = Some(TargetWhitelist::allow(&["mob"]));
        }
        let request = ExecutionRequest::at_entity(smite, fx.other);
        assert_eq!(
            fx.execute(request, 0.0, &handlers).unwrap_err(),
            ActionError::TargetNotWhitelisted
        );

        fx.spatial.tags.insert(fx.other, vec!["mob"]);
        fx.spatial.walls_between.insert((fx.performer, fx.other));
        assert_eq!(
            fx.execute(request, 0.0, &handlers).unwrap_err(),
            ActionError::Inaccessible
        );

        fx.spatial.walls_between.clear();
        fx.blocker = Blocker(false);
        assert_eq!(
            fx.execute(request, 0.0, &handlers).unwrap_err(),
            ActionError::CannotInteract
        );

        fx.blocker = Blocker(true);
        assert!(fx.execute(request, 0.0, &handlers).unwrap().is_performed());
    }

    #[test]
    fn world_target_without_access_check_uses_plain_range() {
        let mut fx = Fixture::new();
        let jaunt = fx.grant("Jaunt");
        let (handlers, _) = handling("jaunt");

        let near = WorldPosition::new(MapId(1), 3.0, 0.0);
        let far = WorldPosition::new(MapId(1), 9.0, 0.0);
        let elsewhere = WorldPosition::new(MapId(2), 0.0, 0.0);

        assert_eq!(
            fx.execute(ExecutionRequest::instant(jaunt), 0.0, &handlers)
                .unwrap_err(),
            ActionError::MissingWorldTarget
        );
        assert_eq!(
            fx.execute(ExecutionRequest::at_world(jaunt, far), 0.0, &handlers)
                .unwrap_err(),
            ActionError::OutOfRange
        );
        assert_eq!(
            fx.execute(ExecutionRequest::at_world(jaunt, elsewhere), 0.0, &handlers)
                .unwrap_err(),
            ActionError::DifferentMap
        );
        let ExecutionOutcome::Performed(performed) = fx
            .execute(ExecutionRequest::at_world(jaunt, near), 0.0, &handlers)
            .unwrap()
        else {
            panic!("expected jaunt to be performed");
        };
        assert_eq!(performed.target, ActionTarget::World(near));
    }
}
