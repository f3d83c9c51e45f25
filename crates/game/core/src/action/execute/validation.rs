//! Gating and targeting checks.
//!
//! ## Gating
//!
//! - Record must be enabled
//! - Cooldown must have ended (`end > now` rejects)
//!
//! ## Targeting
//!
//! Entity and world validators share one shape: blocker check, then either a
//! plain same-map/range check (access checking off) or an unobstructed-path
//! check (access checking on). Entity targets additionally pass the whitelist
//! and the self-target policy, and may fall back to shared storage access.

use crate::action::{ActionError, ActionKind, EntityTargetParams, WorldTargetParams};
use crate::env::ActionEnv;
use crate::state::{ActionRecord, EntityId, GameTime, WorldPosition};

use super::{ActionTarget, ExecutionRequest};

// ============================================================================
// Gating
// ============================================================================

pub(super) fn check_gating(record: &ActionRecord, now: GameTime) -> Result<(), ActionError> {
    if !record.enabled() {
        return Err(ActionError::Disabled);
    }
    if let Some(cooldown) = record.cooldown()
        && cooldown.is_active(now)
    {
        return Err(ActionError::OnCooldown {
            until: cooldown.end,
        });
    }
    Ok(())
}

// ============================================================================
// Targeting
// ============================================================================

/// Validates the request target against the record's kind.
pub(super) fn validate_target(
    record: &ActionRecord,
    performer: EntityId,
    request: &ExecutionRequest,
    env: &ActionEnv<'_>,
) -> Result<ActionTarget, ActionError> {
    let check_can_interact = record.check_can_interact();
    match record.kind() {
        ActionKind::Instant => {
            if check_can_interact && !env.blocker()?.can_interact(performer, None) {
                return Err(ActionError::CannotInteract);
            }
            Ok(ActionTarget::None)
        }

        ActionKind::EntityTarget(params) => {
            let target = request
                .entity_target
                .ok_or(ActionError::MissingEntityTarget)?;
            validate_entity_target(performer, target, params, check_can_interact, env)?;
            Ok(ActionTarget::Entity(target))
        }

        ActionKind::WorldTarget(params) => {
            let target = request
                .world_target
                .ok_or(ActionError::MissingWorldTarget)?;
            validate_world_target(performer, target, params, check_can_interact, env)?;
            Ok(ActionTarget::World(target))
        }
    }
}

/// Checks whether `performer` may aim an entity-targeted action at `target`.
///
/// A performer naming itself skips every range and access check: only the
/// record's `can_target_self` flag decides.
pub fn validate_entity_target(
    performer: EntityId,
    target: EntityId,
    params: &EntityTargetParams,
    check_can_interact: bool,
    env: &ActionEnv<'_>,
) -> Result<(), ActionError> {
    let spatial = env.spatial()?;

    if !spatial.exists(target) {
        return Err(ActionError::TargetNotFound);
    }
    if spatial.is_terminating(target) {
        return Err(ActionError::TargetTerminating);
    }

    if let Some(whitelist) = &params.whitelist
        && !whitelist.admits(|tag| spatial.has_tag(target, tag))
    {
        return Err(ActionError::TargetNotWhitelisted);
    }

    if check_can_interact && !env.blocker()?.can_interact(performer, Some(target)) {
        return Err(ActionError::CannotInteract);
    }

    if performer == target {
        return if params.can_target_self {
            Ok(())
        } else {
            Err(ActionError::SelfTargetNotAllowed)
        };
    }

    let range = params.targeting.range;
    let target_position = spatial.position(target).ok_or(ActionError::TargetNotFound)?;

    if !params.targeting.check_can_access {
        let origin = spatial
            .position(performer)
            .ok_or(ActionError::PerformerNotInWorld)?;
        return check_plain_range(&origin, &target_position, range);
    }

    if spatial.in_range_unobstructed(performer, target_position, range)
        && spatial.in_same_or_parent_container(performer, target)
    {
        return Ok(());
    }

    if spatial.can_access_via_storage(performer, target) {
        Ok(())
    } else {
        Err(ActionError::Inaccessible)
    }
}

/// Checks whether `performer` may aim a world-targeted action at `target`.
pub fn validate_world_target(
    performer: EntityId,
    target: WorldPosition,
    params: &WorldTargetParams,
    check_can_interact: bool,
    env: &ActionEnv<'_>,
) -> Result<(), ActionError> {
    if check_can_interact && !env.blocker()?.can_interact(performer, None) {
        return Err(ActionError::CannotInteract);
    }

    let spatial = env.spatial()?;
    let range = params.targeting.range;

    if !params.targeting.check_can_access {
        let origin = spatial
            .position(performer)
            .ok_or(ActionError::PerformerNotInWorld)?;
        return check_plain_range(&origin, &target, range);
    }

    if spatial.in_range_unobstructed(performer, target, range) {
        Ok(())
    } else {
        Err(ActionError::Inaccessible)
    }
}

/// Same map, and straight-line distance within `range` when `range > 0`.
fn check_plain_range(
    origin: &WorldPosition,
    target: &WorldPosition,
    range: f32,
) -> Result<(), ActionError> {
    let distance = origin.distance(target).ok_or(ActionError::DifferentMap)?;
    if range <= 0.0 || distance <= range {
        Ok(())
    } else {
        Err(ActionError::OutOfRange)
    }
}
