//! Action-blocking oracle.

use crate::state::EntityId;

/// Answers whether a performer is currently able to act at all.
///
/// Stuns, restraints and death live outside this crate; records that set
/// `check_can_interact` consult this predicate before running.
pub trait BlockerOracle: Send + Sync {
    fn can_interact(&self, performer: EntityId, target: Option<EntityId>) -> bool;
}
