//! Spatial oracle.
//!
//! Positions, containment and line-of-access are owned by the surrounding
//! game. The targeting validators only ask questions through this trait.

use crate::state::{EntityId, WorldPosition};

/// Read-only view of entity existence, placement and reachability.
pub trait SpatialOracle: Send + Sync {
    /// Returns true if the entity exists in the world.
    fn exists(&self, entity: EntityId) -> bool;

    /// Returns true if the entity is being torn down this tick.
    fn is_terminating(&self, _entity: EntityId) -> bool {
        false
    }

    /// World position of the entity, following its parents if it is contained.
    fn position(&self, entity: EntityId) -> Option<WorldPosition>;

    /// Returns true if the entity carries the given tag.
    fn has_tag(&self, entity: EntityId, tag: &str) -> bool;

    /// Returns true if `user` can reach `target` along an unobstructed path no
    /// longer than `range` (zero or negative means unlimited).
    fn in_range_unobstructed(&self, user: EntityId, target: WorldPosition, range: f32) -> bool;

    /// Returns true if both entities share the same outer container, or one
    /// directly contains the other. Two uncontained entities always pass.
    fn in_same_or_parent_container(&self, user: EntityId, target: EntityId) -> bool;

    /// Returns true if `user` can reach `target` through an open storage it can
    /// access (a bag on the floor next to it, for example).
    fn can_access_via_storage(&self, _user: EntityId, _target: EntityId) -> bool {
        false
    }
}
