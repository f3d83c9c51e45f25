//! In-memory spatial model and action blocker.
//!
//! Reference implementation of the collaborators the action core queries
//! during targeting: placement, containment, tags, walls and stuns.

use std::collections::{BTreeMap, BTreeSet};

use actions_core::{BlockerOracle, EntityId, MapId, SpatialOracle, WorldPosition};

/// Reach used when accessing an entity through an open storage container.
pub const STORAGE_ACCESS_RANGE: f32 = 1.5;

/// Containers nested deeper than this are treated as detached.
const MAX_NESTING: usize = 16;

/// How an entity is placed when it is added to the model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntitySpec {
    /// Own position. Ignored while the entity is inside a parent.
    pub position: Option<WorldPosition>,
    /// Entity this one is contained in (a bag, a locker, a wearer).
    pub parent: Option<EntityId>,
    pub tags: BTreeSet<String>,
    /// Whether other entities inside this one can be reached through it.
    pub storage: bool,
}

impl EntitySpec {
    pub fn at(position: WorldPosition) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn inside(parent: EntityId) -> Self {
        Self {
            parent: Some(parent),
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn as_storage(mut self) -> Self {
        self.storage = true;
        self
    }
}

#[derive(Clone, Debug)]
struct Placement {
    spec: EntitySpec,
    terminating: bool,
    blocked: bool,
}

/// Straight wall segment that blocks line of access on one map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Wall {
    pub map: MapId,
    pub from: (f32, f32),
    pub to: (f32, f32),
}

impl Wall {
    pub fn new(map: MapId, from: (f32, f32), to: (f32, f32)) -> Self {
        Self { map, from, to }
    }

    fn blocks(&self, a: &WorldPosition, b: &WorldPosition) -> bool {
        a.map == self.map && b.map == self.map && segments_cross((a.x, a.y), (b.x, b.y), self.from, self.to)
    }
}

/// Entities, their placement and the walls between them.
#[derive(Clone, Debug, Default)]
pub struct WorldModel {
    entities: BTreeMap<EntityId, Placement>,
    walls: Vec<Wall>,
}

impl WorldModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: EntityId, spec: EntitySpec) {
        self.entities.insert(
            entity,
            Placement {
                spec,
                terminating: false,
                blocked: false,
            },
        );
    }

    /// Removes an entity. Children are dropped where their parent stood.
    pub fn remove(&mut self, entity: EntityId) -> bool {
        let dropped_at = self.position(entity);
        if self.entities.remove(&entity).is_none() {
            return false;
        }
        for placement in self.entities.values_mut() {
            if placement.spec.parent == Some(entity) {
                placement.spec.parent = None;
                placement.spec.position = dropped_at;
            }
        }
        true
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Moves an uncontained entity. Returns false for unknown entities.
    pub fn set_position(&mut self, entity: EntityId, position: WorldPosition) -> bool {
        self.update(entity, |p| {
            p.spec.parent = None;
            p.spec.position = Some(position);
        })
    }

    /// Puts `entity` inside `parent`, or takes it out at its current position.
    pub fn set_parent(&mut self, entity: EntityId, parent: Option<EntityId>) -> bool {
        let position = self.position(entity);
        self.update(entity, |p| {
            if parent.is_none() {
                p.spec.position = position;
            }
            p.spec.parent = parent;
        })
    }

    pub fn set_blocked(&mut self, entity: EntityId, blocked: bool) -> bool {
        self.update(entity, |p| p.blocked = blocked)
    }

    pub fn set_terminating(&mut self, entity: EntityId, terminating: bool) -> bool {
        self.update(entity, |p| p.terminating = terminating)
    }

    pub fn add_tag(&mut self, entity: EntityId, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        self.update(entity, |p| {
            p.spec.tags.insert(tag);
        })
    }

    pub fn add_wall(&mut self, wall: Wall) {
        self.walls.push(wall);
    }

    pub fn parent(&self, entity: EntityId) -> Option<EntityId> {
        self.entities.get(&entity).and_then(|p| p.spec.parent)
    }

    fn update(&mut self, entity: EntityId, change: impl FnOnce(&mut Placement)) -> bool {
        match self.entities.get_mut(&entity) {
            Some(placement) => {
                change(placement);
                true
            }
            None => false,
        }
    }

    fn line_clear(&self, from: &WorldPosition, to: &WorldPosition) -> bool {
        !self.walls.iter().any(|wall| wall.blocks(from, to))
    }
}

impl SpatialOracle for WorldModel {
    fn exists(&self, entity: EntityId) -> bool {
        self.contains(entity)
    }

    fn is_terminating(&self, entity: EntityId) -> bool {
        self.entities.get(&entity).is_some_and(|p| p.terminating)
    }

    fn position(&self, entity: EntityId) -> Option<WorldPosition> {
        let mut current = entity;
        for _ in 0..MAX_NESTING {
            let placement = self.entities.get(&current)?;
            match placement.spec.parent {
                Some(parent) => current = parent,
                None => return placement.spec.position,
            }
        }
        None
    }

    fn has_tag(&self, entity: EntityId, tag: &str) -> bool {
        self.entities
            .get(&entity)
            .is_some_and(|p| p.spec.tags.contains(tag))
    }

    fn in_range_unobstructed(&self, user: EntityId, target: WorldPosition, range: f32) -> bool {
        let Some(origin) = self.position(user) else {
            return false;
        };
        let Some(distance) = origin.distance(&target) else {
            return false;
        };
        (range <= 0.0 || distance <= range) && self.line_clear(&origin, &target)
    }

    fn in_same_or_parent_container(&self, user: EntityId, target: EntityId) -> bool {
        let user_parent = self.parent(user);
        let target_parent = self.parent(target);
        user_parent == target_parent || target_parent == Some(user) || user_parent == Some(target)
    }

    fn can_access_via_storage(&self, user: EntityId, target: EntityId) -> bool {
        let Some(storage) = self.parent(target) else {
            return false;
        };
        if !self.entities.get(&storage).is_some_and(|p| p.spec.storage) {
            return false;
        }
        let Some(storage_position) = self.position(storage) else {
            return false;
        };
        self.in_same_or_parent_container(user, storage)
            && self.in_range_unobstructed(user, storage_position, STORAGE_ACCESS_RANGE)
    }
}

impl BlockerOracle for WorldModel {
    fn can_interact(&self, performer: EntityId, _target: Option<EntityId>) -> bool {
        self.entities.get(&performer).is_some_and(|p| !p.blocked)
    }
}

/// Returns true if segment `p1-p2` properly crosses or touches `q1-q2`.
fn segments_cross(p1: (f32, f32), p2: (f32, f32), q1: (f32, f32), q2: (f32, f32)) -> bool {
    fn orient(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> f32 {
        (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
    }
    fn on_segment(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> bool {
        c.0 >= a.0.min(b.0) && c.0 <= a.0.max(b.0) && c.1 >= a.1.min(b.1) && c.1 <= a.1.max(b.1)
    }

    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}
