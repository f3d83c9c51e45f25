//! Action records: the unit of grantable capability.
//!
//! A record is an entity of its own. It sits "at rest" inside exactly one
//! holder's container and may additionally be granted to one performer.
//!
//! # Invariants
//!
//! - `attached_entity.is_some()` implies `container.is_some()`
//! - `container` names the only container whose membership set lists this record
//! - `attached_entity` names the only ledger that lists this record
//!
//! Relation fields are writable only from inside the crate; the container
//! manager and the grant engine keep both sides of every index in step.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::action::ActionKind;
use crate::env::ActionPrototype;

use super::{EntityId, EventKey, GameTime, PrototypeId, RecordId};

/// Active cooldown window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cooldown {
    pub start: GameTime,
    pub end: GameTime,
}

impl Cooldown {
    pub fn starting_at(now: GameTime, length: Duration) -> Self {
        Self {
            start: now,
            end: now + length,
        }
    }

    /// Returns true while `now` is strictly before the end of the window.
    #[inline]
    pub fn is_active(&self, now: GameTime) -> bool {
        self.end > now
    }
}

/// Presentation fields. Carried and replicated, but only `sound` and `popup`
/// influence execution (they count as an observable side effect).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Presentation {
    pub icon: Option<String>,
    pub icon_on: Option<String>,
    pub sound: Option<String>,
    pub popup: Option<String>,
    pub popup_toggle_suffix: Option<String>,
}

impl Presentation {
    /// Returns true if executing the record produces a visible or audible cue.
    pub fn has_side_effect(&self) -> bool {
        self.sound.is_some() || self.popup.as_deref().is_some_and(|p| !p.trim().is_empty())
    }
}

/// Tiered replacement table attached to a record.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UpgradeDescriptor {
    /// Current tier.
    pub level: i32,

    /// Tier → replacement prototype. Tiers up to the highest key are valid even
    /// when unmapped.
    pub levels: BTreeMap<i32, PrototypeId>,
}

impl UpgradeDescriptor {
    pub fn new(level: i32) -> Self {
        Self {
            level,
            levels: BTreeMap::new(),
        }
    }

    pub fn with_level(mut self, tier: i32, prototype: impl Into<PrototypeId>) -> Self {
        self.levels.insert(tier, prototype.into());
        self
    }

    /// Highest tier reachable, or `None` if the table is empty.
    pub fn max_level(&self) -> Option<i32> {
        self.levels.keys().next_back().copied()
    }

    /// Tiers only move forward, up to the highest mapped one.
    pub fn can_reach(&self, level: i32) -> bool {
        level > self.level && self.max_level().is_some_and(|max| level <= max)
    }

    pub fn replacement(&self, level: i32) -> Option<&PrototypeId> {
        self.levels.get(&level)
    }
}

/// One grantable capability.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionRecord {
    pub(crate) id: RecordId,
    pub(crate) prototype: PrototypeId,
    pub(crate) name: String,
    pub(crate) kind: ActionKind,

    pub(crate) enabled: bool,
    pub(crate) toggled: bool,
    pub(crate) cooldown: Option<Cooldown>,
    pub(crate) use_delay: Option<Duration>,
    pub(crate) charges: Option<i32>,
    pub(crate) priority: i32,
    pub(crate) check_can_interact: bool,
    pub(crate) client_exclusive: bool,

    pub(crate) presentation: Presentation,
    pub(crate) event: Option<EventKey>,
    pub(crate) upgrade: Option<UpgradeDescriptor>,

    // Relations
    pub(crate) container: Option<EntityId>,
    pub(crate) attached_entity: Option<EntityId>,
}

impl ActionRecord {
    /// Instantiates a fresh, unattached record from a prototype.
    pub(crate) fn from_prototype(id: RecordId, prototype: &ActionPrototype) -> Self {
        Self {
            id,
            prototype: prototype.id.clone(),
            name: prototype.name.clone(),
            kind: prototype.kind.clone(),
            enabled: prototype.enabled,
            toggled: prototype.toggled,
            cooldown: None,
            use_delay: prototype.use_delay(),
            charges: prototype.charges,
            priority: prototype.priority,
            check_can_interact: prototype.check_can_interact,
            client_exclusive: prototype.client_exclusive,
            presentation: prototype.presentation.clone(),
            event: prototype.event.clone(),
            upgrade: prototype.upgrade.clone(),
            container: None,
            attached_entity: None,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn prototype(&self) -> &PrototypeId {
        &self.prototype
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn toggled(&self) -> bool {
        self.toggled
    }

    pub fn cooldown(&self) -> Option<Cooldown> {
        self.cooldown
    }

    pub fn use_delay(&self) -> Option<Duration> {
        self.use_delay
    }

    pub fn charges(&self) -> Option<i32> {
        self.charges
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn check_can_interact(&self) -> bool {
        self.check_can_interact
    }

    pub fn client_exclusive(&self) -> bool {
        self.client_exclusive
    }

    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    pub fn event(&self) -> Option<&EventKey> {
        self.event.as_ref()
    }

    pub fn upgrade(&self) -> Option<&UpgradeDescriptor> {
        self.upgrade.as_ref()
    }

    /// Holder whose container this record currently rests in.
    pub fn container(&self) -> Option<EntityId> {
        self.container
    }

    /// Performer this record is currently granted to.
    pub fn attached_entity(&self) -> Option<EntityId> {
        self.attached_entity
    }

    /// Returns true if gating would let the record run at `now`.
    pub fn is_ready(&self, now: GameTime) -> bool {
        self.enabled && !self.cooldown.is_some_and(|c| c.is_active(now))
    }
}
