//! Action prototype oracle.
//!
//! Prototypes are immutable data templates. Records are always spawned as fresh
//! instances of a prototype; a prototype itself can never be granted.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::action::ActionKind;
use crate::state::{EventKey, Presentation, PrototypeId, UpgradeDescriptor};

/// Data template an action record is spawned from.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionPrototype {
    pub id: PrototypeId,

    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,

    #[cfg_attr(feature = "serde", serde(default))]
    pub kind: ActionKind,

    /// Cooldown started after every handled execution, in seconds.
    #[cfg_attr(feature = "serde", serde(default))]
    pub use_delay_secs: Option<f32>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub charges: Option<i32>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub priority: i32,

    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub check_can_interact: bool,

    #[cfg_attr(feature = "serde", serde(default))]
    pub client_exclusive: bool,

    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub enabled: bool,

    #[cfg_attr(feature = "serde", serde(default))]
    pub toggled: bool,

    #[cfg_attr(feature = "serde", serde(default))]
    pub presentation: Presentation,

    /// Gameplay event raised at the provider when the record runs.
    #[cfg_attr(feature = "serde", serde(default))]
    pub event: Option<EventKey>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub upgrade: Option<UpgradeDescriptor>,
}

#[cfg(feature = "serde")]
fn default_true() -> bool {
    true
}

impl ActionPrototype {
    /// Creates an instant prototype with default gating.
    pub fn instant(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id: PrototypeId(id),
            kind: ActionKind::Instant,
            use_delay_secs: None,
            charges: None,
            priority: 0,
            check_can_interact: true,
            client_exclusive: false,
            enabled: true,
            toggled: false,
            presentation: Presentation::default(),
            event: None,
            upgrade: None,
        }
    }

    pub fn with_kind(mut self, kind: ActionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_use_delay(mut self, delay: Duration) -> Self {
        self.use_delay_secs = Some(delay.as_secs_f32());
        self
    }

    pub fn with_charges(mut self, charges: i32) -> Self {
        self.charges = Some(charges);
        self
    }

    pub fn with_event(mut self, event: impl Into<EventKey>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.presentation.sound = Some(sound.into());
        self
    }

    pub fn with_upgrade(mut self, upgrade: UpgradeDescriptor) -> Self {
        self.upgrade = Some(upgrade);
        self
    }

    pub fn client_exclusive(mut self) -> Self {
        self.client_exclusive = true;
        self
    }

    pub fn without_interact_check(mut self) -> Self {
        self.check_can_interact = false;
        self
    }

    pub fn use_delay(&self) -> Option<Duration> {
        self.use_delay_secs
            .filter(|secs| *secs > 0.0)
            .map(|secs| Duration::from_millis((secs * 1000.0).round() as u64))
    }
}

/// Oracle providing action prototypes by id.
pub trait PrototypeOracle: Send + Sync {
    fn prototype(&self, id: &PrototypeId) -> Option<&ActionPrototype>;
}

/// Simple in-memory prototype table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrototypeTable {
    prototypes: BTreeMap<PrototypeId, ActionPrototype>,
}

impl PrototypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a prototype, returning the one it replaced.
    pub fn insert(&mut self, prototype: ActionPrototype) -> Option<ActionPrototype> {
        self.prototypes.insert(prototype.id.clone(), prototype)
    }

    pub fn with(mut self, prototype: ActionPrototype) -> Self {
        self.insert(prototype);
        self
    }

    pub fn ids(&self) -> impl Iterator<Item = &PrototypeId> + '_ {
        self.prototypes.keys()
    }

    pub fn len(&self) -> usize {
        self.prototypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }
}

impl FromIterator<ActionPrototype> for PrototypeTable {
    fn from_iter<I: IntoIterator<Item = ActionPrototype>>(iter: I) -> Self {
        let mut table = Self::new();
        for prototype in iter {
            table.insert(prototype);
        }
        table
    }
}

impl PrototypeOracle for PrototypeTable {
    fn prototype(&self, id: &PrototypeId) -> Option<&ActionPrototype> {
        self.prototypes.get(id)
    }
}
