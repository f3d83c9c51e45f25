//! Execution events and outcomes.
//!
//! This module provides:
//! - `ExecutionRequest`: what a client asks for (carries no authority)
//! - `ExecutionEvent`: what handlers receive once the core authorized it
//! - `ExecutionOutcome`: what the caller gets back

use crate::action::KindTag;
use crate::state::{Cooldown, EntityId, EventKey, Presentation, RecordId, WorldPosition};

// ============================================================================
// Request
// ============================================================================

/// Request to execute a granted action, as received from a performer.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutionRequest {
    pub action: RecordId,
    pub entity_target: Option<EntityId>,
    pub world_target: Option<WorldPosition>,
}

impl ExecutionRequest {
    pub fn instant(action: RecordId) -> Self {
        Self {
            action,
            entity_target: None,
            world_target: None,
        }
    }

    pub fn at_entity(action: RecordId, target: EntityId) -> Self {
        Self {
            entity_target: Some(target),
            ..Self::instant(action)
        }
    }

    pub fn at_world(action: RecordId, target: WorldPosition) -> Self {
        Self {
            world_target: Some(target),
            ..Self::instant(action)
        }
    }

    /// Target carried by the request, preferring an entity over a coordinate.
    pub fn target(&self) -> ActionTarget {
        match (self.entity_target, self.world_target) {
            (Some(entity), _) => ActionTarget::Entity(entity),
            (None, Some(position)) => ActionTarget::World(position),
            (None, None) => ActionTarget::None,
        }
    }
}

/// Validated target of an execution.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionTarget {
    #[default]
    None,
    Entity(EntityId),
    World(WorldPosition),
}

// ============================================================================
// Event
// ============================================================================

/// Kind-specific payload raised at the provider once an execution passed
/// membership, gating and targeting.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionEvent {
    pub performer: EntityId,
    pub action: RecordId,

    /// Entity the record rests in (the performer itself for innate actions).
    pub provider: EntityId,

    /// Gameplay event key configured on the record.
    pub event: Option<EventKey>,

    pub kind: KindTag,
    pub target: ActionTarget,

    /// Set by a handler that did something observable.
    pub handled: bool,

    /// Toggle state a handler wants the record to end up in. Applied only when
    /// the event ends handled.
    pub toggle: Option<bool>,
}

impl ExecutionEvent {
    /// Marks the event handled.
    pub fn handle(&mut self) {
        self.handled = true;
    }

    /// Marks the event handled and requests a toggle change.
    pub fn handle_toggle(&mut self, toggled: bool) {
        self.handled = true;
        self.toggle = Some(toggled);
    }

    pub fn entity_target(&self) -> Option<EntityId> {
        match self.target {
            ActionTarget::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn world_target(&self) -> Option<WorldPosition> {
        match self.target {
            ActionTarget::World(position) => Some(position),
            _ => None,
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Sound and popup emitted by a successful execution.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PresentationCue {
    pub sound: Option<String>,
    pub popup: Option<String>,
}

impl PresentationCue {
    /// Builds the cue for a record, or `None` if it has nothing to present.
    ///
    /// The popup carries the toggle suffix while the record is toggled on.
    pub fn from_presentation(presentation: &Presentation, toggled: bool) -> Option<Self> {
        if !presentation.has_side_effect() {
            return None;
        }

        let popup = presentation
            .popup
            .as_deref()
            .filter(|popup| !popup.trim().is_empty())
            .map(|popup| match presentation.popup_toggle_suffix.as_deref() {
                Some(suffix) if toggled && !suffix.trim().is_empty() => format!("{popup}{suffix}"),
                _ => popup.to_owned(),
            });

        Some(Self {
            sound: presentation.sound.clone(),
            popup,
        })
    }
}

/// Summary of a handled execution after bookkeeping.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerformedAction {
    pub performer: EntityId,
    pub action: RecordId,
    pub provider: EntityId,
    pub target: ActionTarget,
    pub charges: Option<i32>,
    pub enabled: bool,
    pub toggled: bool,
    pub cooldown: Option<Cooldown>,
    pub cue: Option<PresentationCue>,
}

/// Result of a request that passed validation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExecutionOutcome {
    /// A handler or a presentation cue handled the event; bookkeeping applied.
    Performed(PerformedAction),

    /// Nothing handled the event. No state changed.
    Unhandled { performer: EntityId, action: RecordId },
}

impl ExecutionOutcome {
    pub fn is_performed(&self) -> bool {
        matches!(self, Self::Performed(_))
    }

    pub fn action(&self) -> RecordId {
        match self {
            Self::Performed(performed) => performed.action,
            Self::Unhandled { action, .. } => *action,
        }
    }
}
