//! Targeting parameters for action kinds.
//!
//! An action record is one of three kinds:
//! - `Instant`: no target, executed on the performer's behalf
//! - `EntityTarget`: aimed at another (or the same) entity
//! - `WorldTarget`: aimed at a coordinate
//!
//! Each kind carries only the parameters it needs. The validators in
//! [`crate::action::execute`] interpret them.

// ============================================================================
// Action Kind
// ============================================================================

/// Kind of an action record, determining its validator and event shape.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionKind {
    /// No target required.
    #[default]
    Instant,

    /// Targets a single entity.
    EntityTarget(EntityTargetParams),

    /// Targets a world coordinate.
    WorldTarget(WorldTargetParams),
}

/// Flat discriminant of [`ActionKind`], used for logging and filtering.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::AsRefStr,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum KindTag {
    Instant,
    EntityTarget,
    WorldTarget,
}

impl ActionKind {
    /// Creates an entity-targeted kind with the given range and access check.
    pub fn entity(range: f32, check_can_access: bool) -> Self {
        Self::EntityTarget(EntityTargetParams {
            targeting: TargetingParams {
                range,
                check_can_access,
            },
            ..EntityTargetParams::default()
        })
    }

    /// Creates a world-targeted kind with the given range and access check.
    pub fn world(range: f32, check_can_access: bool) -> Self {
        Self::WorldTarget(WorldTargetParams {
            targeting: TargetingParams {
                range,
                check_can_access,
            },
        })
    }

    pub fn tag(&self) -> KindTag {
        match self {
            ActionKind::Instant => KindTag::Instant,
            ActionKind::EntityTarget(_) => KindTag::EntityTarget,
            ActionKind::WorldTarget(_) => KindTag::WorldTarget,
        }
    }

    /// Returns the shared targeting parameters, if this kind is targeted.
    pub fn targeting(&self) -> Option<&TargetingParams> {
        match self {
            ActionKind::Instant => None,
            ActionKind::EntityTarget(params) => Some(&params.targeting),
            ActionKind::WorldTarget(params) => Some(&params.targeting),
        }
    }
}

// ============================================================================
// Kind Parameters
// ============================================================================

/// Range and access policy shared by both targeted kinds.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TargetingParams {
    /// Maximum straight-line distance. Zero or negative means unlimited.
    pub range: f32,

    /// Requires an unobstructed path and a shared outer container when set.
    pub check_can_access: bool,
}

impl Default for TargetingParams {
    fn default() -> Self {
        Self {
            range: 1.5,
            check_can_access: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EntityTargetParams {
    pub targeting: TargetingParams,

    /// Optional allow/deny filter over the target's tags.
    pub whitelist: Option<TargetWhitelist>,

    /// Whether the performer may name itself as the target.
    pub can_target_self: bool,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WorldTargetParams {
    pub targeting: TargetingParams,
}

// ============================================================================
// Whitelist
// ============================================================================

/// Tag-based target filter.
///
/// A target passes when it carries none of the `deny` tags and, if
/// `require_any` is non-empty, at least one of those tags.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TargetWhitelist {
    pub require_any: Vec<String>,
    pub deny: Vec<String>,
}

impl TargetWhitelist {
    pub fn allow(tags: &[&str]) -> Self {
        Self {
            require_any: tags.iter().map(|t| (*t).to_owned()).collect(),
            deny: Vec::new(),
        }
    }

    pub fn with_deny(mut self, tags: &[&str]) -> Self {
        self.deny.extend(tags.iter().map(|t| (*t).to_owned()));
        self
    }

    /// Evaluates the filter using `has_tag` to query the target.
    pub fn admits(&self, mut has_tag: impl FnMut(&str) -> bool) -> bool {
        if self.deny.iter().any(|tag| has_tag(tag)) {
            return false;
        }
        self.require_any.is_empty() || self.require_any.iter().any(|tag| has_tag(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_deny_wins_over_allow() {
        let whitelist = TargetWhitelist::allow(&["mob"]).with_deny(&["ghost"]);
        let tags = ["mob", "ghost"];
        assert!(!whitelist.admits(|tag| tags.contains(&tag)));
        assert!(whitelist.admits(|tag| tag == "mob"));
        assert!(!whitelist.admits(|tag| tag == "item"));
    }

    #[test]
    fn empty_whitelist_admits_everything() {
        assert!(TargetWhitelist::default().admits(|_| false));
    }

    #[test]
    fn kind_tag_renders_snake_case() {
        assert_eq!(ActionKind::entity(2.0, false).tag().to_string(), "entity_target");
        assert_eq!(ActionKind::Instant.tag().as_ref(), "instant");
    }
}
