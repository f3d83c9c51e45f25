//! Action domain: kinds, targeting, execution and equipment seams.
//!
//! # Module Structure
//!
//! - `targeting`: Action kinds and their targeting parameters
//! - `error`: Error types for containers, grants, execution and upgrades
//! - `execute`: Execution pipeline (membership, gating, targeting, dispatch)
//! - `equipment`: Slot flags and the get-actions-for-item event

pub mod equipment;
pub mod error;
pub mod execute;
pub mod targeting;

pub use equipment::{
    GetItemActionsEvent, ItemAction, ItemActionSource, ItemActionSources, ProvidedActions,
    ResidentActions, SlotActionTable, SlotFlags,
};
pub use error::{ActionError, ContainerError, GrantError, UpgradeError};
pub use execute::{
    ADMIN_LOG_TARGET, ActionTarget, ExecutionEvent, ExecutionOutcome, ExecutionRequest,
    PerformedAction, PresentationCue, validate_entity_target, validate_world_target,
};
pub use targeting::{
    ActionKind, EntityTargetParams, KindTag, TargetWhitelist, TargetingParams, WorldTargetParams,
};
