//! Execution of granted actions.
//!
//! A request passes three read-only checks (membership, gating, targeting),
//! then an [`ExecutionEvent`] is dispatched to gameplay handlers. Only a
//! handled event changes the record's toggle, charge and cooldown state.
//!
//! ## Error Handling
//!
//! Every rejection is an [`ActionError`](crate::action::ActionError) and
//! leaves the world untouched. Requests for actions the performer was never
//! granted are additionally logged on the `action_admin` target.

mod event;
mod pipeline;
mod validation;

pub use event::{
    ActionTarget, ExecutionEvent, ExecutionOutcome, ExecutionRequest, PerformedAction,
    PresentationCue,
};
pub use pipeline::ADMIN_LOG_TARGET;
pub use validation::{validate_entity_target, validate_world_target};

pub(crate) use pipeline::{perform, run};
