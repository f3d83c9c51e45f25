//! Dynamic action granting and execution core.
//!
//! `actions-core` defines the relational model of action records, the
//! containers they rest in and the grant ledgers that make them usable, and
//! exposes pure, synchronous APIs shared by the authoritative server and the
//! predicting client. All writes to the model flow through
//! [`ContainerManager`], [`ActionEngine`] and [`UpgradeEngine`]; supporting
//! crates depend on the types re-exported here.
pub mod action;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod replication;
pub mod state;

pub use action::{
    ActionError, ActionKind, ActionTarget, ContainerError, EntityTargetParams, ExecutionEvent,
    ExecutionOutcome, ExecutionRequest, GetItemActionsEvent, GrantError, ItemActionSource,
    ItemActionSources, KindTag, PerformedAction, PresentationCue, SlotFlags, TargetWhitelist,
    TargetingParams, UpgradeError, WorldTargetParams,
};
pub use config::ActionsConfig;
pub use engine::{ActionEngine, ActionHandler, ContainerManager, HandlerRegistry, UpgradeEngine};
pub use env::{
    ActionEnv, ActionPrototype, BlockerOracle, Env, OracleError, PrototypeOracle, PrototypeTable,
    SpatialOracle,
};
pub use error::{ErrorContext, ErrorSeverity, GameError};
pub use replication::{
    NetEntity, NetEntityMap, NetExecutionRequest, RecordFields, ReplicationBatch,
    ReplicationError,
};
pub use state::{
    ActionContainer, ActionRecord, ActionWorld, Authority, Cooldown, EntityId, EventKey,
    GameTime, GrantLedger, InvariantViolation, MapId, Presentation, PrototypeId, RecordId,
    UpgradeDescriptor, WorldPosition,
};
