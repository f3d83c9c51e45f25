//! Errors raised by the container manager, the grant engine, the execution
//! pipeline and the upgrade engine.
//!
//! None of these are shown to players. Callers log them (structural errors at
//! `error!`, forged requests at `warn!`) and otherwise treat them as "nothing
//! happened".

use crate::env::OracleError;
use crate::error::{ErrorContext, ErrorSeverity, GameError};
use crate::state::{EntityId, GameTime, PrototypeId, RecordId};

// ============================================================================
// Container Errors
// ============================================================================

/// Errors from spawning records and moving them between containers.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContainerError {
    /// No usable existing record and no prototype to spawn from.
    #[error("no existing record and no prototype id given for holder {holder}")]
    MissingPrototypeId { holder: EntityId },

    #[error("unknown action prototype '{0}'")]
    UnknownPrototype(PrototypeId),

    /// A client replica tried to spawn into a holder it does not own.
    #[error("not authoritative for holder {holder}")]
    NotAuthoritative { holder: EntityId },

    #[error("record {0} not found")]
    RecordNotFound(RecordId),

    /// `ensure` was handed a record that already rests in another holder.
    #[error("record {record} already rests in {current}, not {requested}")]
    ResidentElsewhere {
        record: RecordId,
        current: EntityId,
        requested: EntityId,
    },

    #[error("container of {holder} is full")]
    ContainerFull { holder: EntityId },

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl GameError for ContainerError {
    fn severity(&self) -> ErrorSeverity {
        use ContainerError::*;
        match self {
            MissingPrototypeId { .. } | UnknownPrototype(_) => ErrorSeverity::Internal,
            NotAuthoritative { .. } => ErrorSeverity::Validation,
            RecordNotFound(_) | ResidentElsewhere { .. } => ErrorSeverity::Internal,
            ContainerFull { .. } => ErrorSeverity::Recoverable,
            Oracle(err) => err.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        use ContainerError::*;
        match self {
            MissingPrototypeId { .. } => "CONTAINER_MISSING_PROTOTYPE_ID",
            UnknownPrototype(_) => "CONTAINER_UNKNOWN_PROTOTYPE",
            NotAuthoritative { .. } => "CONTAINER_NOT_AUTHORITATIVE",
            RecordNotFound(_) => "CONTAINER_RECORD_NOT_FOUND",
            ResidentElsewhere { .. } => "CONTAINER_RESIDENT_ELSEWHERE",
            ContainerFull { .. } => "CONTAINER_FULL",
            Oracle(err) => err.error_code(),
        }
    }
}

// ============================================================================
// Grant Errors
// ============================================================================

/// Errors from attaching a record to a performer.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GrantError {
    #[error("record {0} not found")]
    RecordNotFound(RecordId),

    /// A record must rest in some container before it can be granted.
    #[error("record {record} rests in no container and cannot be granted to {performer}")]
    NoContainer { record: RecordId, performer: EntityId },
}

impl GameError for GrantError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Internal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::RecordNotFound(_) => "GRANT_RECORD_NOT_FOUND",
            Self::NoContainer { .. } => "GRANT_NO_CONTAINER",
        }
    }
}

// ============================================================================
// Execution Errors
// ============================================================================

/// Reasons an execution request was rejected. Every rejection leaves the
/// world untouched.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionError {
    /// The performer has no grant ledger at all.
    #[error("performer has no actions")]
    PerformerHasNoActions,

    /// The record exists but is not in the performer's ledger.
    #[error("action is not granted to the performer")]
    NotGranted {
        #[cfg_attr(feature = "serde", serde(skip))]
        context: ErrorContext,
    },

    #[error("action record not found")]
    RecordNotFound,

    #[error("action is disabled")]
    Disabled,

    #[error("action is on cooldown until {until}")]
    OnCooldown { until: GameTime },

    #[error("entity-targeted action requires an entity target")]
    MissingEntityTarget,

    #[error("world-targeted action requires a world target")]
    MissingWorldTarget,

    #[error("target not found")]
    TargetNotFound,

    #[error("target is being destroyed")]
    TargetTerminating,

    #[error("target rejected by whitelist")]
    TargetNotWhitelisted,

    /// The action-blocking collaborator says the performer cannot act.
    #[error("performer cannot interact")]
    CannotInteract,

    #[error("action cannot target its performer")]
    SelfTargetNotAllowed,

    #[error("performer has no world position")]
    PerformerNotInWorld,

    #[error("target is on another map")]
    DifferentMap,

    #[error("target out of range")]
    OutOfRange,

    /// No unobstructed path and no shared container or storage.
    #[error("target is not accessible")]
    Inaccessible,

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl ActionError {
    /// Creates a NotGranted error naming the forging performer and record.
    pub fn not_granted(performer: EntityId, record: RecordId) -> Self {
        Self::NotGranted {
            context: ErrorContext::new()
                .with_entity(performer)
                .with_record(record)
                .with_message("execution requested for an action that was never granted"),
        }
    }

    /// Returns true if the request could only have been forged.
    pub fn is_forged(&self) -> bool {
        matches!(
            self,
            Self::PerformerHasNoActions | Self::NotGranted { .. } | Self::RecordNotFound
        )
    }
}

impl GameError for ActionError {
    fn severity(&self) -> ErrorSeverity {
        use ActionError::*;
        match self {
            PerformerHasNoActions | NotGranted { .. } | RecordNotFound => {
                ErrorSeverity::Validation
            }
            Disabled | OnCooldown { .. } | CannotInteract => ErrorSeverity::Recoverable,
            MissingEntityTarget | MissingWorldTarget => ErrorSeverity::Validation,
            TargetNotFound | TargetTerminating | TargetNotWhitelisted => ErrorSeverity::Validation,
            SelfTargetNotAllowed | PerformerNotInWorld | DifferentMap => ErrorSeverity::Validation,
            OutOfRange | Inaccessible => ErrorSeverity::Recoverable,
            Oracle(err) => err.severity(),
        }
    }

    fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::NotGranted { context } => Some(context),
            _ => None,
        }
    }

    fn error_code(&self) -> &'static str {
        use ActionError::*;
        match self {
            PerformerHasNoActions => "ACTION_PERFORMER_HAS_NO_ACTIONS",
            NotGranted { .. } => "ACTION_NOT_GRANTED",
            RecordNotFound => "ACTION_RECORD_NOT_FOUND",
            Disabled => "ACTION_DISABLED",
            OnCooldown { .. } => "ACTION_ON_COOLDOWN",
            MissingEntityTarget => "ACTION_MISSING_ENTITY_TARGET",
            MissingWorldTarget => "ACTION_MISSING_WORLD_TARGET",
            TargetNotFound => "ACTION_TARGET_NOT_FOUND",
            TargetTerminating => "ACTION_TARGET_TERMINATING",
            TargetNotWhitelisted => "ACTION_TARGET_NOT_WHITELISTED",
            CannotInteract => "ACTION_CANNOT_INTERACT",
            SelfTargetNotAllowed => "ACTION_SELF_TARGET_NOT_ALLOWED",
            PerformerNotInWorld => "ACTION_PERFORMER_NOT_IN_WORLD",
            DifferentMap => "ACTION_DIFFERENT_MAP",
            OutOfRange => "ACTION_OUT_OF_RANGE",
            Inaccessible => "ACTION_INACCESSIBLE",
            Oracle(err) => err.error_code(),
        }
    }
}

// ============================================================================
// Upgrade Errors
// ============================================================================

/// Errors from replacing a record with a higher tier.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UpgradeError {
    #[error("record {0} not found")]
    RecordNotFound(RecordId),

    #[error("record {0} has no upgrade table")]
    NoUpgradeDescriptor(RecordId),

    /// The requested tier is beyond the table (or the table is empty).
    #[error("level {level} is not reachable for record {record}")]
    InvalidLevel { record: RecordId, level: i32 },

    #[error("record {0} rests in no container")]
    NoContainer(RecordId),

    #[error("failed to spawn replacement: {0}")]
    Spawn(#[from] ContainerError),
}

impl GameError for UpgradeError {
    fn severity(&self) -> ErrorSeverity {
        use UpgradeError::*;
        match self {
            RecordNotFound(_) | NoUpgradeDescriptor(_) | NoContainer(_) => ErrorSeverity::Internal,
            InvalidLevel { .. } => ErrorSeverity::Validation,
            Spawn(err) => err.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        use UpgradeError::*;
        match self {
            RecordNotFound(_) => "UPGRADE_RECORD_NOT_FOUND",
            NoUpgradeDescriptor(_) => "UPGRADE_NO_DESCRIPTOR",
            InvalidLevel { .. } => "UPGRADE_INVALID_LEVEL",
            NoContainer(_) => "UPGRADE_NO_CONTAINER",
            Spawn(err) => err.error_code(),
        }
    }
}
