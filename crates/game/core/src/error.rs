//! Common error infrastructure for actions-core.
//!
//! This module provides shared types and traits used across all error types in
//! the crate. Domain-specific errors (`ContainerError`, `GrantError`,
//! `ActionError`, ...) are defined next to the operations they describe.
//!
//! # Design Principles
//!
//! - **Type Safety**: each manager has its own error type with specific variants
//! - **Rich Context**: errors can carry entity, record and time for debugging
//! - **Severity Classification**: errors are categorized for logging and recovery
//! - **Quiet Rejection**: validation failures never carry player-facing text

use crate::state::{EntityId, GameTime, RecordId};

/// Severity level of an error, used for categorization and logging.
///
/// - **Recoverable**: temporary conditions (cooldown, blocked) that may pass later
/// - **Validation**: malformed or unauthorized requests, rejected without retry
/// - **Internal**: structural errors (missing container, bad prototype id)
/// - **Fatal**: the relational graph disagrees with itself
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Recoverable error - the same request may succeed later.
    ///
    /// Examples: action on cooldown, performer stunned
    Recoverable,

    /// Validation error - invalid input, should not retry without changes.
    ///
    /// Examples: action not granted, target out of range
    Validation,

    /// Internal error - a caller asked for something structurally impossible.
    ///
    /// Examples: granting a record with no container, unknown prototype id
    Internal,

    /// Fatal error - an invariant of the relational model is broken.
    ///
    /// Examples: ledger entry whose record names another performer
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Contextual information attached to errors for debugging and diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorContext {
    /// Entity that triggered the error (performer or holder).
    pub entity: Option<EntityId>,

    /// Action record involved, if any.
    pub record: Option<RecordId>,

    /// Simulation time at which the error occurred.
    pub time: Option<GameTime>,

    /// Optional static message providing additional context.
    pub message: Option<&'static str>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entity: None,
            record: None,
            time: None,
            message: None,
        }
    }

    #[must_use]
    pub const fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }

    #[must_use]
    pub const fn with_record(mut self, record: RecordId) -> Self {
        self.record = Some(record);
        self
    }

    #[must_use]
    pub const fn with_time(mut self, time: GameTime) -> Self {
        self.time = Some(time);
        self
    }

    #[must_use]
    pub const fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }
}

/// Common trait for all actions-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns the context information for this error, if available.
    fn context(&self) -> Option<&ErrorContext> {
        None
    }

    /// Returns a static string identifier for this error variant.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
