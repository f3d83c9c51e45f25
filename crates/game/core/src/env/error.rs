//! Oracle access errors.

use crate::error::{ErrorSeverity, GameError};

/// Errors that occur when a required collaborator was not supplied.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OracleError {
    /// PrototypeOracle is not available in the environment.
    #[error("PrototypeOracle not available")]
    PrototypesNotAvailable,

    /// SpatialOracle is not available in the environment.
    #[error("SpatialOracle not available")]
    SpatialNotAvailable,

    /// BlockerOracle is not available in the environment.
    #[error("BlockerOracle not available")]
    BlockerNotAvailable,
}

impl GameError for OracleError {
    fn severity(&self) -> ErrorSeverity {
        // Missing oracles are fatal - the engine cannot proceed
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        use OracleError::*;
        match self {
            PrototypesNotAvailable => "ORACLE_PROTOTYPES_NOT_AVAILABLE",
            SpatialNotAvailable => "ORACLE_SPATIAL_NOT_AVAILABLE",
            BlockerNotAvailable => "ORACLE_BLOCKER_NOT_AVAILABLE",
        }
    }
}
