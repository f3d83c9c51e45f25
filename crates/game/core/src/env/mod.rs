//! Traits describing the collaborators the action core consumes.
//!
//! Oracles expose action prototypes, spatial queries and the action-blocking
//! predicate. The [`Env`] aggregate bundles them so the managers can reach
//! everything they need without a global registry.
mod blocker;
mod error;
mod prototypes;
mod spatial;

pub use blocker::BlockerOracle;
pub use error::OracleError;
pub use prototypes::{ActionPrototype, PrototypeOracle, PrototypeTable};
pub use spatial::SpatialOracle;

/// Aggregates read-only oracles required by the managers and the pipeline.
pub struct Env<'a, P, S, B>
where
    P: PrototypeOracle + ?Sized,
    S: SpatialOracle + ?Sized,
    B: BlockerOracle + ?Sized,
{
    prototypes: Option<&'a P>,
    spatial: Option<&'a S>,
    blocker: Option<&'a B>,
}

pub type ActionEnv<'a> =
    Env<'a, dyn PrototypeOracle + 'a, dyn SpatialOracle + 'a, dyn BlockerOracle + 'a>;

impl<'a, P, S, B> Clone for Env<'a, P, S, B>
where
    P: PrototypeOracle + ?Sized,
    S: SpatialOracle + ?Sized,
    B: BlockerOracle + ?Sized,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, P, S, B> Copy for Env<'a, P, S, B>
where
    P: PrototypeOracle + ?Sized,
    S: SpatialOracle + ?Sized,
    B: BlockerOracle + ?Sized,
{
}

impl<'a, P, S, B> Env<'a, P, S, B>
where
    P: PrototypeOracle + ?Sized,
    S: SpatialOracle + ?Sized,
    B: BlockerOracle + ?Sized,
{
    pub fn new(prototypes: Option<&'a P>, spatial: Option<&'a S>, blocker: Option<&'a B>) -> Self {
        Self {
            prototypes,
            spatial,
            blocker,
        }
    }

    pub fn with_all(prototypes: &'a P, spatial: &'a S, blocker: &'a B) -> Self {
        Self::new(Some(prototypes), Some(spatial), Some(blocker))
    }

    pub fn empty() -> Self {
        Self {
            prototypes: None,
            spatial: None,
            blocker: None,
        }
    }

    /// Returns the PrototypeOracle, or an error if not available.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::PrototypesNotAvailable` if no prototype oracle was provided.
    pub fn prototypes(&self) -> Result<&'a P, OracleError> {
        self.prototypes.ok_or(OracleError::PrototypesNotAvailable)
    }

    /// Returns the SpatialOracle, or an error if not available.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::SpatialNotAvailable` if no spatial oracle was provided.
    pub fn spatial(&self) -> Result<&'a S, OracleError> {
        self.spatial.ok_or(OracleError::SpatialNotAvailable)
    }

    /// Returns the BlockerOracle, or an error if not available.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::BlockerNotAvailable` if no blocker oracle was provided.
    pub fn blocker(&self) -> Result<&'a B, OracleError> {
        self.blocker.ok_or(OracleError::BlockerNotAvailable)
    }
}

impl<'a, P, S, B> Env<'a, P, S, B>
where
    P: PrototypeOracle + 'a,
    S: SpatialOracle + 'a,
    B: BlockerOracle + 'a,
{
    /// Converts this environment into a trait-object based `ActionEnv`.
    pub fn as_action_env(&self) -> ActionEnv<'a> {
        let prototypes: Option<&'a dyn PrototypeOracle> = self.prototypes.map(|p| p as _);
        let spatial: Option<&'a dyn SpatialOracle> = self.spatial.map(|s| s as _);
        let blocker: Option<&'a dyn BlockerOracle> = self.blocker.map(|b| b as _);
        Env::new(prototypes, spatial, blocker)
    }
}
