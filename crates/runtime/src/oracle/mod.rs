//! Reference implementations of the collaborators the action core consumes.
//!
//! Prototypes come from `actions-content`; placement and action blocking are
//! answered by the in-memory [`WorldModel`].

mod world;

pub use world::{EntitySpec, STORAGE_ACCESS_RANGE, Wall, WorldModel};
