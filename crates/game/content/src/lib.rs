//! Data-driven action content and loaders.
//!
//! This crate houses the static action catalog and provides loaders for
//! RON/TOML data files:
//! - Action prototypes (data-driven via RON)
//! - Item kits declaring the actions an item provides per slot (RON)
//! - Action system tunables (data-driven via TOML)
//!
//! Content is consumed through the core's prototype oracle and never appears
//! in the action world itself.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    ConfigLoader, ContentFactory, ItemKit, ItemKitCatalog, ItemKitLoader, LoadResult,
    PrototypeRegistry,
};
