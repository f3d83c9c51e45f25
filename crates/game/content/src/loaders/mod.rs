//! Content loaders for reading action data from files.
//!
//! Loaders convert RON/TOML files into core types. All of them deserialize the
//! core's own types directly through its `serde` feature.

pub mod config;
pub mod factory;
pub mod items;
pub mod prototypes;

pub use config::ConfigLoader;
pub use factory::ContentFactory;
pub use items::{ItemKit, ItemKitCatalog, ItemKitLoader};
pub use prototypes::PrototypeRegistry;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
