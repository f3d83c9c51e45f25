//! Content factory for loading everything from one data directory.

use std::path::{Path, PathBuf};

use actions_core::ActionsConfig;

use crate::loaders::{ConfigLoader, ItemKitCatalog, ItemKitLoader, LoadResult, PrototypeRegistry};

/// Content factory that loads all action content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// ├── items.ron
/// └── actions/
///     ├── innate.ron
///     └── spells.ron
/// ```
///
/// `config.toml` and `items.ron` are optional and fall back to defaults.
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load tunables from `config.toml`, or the defaults if it is absent.
    pub fn load_config(&self) -> LoadResult<ActionsConfig> {
        let path = self.data_dir.join("config.toml");
        if !path.exists() {
            return Ok(ActionsConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Load every prototype catalog under `actions/`.
    pub fn load_prototypes(&self) -> LoadResult<PrototypeRegistry> {
        PrototypeRegistry::load_dir(&self.data_dir.join("actions"))
    }

    /// Load item kits from `items.ron`, validated against `registry`.
    pub fn load_item_kits(&self, registry: &PrototypeRegistry) -> LoadResult<ItemKitCatalog> {
        let path = self.data_dir.join("items.ron");
        if !path.exists() {
            return Ok(ItemKitCatalog::default());
        }
        let kits = ItemKitLoader::load(&path)?;
        kits.validate(registry)?;
        Ok(kits)
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
