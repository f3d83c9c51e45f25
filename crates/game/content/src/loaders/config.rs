//! Action system configuration loader.

use std::path::Path;

use actions_core::ActionsConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for [`ActionsConfig`] from TOML files.
///
/// Every key is optional; missing keys fall back to the core defaults.
///
/// ```toml
/// cooldown_sweep_interval_ms = 10000
/// cooldown_expiry_grace_ms = 0
/// default_container_capacity = 32
/// ```
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    pub fn load(path: &Path) -> LoadResult<ActionsConfig> {
        let content = read_file(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| anyhow::anyhow!("{} ({})", e, path.display()))
    }

    /// Parse config data from TOML text.
    pub fn from_toml_str(content: &str) -> LoadResult<ActionsConfig> {
        let config: ActionsConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;

        if config.cooldown_sweep_interval_ms == 0 {
            anyhow::bail!("cooldown_sweep_interval_ms must be positive");
        }
        Ok(config)
    }
}
