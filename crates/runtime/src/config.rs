//! Runtime configuration.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use actions_core::ActionsConfig;

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Action system tunables. Replaced by the file at `config_path` if set.
    pub actions: ActionsConfig,

    /// Wall-clock tick driving the simulation clock. `None` means the clock
    /// only moves through explicit `advance` calls.
    pub tick_interval: Option<Duration>,

    pub event_buffer_size: usize,
    pub command_buffer_size: usize,

    /// TOML file with [`ActionsConfig`] overrides.
    pub config_path: Option<PathBuf>,

    /// Directory of RON prototype catalogs. The embedded catalogs are used
    /// when unset.
    pub prototype_dir: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            actions: ActionsConfig::default(),
            tick_interval: None,
            event_buffer_size: 256,
            command_buffer_size: 64,
            config_path: None,
            prototype_dir: None,
        }
    }
}

impl RuntimeConfig {
    /// Construct runtime configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ACTIONS_TICK_MS` - Wall-clock tick in milliseconds, 0 for manual (default: manual)
    /// - `ACTIONS_EVENT_BUFFER` - Per-topic event buffer (default: 256)
    /// - `ACTIONS_COMMAND_BUFFER` - Command channel capacity (default: 64)
    /// - `ACTIONS_CONFIG_PATH` - TOML tunables file
    /// - `ACTIONS_PROTOTYPE_DIR` - Directory of RON prototype catalogs
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(millis) = read_env::<u64>("ACTIONS_TICK_MS") {
            config.tick_interval = (millis > 0).then(|| Duration::from_millis(millis));
        }
        if let Some(size) = read_env::<usize>("ACTIONS_EVENT_BUFFER") {
            config.event_buffer_size = size.max(1);
        }
        if let Some(size) = read_env::<usize>("ACTIONS_COMMAND_BUFFER") {
            config.command_buffer_size = size.max(1);
        }
        config.config_path = read_env::<PathBuf>("ACTIONS_CONFIG_PATH");
        config.prototype_dir = read_env::<PathBuf>("ACTIONS_PROTOTYPE_DIR");

        config
    }

    pub fn with_tick_interval(mut self, tick: Duration) -> Self {
        self.tick_interval = Some(tick);
        self
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
