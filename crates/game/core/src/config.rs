use std::time::Duration;

/// Action system configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ActionsConfig {
    /// How often the cooldown sweep scans grant ledgers, in milliseconds.
    pub cooldown_sweep_interval_ms: u64,

    /// How long an expired cooldown marker is kept before the sweep evicts it,
    /// in milliseconds.
    pub cooldown_expiry_grace_ms: u64,

    /// Capacity given to containers created implicitly. `None` means unbounded.
    pub default_container_capacity: Option<usize>,
}

impl ActionsConfig {
    // ===== runtime-tunable defaults =====
    pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 10_000;
    pub const DEFAULT_EXPIRY_GRACE_MS: u64 = 0;

    pub fn new() -> Self {
        Self {
            cooldown_sweep_interval_ms: Self::DEFAULT_SWEEP_INTERVAL_MS,
            cooldown_expiry_grace_ms: Self::DEFAULT_EXPIRY_GRACE_MS,
            default_container_capacity: None,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.cooldown_sweep_interval_ms)
    }

    pub fn expiry_grace(&self) -> Duration {
        Duration::from_millis(self.cooldown_expiry_grace_ms)
    }

    pub fn with_container_capacity(mut self, capacity: usize) -> Self {
        self.default_container_capacity = Some(capacity);
        self
    }
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self::new()
    }
}
