use serde::{Deserialize, Serialize};

/// Weights of the quality blend. The three weights should sum to 1.0;
/// the score is clamped to [0, 100] regardless.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityWeights {
    pub approval:      f64,
    pub rating:        f64,
    pub volume:        f64,
    /// Reviews needed for the full volume bonus.
    pub volume_target: u64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            approval:      0.4,
            rating:        0.4,
            volume:        0.2,
            volume_target: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DelegationConfig {
    pub enabled: bool,
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeskConfig {
    /// Capacity given to a reviewer on first access.
    pub default_max_assignments: u32,
    /// Number of most recent ratings retained per reviewer.
    pub rating_window:           usize,
    /// Score lost per position of round-robin distance.
    pub round_robin_step:        u32,
    pub quality:                 QualityWeights,
    pub delegation:              DelegationConfig,
    /// Undrained events kept before the oldest are evicted.
    pub event_journal_capacity:  usize,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            default_max_assignments: 10,
            rating_window:           100,
            round_robin_step:        10,
            quality:                 QualityWeights::default(),
            delegation:              DelegationConfig::default(),
            event_journal_capacity:  10_000,
        }
    }
}

impl DeskConfig {
    /// Load from the data/ directory.
    /// In tests, use DeskConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/desk/desk_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: DeskConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        if config.rating_window == 0 {
            anyhow::bail!("{path}: rating_window must be at least 1");
        }
        if config.event_journal_capacity == 0 {
            anyhow::bail!("{path}: event_journal_capacity must be at least 1");
        }
        log::info!(
            "config: loaded {path} (max_assignments={}, rating_window={}, delegation={})",
            config.default_max_assignments,
            config.rating_window,
            config.delegation.enabled,
        );
        Ok(config)
    }

    /// Config with hardcoded defaults for use in tests.
    pub fn default_test() -> Self {
        Self::default()
    }
}
