use crate::{
    error::{DetectError, DetectResult},
    types::Hops,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One trust feature: a payment is trusted when payer and payee are at most
/// `max_hops` apart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureConfig {
    pub name: String,
    pub max_hops: Hops,
}

impl FeatureConfig {
    pub fn new(name: impl Into<String>, max_hops: Hops) -> Self {
        Self {
            name: name.into(),
            max_hops,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DetectorConfig {
    /// Ordered strictest first. Each threshold must be >= the previous one.
    pub features: Vec<FeatureConfig>,
    /// Log a progress line every this many classified transactions.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
    /// Classifier threads. 1 keeps the sequential loop.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_progress_interval() -> u64 {
    100
}

fn default_workers() -> usize {
    1
}

impl Default for DetectorConfig {
    /// Friends (1 hop), friends of friends (2 hops), 4th-degree network (4 hops).
    fn default() -> Self {
        Self {
            features: vec![
                FeatureConfig::new("feature1", 1),
                FeatureConfig::new("feature2", 2),
                FeatureConfig::new("feature3", 4),
            ],
            progress_interval: default_progress_interval(),
            workers: default_workers(),
        }
    }
}

impl DetectorConfig {
    /// Load from a JSON file and validate it.
    /// In tests, use DetectorConfig::default().
    pub fn load(path: impl AsRef<Path>) -> DetectResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: DetectorConfig = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!(
            "config: loaded {} features from {}",
            config.features.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn validate(&self) -> DetectResult<()> {
        if self.features.is_empty() {
            return Err(invalid("at least one feature is required"));
        }
        for pair in self.features.windows(2) {
            if pair[1].max_hops < pair[0].max_hops {
                return Err(invalid(format!(
                    "feature '{}' ({} hops) is stricter than the preceding '{}' ({} hops)",
                    pair[1].name, pair[1].max_hops, pair[0].name, pair[0].max_hops
                )));
            }
        }
        if self.workers == 0 {
            return Err(invalid("workers must be >= 1"));
        }
        if self.progress_interval == 0 {
            return Err(invalid("progress_interval must be >= 1"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> DetectError {
    DetectError::InvalidConfig {
        reason: reason.into(),
    }
}
