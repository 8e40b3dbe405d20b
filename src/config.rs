//! Remediator configuration, read from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// When an idle machine accepts an upgrade request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradePolicy {
    /// Any idle machine may upgrade, including a repeat upgrade on a stale view.
    #[default]
    AnyIdle,
    /// Only packages currently flagged vulnerable may upgrade.
    VulnerableOnly,
}

/// Top-level configuration.
///
/// Missing fields fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemediatorConfig {
    /// Upper bound on operations running at once during batch remediation.
    pub max_concurrent_operations: usize,

    pub upgrade_policy: UpgradePolicy,
}

impl Default for RemediatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_operations: 4,
            upgrade_policy: UpgradePolicy::default(),
        }
    }
}

impl RemediatorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_operations == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_operations must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
