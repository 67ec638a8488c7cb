//! Engine configuration
//!
//! Environment detection lives outside the engine. Embedders either inject an
//! [`Environment`] directly or load one from a YAML file and the
//! `SIDEFX_ENVIRONMENT` variable through [`EngineConfig`].

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use sidefx_types::Environment;
use std::path::Path;

/// Variable consulted by [`EngineConfig::apply_env_overrides`]
pub const ENVIRONMENT_VAR: &str = "SIDEFX_ENVIRONMENT";

/// Label used when a wrapped unit has none of its own
pub const DEFAULT_FALLBACK_LABEL: &str = "Component";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub environment: Environment,

    #[serde(default = "default_fallback_label")]
    pub fallback_label: String,
}

fn default_fallback_label() -> String {
    String::from(DEFAULT_FALLBACK_LABEL)
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            environment: Environment::default(),
            fallback_label: default_fallback_label(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(contents)?;
        if config.fallback_label.trim().is_empty() {
            return Err(ConfigError::InvalidUnit(
                "fallback_label must not be blank".to_string(),
            ));
        }
        Ok(config)
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override fields from `SIDEFX_ENVIRONMENT` when it is set
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = std::env::var(ENVIRONMENT_VAR) {
            self.apply_environment_override(&value)?;
        }
        Ok(())
    }

    fn apply_environment_override(&mut self, value: &str) -> Result<(), ConfigError> {
        self.environment = value.parse()?;
        tracing::debug!("environment overridden to {}", self.environment);
        Ok(())
    }
}
