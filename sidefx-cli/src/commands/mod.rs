//! CLI command implementations.

pub mod replay;
pub mod validate;

pub use replay::{replay_script, ReplayOptions};
pub use validate::validate_script;

use anyhow::{Context, Result};
use sidefx_engine::EngineConfig;
use sidefx_types::Environment;
use std::path::Path;

/// Resolve the engine configuration for a script run.
///
/// Precedence, lowest first: config file, `SIDEFX_ENVIRONMENT`, the script's
/// own `environment`, then the `--environment` flag.
pub fn resolve_config(
    config_path: Option<&Path>,
    script_environment: Option<Environment>,
    flag: Option<Environment>,
) -> Result<EngineConfig> {
    let mut config = match config_path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("Invalid environment override")?;

    if let Some(environment) = script_environment {
        config.environment = environment;
    }
    if let Some(environment) = flag {
        config.environment = environment;
    }
    Ok(config)
}
