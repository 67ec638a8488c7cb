//! Validate command implementation.

use crate::commands::resolve_config;
use crate::script::Script;
use anyhow::Result;
use sidefx_types::Environment;
use std::path::Path;

/// Check a script without running any reducer
pub fn validate_script(
    config_path: Option<&Path>,
    script_path: &Path,
    environment: Option<Environment>,
) -> Result<()> {
    let script = Script::from_file(script_path)?;
    let config = resolve_config(config_path, script.environment, environment)?;
    script.validate(config.environment)?;

    println!(
        "✓ {}: {} events, reducer {}, {}",
        script_path.display(),
        script.events.len(),
        script.reducer,
        config.environment
    );
    Ok(())
}
