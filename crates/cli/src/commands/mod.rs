//! Command implementations.

mod info;
mod run;
mod stats;
mod validate;

pub use info::run_info;
pub use run::run_query;
pub use stats::run_stats;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::EngineConfig;
use tracing::info;

/// Configuration from `path`, or the defaults.
fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        info!("No configuration file, using defaults");
        return Ok(EngineConfig::default());
    };
    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }
    info!(config = %path.display(), "Loading configuration");
    ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
