//! Command implementations.

mod fpn;
mod info;
mod run;
mod synth;
mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::ProcessorConfig;
use tracing::info;

pub use fpn::run_fpn;
pub use info::run_info;
pub use run::run_pipeline;
pub use synth::run_synth;
pub use validate::run_validate;

/// Load a config file, or fall back to the built-in defaults
fn load_config(path: Option<&Path>) -> Result<ProcessorConfig> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            info!(config = %path.display(), "Loading configuration");
            config_loader::ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => {
            info!("No configuration file given, using defaults");
            Ok(ProcessorConfig::default())
        }
    }
}
