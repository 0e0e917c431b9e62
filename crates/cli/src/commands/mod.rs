//! Command implementations.

mod capture;
mod info;
mod run;
mod validate;

pub use capture::run_capture;
pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::CameraBlueprint;
use tracing::info;

use crate::error::CliError;

/// Load and validate the configuration at `path`
pub(crate) fn load_blueprint(path: &Path) -> Result<CameraBlueprint> {
    info!(config = %path.display(), "Loading configuration");

    if !path.exists() {
        return Err(CliError::config_not_found(path).into());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
