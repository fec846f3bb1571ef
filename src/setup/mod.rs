//! First-run setup.
//!
//! Writes the default configuration file from the embedded template when it is
//! missing, and creates the data directory for recordings.

use std::path::Path;

/// Embedded default configuration template.
const DEFAULT_CONFIG: &str = include_str!("../../environments/voxmemo.toml");

/// Runs setup if the config file does not exist yet.
///
/// Returns whether a new config file was written.
///
/// # Errors
/// Returns an error if any file operations fail.
pub fn ensure_setup() -> anyhow::Result<bool> {
    let config_path = crate::config::config_path()?;
    if config_path.exists() {
        return Ok(false);
    }
    run_setup(&config_path)?;
    Ok(true)
}

/// Writes the default config file and creates the data directory.
///
/// # Errors
/// Returns an error if any file operations fail.
pub fn run_setup(config_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, DEFAULT_CONFIG)?;
    tracing::info!("Default configuration written to {}", config_path.display());

    let data_dir = crate::storage::data_dir()?;
    tracing::debug!("Data directory ready at {}", data_dir.display());
    Ok(())
}
