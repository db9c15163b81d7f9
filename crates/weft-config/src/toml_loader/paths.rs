//! Where weft keeps its config file.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use weft_common::ConfigError;

use super::template::default_config_toml;

const APP_DIR: &str = "weft";
const FILE_NAME: &str = "config.toml";

/// `<platform config dir>/weft/config.toml`, e.g. `~/.config/weft/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(FILE_NAME))
        .ok_or_else(|| ConfigError::ParseError("no platform config directory".into()))
}

/// Write the commented template to `path`, creating missing parents.
/// An existing file is never overwritten.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        debug!(path = %path.display(), "config file exists, not overwriting");
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_failure("create", parent, &e))?;
    }
    std::fs::write(path, default_config_toml()).map_err(|e| io_failure("write", path, &e))?;

    info!(path = %path.display(), "default config written");
    Ok(())
}

fn io_failure(action: &str, path: &Path, err: &std::io::Error) -> ConfigError {
    ConfigError::ParseError(format!("cannot {action} {}: {err}", path.display()))
}
