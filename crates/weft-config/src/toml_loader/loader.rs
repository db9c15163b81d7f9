//! Reading a [`WeftConfig`] from TOML.

use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info, warn};
use weft_common::ConfigError;

use super::paths::{create_default_config, default_config_path};
use crate::schema::WeftConfig;
use crate::validation;

/// Parse the TOML file at `path`.
///
/// Left-out sections and keys keep their defaults. Invalid values are only
/// logged here; [`crate::load_config_from`] is the strict variant.
pub fn load_from_path(path: &Path) -> Result<WeftConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "cannot read {}: {e}",
                path.display()
            )))
        }
    };

    let config: WeftConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;

    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), error = %e, "config has invalid values");
    }

    info!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Load `config.toml` from the platform config directory, writing the
/// commented template there first if there is none.
pub fn load_default() -> Result<WeftConfig, ConfigError> {
    let path = default_config_path()?;
    match load_from_path(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            debug!(path = %path.display(), "no config file yet");
            create_default_config(&path)?;
            Ok(WeftConfig::default())
        }
        loaded => loaded,
    }
}
