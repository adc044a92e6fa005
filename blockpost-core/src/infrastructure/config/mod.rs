mod loader;
mod types;
pub mod validation;

pub use loader::{load_config, load_config_from_file, load_config_from_file_with_profile, DEFAULT_CONFIG_FILE};
pub use types::*;

use crate::foundation::OperatorError;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "BLOCKPOST_CONFIG_PATH";
pub const DATA_DIR_ENV: &str = "BLOCKPOST_DATA_DIR";
pub const PROFILE_ENV: &str = "BLOCKPOST_PROFILE";

/// Resolves paths from the environment, loads, and validates.
pub fn load_app_config() -> Result<AppConfig, OperatorError> {
    let data_dir = resolve_data_dir()?;
    let config_path = resolve_config_path(&data_dir)?;
    load_app_config_from_path(&config_path, &data_dir, resolve_profile().as_deref())
}

pub fn load_app_config_from_path(path: &Path, data_dir: &Path, profile: Option<&str>) -> Result<AppConfig, OperatorError> {
    let config = match profile {
        Some(profile) => load_config_from_file_with_profile(path, data_dir, profile)?,
        None => load_config_from_file(path, data_dir)?,
    };
    config.validate().map_err(|errors| OperatorError::ConfigError(format!("validation failed: {}", errors.join("; "))))?;
    Ok(config)
}

pub fn resolve_config_path(data_dir: &Path) -> Result<PathBuf, OperatorError> {
    if let Some(value) = non_empty_env(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(value));
    }
    Ok(data_dir.join(DEFAULT_CONFIG_FILE))
}

pub fn resolve_data_dir() -> Result<PathBuf, OperatorError> {
    if let Some(value) = non_empty_env(DATA_DIR_ENV) {
        return Ok(PathBuf::from(value));
    }
    let cwd = std::env::current_dir().map_err(|err| OperatorError::io("env::current_dir", err))?;
    Ok(cwd.join(".blockpost"))
}

pub fn resolve_profile() -> Option<String> {
    non_empty_env(PROFILE_ENV)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
