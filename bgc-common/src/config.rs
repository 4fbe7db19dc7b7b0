//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Default HTTP port for the catalog service
pub const DEFAULT_PORT: u16 = 5780;

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "bgc.db";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file (`root_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Resolve the listen port: CLI argument, then environment variable, then default.
pub fn resolve_port(cli_arg: Option<u16>, env_var_name: &str) -> u16 {
    if let Some(port) = cli_arg {
        return port;
    }

    if let Ok(value) = std::env::var(env_var_name) {
        if let Ok(port) = value.parse::<u16>() {
            return port;
        }
    }

    DEFAULT_PORT
}

/// Database path inside a resolved root folder
pub fn database_path(root_folder: &std::path::Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}

/// Get configuration file path for the platform
fn locate_config_file() -> Result<PathBuf> {
    let config_path = dirs::config_dir()
        .map(|d| d.join("bgc").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if config_path.exists() {
        Ok(config_path)
    } else {
        Err(Error::Config(format!(
            "Config file not found: {}",
            config_path.display()
        )))
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("bgc"))
        .unwrap_or_else(|| PathBuf::from("./bgc_data"))
}
