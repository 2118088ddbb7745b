//! Configuration loading and resolution
//!
//! Each setting is resolved in priority order:
//! 1. Command-line argument or its environment variable (merged by the caller)
//! 2. TOML config file
//! 3. OS-dependent compiled default
//!
//! A missing config file is not fatal: the service starts with defaults. A
//! config file named explicitly must exist.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default HTTP bind address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5780";

/// Default tracing filter directive
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Database file name inside the data folder
pub const DATABASE_FILE_NAME: &str = "syntaxia.db";

/// Settings as they appear in `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub bind_addr: Option<String>,
    pub database_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Values supplied on the command line (or through their env fallbacks)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub database_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub log_level: String,
    /// Config file the values were read from, `None` when running on defaults
    pub config_file: Option<PathBuf>,
}

impl ServiceConfig {
    /// Resolve configuration from overrides, config file and defaults
    ///
    /// Runs before tracing is installed, so the caller reports `config_file`.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        let config_file = match &overrides.config_file {
            Some(path) if !path.exists() => {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => Some(path.clone()),
            None => find_config_file(),
        };

        let toml_config = match &config_file {
            Some(path) => load_toml_config(path)?,
            None => TomlConfig::default(),
        };

        Ok(Self::merge(overrides, toml_config, config_file))
    }

    fn merge(overrides: ConfigOverrides, file: TomlConfig, config_file: Option<PathBuf>) -> Self {
        Self {
            bind_addr: overrides
                .bind_addr
                .or(file.bind_addr)
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_path: overrides
                .database_path
                .or(file.database_path)
                .unwrap_or_else(default_database_path),
            log_level: overrides
                .log_level
                .or(file.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            config_file,
        }
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str::<TomlConfig>(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
}

/// Locate the platform config file, if any
///
/// Linux checks `~/.config/syntaxia/config.toml` then
/// `/etc/syntaxia/config.toml`; other platforms only the user config dir.
pub fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("syntaxia").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/syntaxia/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    let data_folder = if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("syntaxia"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/syntaxia"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("syntaxia"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/syntaxia"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("syntaxia"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\syntaxia"))
    } else {
        PathBuf::from("./syntaxia_data")
    };

    data_folder.join(DATABASE_FILE_NAME)
}
