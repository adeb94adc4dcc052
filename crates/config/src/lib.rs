#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for wdm
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/wdm/config.toml)
//! - Environment variables
//! - CLI flags
//!
//! It also owns the small set of persisted user preferences
//! (see [`preferences`]), which live apart from the configuration file.

pub mod constants;
pub mod core;
pub mod preferences;

pub use self::core::{
    ColorChoice, FeedMatch, GeneralConfig, NetworkConfig, PackagerConfig, ToolsConfig,
    UpdatesConfig,
};
pub use preferences::{Preferences, PreferencesStore};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use wdm_errors::{ConfigError, Error};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub packager: PackagerConfig,

    #[serde(default)]
    pub updates: UpdatesConfig,

    #[serde(default)]
    pub network: NetworkConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir
            .join(constants::APP_DIR_NAME)
            .join(constants::CONFIG_FILE))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns an error if the contents are not valid TOML for [`Config`].
    pub fn from_toml(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Merge overrides from an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds a value that cannot be parsed.
    pub fn merge_vars<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        // WDM_FEED_URL
        if let Some(url) = lookup("WDM_FEED_URL") {
            if url.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "WDM_FEED_URL".to_string(),
                    value: url,
                }
                .into());
            }
            self.updates.feed_url = url;
        }

        // WDM_CHECK_INTERVAL
        if let Some(interval) = lookup("WDM_CHECK_INTERVAL") {
            self.updates.check_interval = match interval.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "WDM_CHECK_INTERVAL".to_string(),
                        value: interval,
                    }
                    .into())
                }
            };
        }

        // WDM_AUTO_CHECK
        if let Some(auto) = lookup("WDM_AUTO_CHECK") {
            self.updates.automatic_checks = Some(parse_bool("WDM_AUTO_CHECK", auto)?);
        }

        // WDM_TOOL_DIAGNOSTICS
        if let Some(diag) = lookup("WDM_TOOL_DIAGNOSTICS") {
            self.general.tool_diagnostics = parse_bool("WDM_TOOL_DIAGNOSTICS", diag)?;
        }

        Ok(())
    }

    /// Get the wdm data directory (preferences live here)
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be determined.
    pub fn data_dir() -> Result<PathBuf, Error> {
        let data_dir = dirs::data_dir().ok_or_else(|| ConfigError::NotFound {
            path: "data directory".to_string(),
        })?;
        Ok(data_dir.join(constants::APP_DIR_NAME))
    }

    /// Get the default preferences file path
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be determined.
    pub fn preferences_path() -> Result<PathBuf, Error> {
        Ok(Self::data_dir()?.join(constants::PREFERENCES_FILE))
    }

    /// Get the directory debug logs are written to
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be determined.
    pub fn logs_dir() -> Result<PathBuf, Error> {
        Ok(Self::data_dir()?.join(constants::LOGS_DIR))
    }

    /// Get the parent directory for staging areas (with default)
    #[must_use]
    pub fn staging_root(&self) -> PathBuf {
        self.packager
            .staging_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Get the publish directory, falling back to the desktop
    #[must_use]
    pub fn publish_dir(&self) -> Option<PathBuf> {
        self.packager.publish_dir.clone().or_else(dirs::desktop_dir)
    }
}

fn parse_bool(field: &str, value: String) -> Result<bool, Error> {
    match value.as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()),
    }
}
