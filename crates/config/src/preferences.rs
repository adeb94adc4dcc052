//! Persisted user preferences
//!
//! Only two values survive between runs: the version whose update alerts the
//! user silenced, and whether automatic checks are allowed. They are stored in
//! `preferences.toml` inside the wdm data directory and rewritten atomically
//! (temp file + rename) on every change.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use wdm_errors::{ConfigError, Error};

/// Persisted preference values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Version string whose alerts are silenced; empty means none
    #[serde(default)]
    pub suppress_update_alerts: String,
    #[serde(default = "default_automatic_checks")]
    pub automatic_checks: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            suppress_update_alerts: String::new(),
            automatic_checks: default_automatic_checks(),
        }
    }
}

fn default_automatic_checks() -> bool {
    true
}

/// Shared handle to the preference file
///
/// Clones share the same in-memory state; writes are serialized by the
/// internal lock and persisted before the lock is released.
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: Option<PathBuf>,
    state: Arc<Mutex<Preferences>>,
}

impl PreferencesStore {
    /// Open the preference file, using defaults if it does not exist yet
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let prefs = match fs::read_to_string(&path).await {
            Ok(contents) => toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                message: format!("{}: {e}", path.display()),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Preferences::default(),
            Err(e) => return Err(Error::io_with_path(&e, &path)),
        };

        Ok(Self {
            path: Some(path),
            state: Arc::new(Mutex::new(prefs)),
        })
    }

    /// Store that never touches the filesystem
    #[must_use]
    pub fn in_memory(prefs: Preferences) -> Self {
        Self {
            path: None,
            state: Arc::new(Mutex::new(prefs)),
        }
    }

    /// Backing file, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy of the current values
    pub async fn snapshot(&self) -> Preferences {
        self.state.lock().await.clone()
    }

    /// The suppressed version, if one is set
    pub async fn suppressed_version(&self) -> Option<String> {
        let state = self.state.lock().await;
        if state.suppress_update_alerts.is_empty() {
            None
        } else {
            Some(state.suppress_update_alerts.clone())
        }
    }

    /// Silence alerts for `version`
    ///
    /// # Errors
    ///
    /// Returns an error if the preference file cannot be written.
    pub async fn suppress(&self, version: &str) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        next.suppress_update_alerts = version.trim().to_string();
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }

    /// Clear any suppressed version; returns whether one was set
    ///
    /// # Errors
    ///
    /// Returns an error if the preference file cannot be written.
    pub async fn clear_suppression(&self) -> Result<bool, Error> {
        let mut state = self.state.lock().await;
        if state.suppress_update_alerts.is_empty() {
            return Ok(false);
        }
        let mut next = state.clone();
        next.suppress_update_alerts.clear();
        self.persist(&next).await?;
        *state = next;
        Ok(true)
    }

    /// Whether automatic checks are allowed
    pub async fn automatic_checks(&self) -> bool {
        self.state.lock().await.automatic_checks
    }

    /// Toggle automatic checks; turning them on also clears suppression
    ///
    /// # Errors
    ///
    /// Returns an error if the preference file cannot be written.
    pub async fn set_automatic_checks(&self, enabled: bool) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        next.automatic_checks = enabled;
        if enabled {
            next.suppress_update_alerts.clear();
        }
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }

    async fn persist(&self, prefs: &Preferences) -> Result<(), Error> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let contents = toml::to_string(prefs).map_err(|e| ConfigError::SerializeError {
            error: e.to_string(),
        })?;

        let write_error = |e: std::io::Error| ConfigError::WriteError {
            path: path.display().to_string(),
            error: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(write_error)?;
        }

        let tmp = path.with_extension(format!("toml.{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&tmp, contents).await.map_err(write_error)?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(write_error(e).into());
        }

        tracing::debug!(path = %path.display(), "preferences saved");
        Ok(())
    }
}
