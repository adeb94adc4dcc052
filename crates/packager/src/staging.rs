//! Per-run staging area
//!
//! Layout under `<root>/<uuid>`:
//! - `tmp/` extracted payload
//! - `packages/` rebuilt component packages
//! - `<prefix>-<version>.pkg` rebuilt product package

use std::path::{Path, PathBuf};
use uuid::Uuid;
use wdm_config::constants;
use wdm_errors::{Error, PackagerError};
use wdm_platform::fs;

/// A staging directory exclusively owned by one transformation run
#[derive(Debug)]
pub struct StagingArea {
    path: PathBuf,
    staging_id: Uuid,
    cleaned: bool,
}

impl StagingArea {
    /// Create a fresh staging area named after `staging_id` under `root`
    ///
    /// A stale directory with the same name is removed first.
    ///
    /// # Errors
    ///
    /// Returns `PackagerError::StagingFailed` if the directories cannot be
    /// prepared.
    pub async fn create(root: &Path, staging_id: Uuid) -> Result<Self, Error> {
        let path = root.join(staging_id.to_string());
        let staging_failed = |e: Error| PackagerError::StagingFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        fs::remove_dir_all(&path).await.map_err(staging_failed)?;

        let area = Self {
            path: path.clone(),
            staging_id,
            cleaned: false,
        };
        fs::create_dir_all(&area.extract_dir())
            .await
            .map_err(staging_failed)?;
        fs::create_dir_all(&area.packages_dir())
            .await
            .map_err(staging_failed)?;

        tracing::debug!(path = %area.path.display(), "staging area created");
        Ok(area)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn staging_id(&self) -> Uuid {
        self.staging_id
    }

    /// Directory the archive is extracted into
    #[must_use]
    pub fn extract_dir(&self) -> PathBuf {
        self.path.join(constants::STAGING_EXTRACT_DIR)
    }

    /// Directory rebuilt component packages are written to
    #[must_use]
    pub fn packages_dir(&self) -> PathBuf {
        self.path.join(constants::STAGING_PACKAGES_DIR)
    }

    /// Path of the rebuilt product package
    #[must_use]
    pub fn product_path(&self, prefix: &str, version: &str) -> PathBuf {
        self.path.join(product_file_name(prefix, version))
    }

    /// Remove the staging area
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub async fn cleanup(mut self) -> Result<(), Error> {
        self.cleaned = true;
        fs::remove_dir_all(&self.path).await?;
        tracing::debug!(path = %self.path.display(), "staging area removed");
        Ok(())
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if !self.cleaned {
            // Best effort cleanup - ignore errors in destructor
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}

/// File name of the rebuilt product package
#[must_use]
pub fn product_file_name(prefix: &str, version: &str) -> String {
    format!("{prefix}-{version}.pkg")
}
