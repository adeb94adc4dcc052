//! Package transformation error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PackagerError {
    #[error("a package transformation is already in progress")]
    AlreadyRunning,

    #[error("package not found: {path}")]
    SourceNotFound { path: String },

    #[error("not an installer archive: {path} ({status})")]
    NotAnArchive { path: String, status: String },

    #[error("archive {path} does not contain vendor marker '{marker}'")]
    MarkerMissing { path: String, marker: String },

    #[error("failed to prepare staging directory {path}: {message}")]
    StagingFailed { path: String, message: String },

    #[error("{tool} failed during {operation} ({status})")]
    ToolFailed {
        tool: String,
        operation: String,
        status: String,
    },

    #[error("manifest not found: {path}")]
    ManifestNotFound { path: String },

    #[error("malformed manifest {path}: {message}")]
    ManifestMalformed { path: String, message: String },

    #[error("manifest {path} is missing {field}")]
    ManifestFieldMissing { path: String, field: String },

    #[error("extracted payload contains no component packages: {path}")]
    NoComponents { path: String },

    #[error("expected artifact missing after {operation}: {path}")]
    ArtifactMissing { operation: String, path: String },

    #[error("installer launch failed for {path} ({status})")]
    InstallerLaunchFailed { path: String, status: String },
}

impl UserFacingError for PackagerError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::AlreadyRunning => Some("Wait for the current package to finish and retry."),
            Self::SourceNotFound { .. } => Some("Check the path to the driver package."),
            Self::NotAnArchive { .. } | Self::MarkerMissing { .. } => {
                Some("Select the vendor's driver installer package (.pkg).")
            }
            Self::ManifestNotFound { .. }
            | Self::ManifestMalformed { .. }
            | Self::ManifestFieldMissing { .. }
            | Self::NoComponents { .. } => {
                Some("The package layout is not recognised; it may not be a driver installer.")
            }
            Self::ToolFailed { .. } | Self::ArtifactMissing { .. } => {
                Some("Run with --debug to capture the output of the packaging tools.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::StagingFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::AlreadyRunning => "packager.already_running",
            Self::SourceNotFound { .. } => "packager.source_not_found",
            Self::NotAnArchive { .. } => "packager.not_an_archive",
            Self::MarkerMissing { .. } => "packager.marker_missing",
            Self::StagingFailed { .. } => "packager.staging",
            Self::ToolFailed { .. } => "packager.tool_failed",
            Self::ManifestNotFound { .. }
            | Self::ManifestMalformed { .. }
            | Self::ManifestFieldMissing { .. } => "packager.manifest",
            Self::NoComponents { .. } => "packager.no_components",
            Self::ArtifactMissing { .. } => "packager.artifact_missing",
            Self::InstallerLaunchFailed { .. } => "packager.installer_launch",
        })
    }
}
