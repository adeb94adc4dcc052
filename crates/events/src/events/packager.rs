//! Package transformation events

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;

/// Stages of the transformation pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackagerStage {
    Guard,
    Validate,
    Stage,
    Extract,
    LocateManifest,
    PatchManifest,
    SubstituteResources,
    BuildComponents,
    BuildProduct,
    Publish,
    LaunchInstaller,
    Cleanup,
}

impl PackagerStage {
    /// Human readable stage name used in logs and CLI output
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guard => "guard",
            Self::Validate => "validate",
            Self::Stage => "stage",
            Self::Extract => "extract",
            Self::LocateManifest => "locate manifest",
            Self::PatchManifest => "patch manifest",
            Self::SubstituteResources => "substitute resources",
            Self::BuildComponents => "build components",
            Self::BuildProduct => "build product",
            Self::Publish => "publish",
            Self::LaunchInstaller => "launch installer",
            Self::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for PackagerStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by the package transformer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PackagerEvent {
    /// A transformation run was accepted
    Started {
        run_id: String,
        source: PathBuf,
        marker: Option<String>,
    },

    /// A pipeline stage began
    StageStarted { stage: PackagerStage },

    /// A request was refused before any side effect happened
    Rejected { source: PathBuf, reason: String },

    /// A best-effort step failed; the run continues
    Warning {
        stage: PackagerStage,
        message: String,
    },

    /// Manifest was patched and identified the product
    ManifestPatched { name: String, version: String },

    /// Component packages were rebuilt
    ComponentsBuilt { count: usize },

    /// Final product package exists in the staging area
    ProductBuilt { path: PathBuf },

    /// Product package copied to its publish location
    Published { path: PathBuf },

    /// The system installer was launched against the package
    InstallerLaunched { path: PathBuf },

    /// The run finished; `success` is the single boolean outcome
    Completed { success: bool, duration_ms: u64 },

    /// The run aborted at the named stage
    Failed {
        stage: PackagerStage,
        failure: FailureContext,
    },

    /// Cleanup finished; interactive controls may be re-enabled
    ControlsRestored,
}
