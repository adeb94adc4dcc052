//! Installer archive operations (xar flat packages)

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use wdm_errors::Error;

use crate::core::PlatformContext;

/// The archive operation a [`ToolOutcome`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveOperation {
    List,
    Extract,
    BuildComponent,
    BuildProduct,
    LaunchInstaller,
}

impl ArchiveOperation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Extract => "extract",
            Self::BuildComponent => "build component",
            Self::BuildProduct => "build product",
            Self::LaunchInstaller => "launch installer",
        }
    }
}

impl std::fmt::Display for ArchiveOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed result of one external tool invocation
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutcome {
    pub operation: ArchiveOperation,
    pub tool: String,
    /// `None` when the child was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// File the invocation was expected to produce
    pub artifact: Option<PathBuf>,
    pub artifact_exists: bool,
}

impl ToolOutcome {
    /// Whether the tool exited with status 0
    #[must_use]
    pub fn exited_ok(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Exit status 0 and, when an artifact is expected, the artifact exists
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exited_ok() && (self.artifact.is_none() || self.artifact_exists)
    }

    /// Whether captured stdout contains `needle`
    #[must_use]
    pub fn stdout_contains(&self, needle: &str) -> bool {
        self.stdout.contains(needle)
    }

    /// Short description of the exit status for messages
    #[must_use]
    pub fn status_label(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Operations on installer archives
///
/// Every method spawns an external tool and waits for it to exit. An `Err`
/// means the tool could not be run at all; a tool that ran and failed is
/// reported through the returned [`ToolOutcome`].
#[async_trait]
pub trait ArchiveOperations: Send + Sync {
    /// List the archive's table of contents (`xar -tf`)
    async fn list(&self, ctx: &PlatformContext, archive: &Path) -> Result<ToolOutcome, Error>;

    /// Extract the archive into an existing directory (`xar -xf … -C`)
    async fn extract(
        &self,
        ctx: &PlatformContext,
        archive: &Path,
        destination: &Path,
    ) -> Result<ToolOutcome, Error>;

    /// Flatten an expanded component package (`pkgutil --flatten`)
    async fn build_component(
        &self,
        ctx: &PlatformContext,
        source_dir: &Path,
        output: &Path,
    ) -> Result<ToolOutcome, Error>;

    /// Build the product archive from a payload and its rebuilt components
    /// (`productbuild --distribution … --package-path …`)
    async fn build_product(
        &self,
        ctx: &PlatformContext,
        source_dir: &Path,
        package_dir: &Path,
        output: &Path,
    ) -> Result<ToolOutcome, Error>;

    /// Hand the package to the system installer (`open -b com.apple.installer`)
    async fn launch_installer(
        &self,
        ctx: &PlatformContext,
        package: &Path,
    ) -> Result<ToolOutcome, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(exit_code: Option<i32>, artifact: Option<&str>, exists: bool) -> ToolOutcome {
        ToolOutcome {
            operation: ArchiveOperation::BuildComponent,
            tool: "pkgutil".into(),
            exit_code,
            stdout: String::new(),
            stderr: String::new(),
            artifact: artifact.map(PathBuf::from),
            artifact_exists: exists,
        }
    }

    #[test]
    fn success_requires_zero_exit_and_artifact() {
        assert!(outcome(Some(0), None, false).succeeded());
        assert!(outcome(Some(0), Some("/tmp/a.pkg"), true).succeeded());
        assert!(!outcome(Some(0), Some("/tmp/a.pkg"), false).succeeded());
        assert!(!outcome(Some(1), Some("/tmp/a.pkg"), true).succeeded());
        assert!(!outcome(None, None, false).succeeded());
    }

    #[test]
    fn status_labels() {
        assert_eq!(outcome(Some(3), None, false).status_label(), "exit status 3");
        assert_eq!(
            outcome(None, None, false).status_label(),
            "terminated by signal"
        );
    }
}
