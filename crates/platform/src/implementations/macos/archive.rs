//! macOS installer archive operations
//!
//! Thin wrappers over the system packaging tools. Each call runs one tool to
//! completion and converts its exit status and captured streams into a
//! [`ToolOutcome`]. Captured streams are only written to the log when the
//! context has diagnostics enabled.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wdm_config::{constants, ToolsConfig};
use wdm_errors::Error;

use crate::archive::{ArchiveOperation, ArchiveOperations, ToolOutcome};
use crate::core::PlatformContext;
use crate::process::{PlatformCommand, ProcessOperations};

/// macOS implementation of archive operations
pub struct MacOSArchiveOperations {
    process: Arc<dyn ProcessOperations>,
    xar: PathBuf,
    pkgutil: PathBuf,
    productbuild: PathBuf,
    open: PathBuf,
}

impl MacOSArchiveOperations {
    #[must_use]
    pub fn new(process: Arc<dyn ProcessOperations>, tools: &ToolsConfig) -> Self {
        Self {
            process,
            xar: tools.xar.clone(),
            pkgutil: tools.pkgutil.clone(),
            productbuild: tools.productbuild.clone(),
            open: tools.open.clone(),
        }
    }

    async fn run(
        &self,
        ctx: &PlatformContext,
        operation: ArchiveOperation,
        cmd: PlatformCommand,
        artifact: Option<&Path>,
    ) -> Result<ToolOutcome, Error> {
        let tool = Path::new(cmd.program())
            .file_name()
            .map_or_else(|| cmd.program().to_string(), |n| n.to_string_lossy().into_owned());
        let line = cmd.display_line();

        tracing::debug!(operation = %operation, command = %line, "running packaging tool");
        let output = self.process.execute_command(ctx, cmd).await?;

        let artifact_exists = match artifact {
            Some(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            None => false,
        };

        let outcome = ToolOutcome {
            operation,
            tool,
            exit_code: output.status.code(),
            stdout: output.stdout_lossy(),
            stderr: output.stderr_lossy(),
            artifact: artifact.map(Path::to_path_buf),
            artifact_exists,
        };

        tracing::debug!(
            operation = %operation,
            tool = %outcome.tool,
            status = %outcome.status_label(),
            artifact_exists,
            "packaging tool finished"
        );

        if ctx.diagnostics() {
            if !outcome.stdout.trim().is_empty() {
                tracing::info!(
                    target: "wdm::tools",
                    operation = %operation,
                    stdout = %outcome.stdout.trim_end(),
                    "tool stdout"
                );
            }
            if !outcome.stderr.trim().is_empty() {
                tracing::info!(
                    target: "wdm::tools",
                    operation = %operation,
                    stderr = %outcome.stderr.trim_end(),
                    "tool stderr"
                );
            }
        }

        Ok(outcome)
    }
}

#[async_trait]
impl ArchiveOperations for MacOSArchiveOperations {
    async fn list(&self, ctx: &PlatformContext, archive: &Path) -> Result<ToolOutcome, Error> {
        let mut cmd = self.process.create_command(&self.xar);
        cmd.arg("-tf").path_arg(archive);
        self.run(ctx, ArchiveOperation::List, cmd, None).await
    }

    async fn extract(
        &self,
        ctx: &PlatformContext,
        archive: &Path,
        destination: &Path,
    ) -> Result<ToolOutcome, Error> {
        let mut cmd = self.process.create_command(&self.xar);
        cmd.arg("-xf")
            .path_arg(archive)
            .arg("-C")
            .path_arg(destination);
        self.run(ctx, ArchiveOperation::Extract, cmd, None).await
    }

    async fn build_component(
        &self,
        ctx: &PlatformContext,
        source_dir: &Path,
        output: &Path,
    ) -> Result<ToolOutcome, Error> {
        let mut cmd = self.process.create_command(&self.pkgutil);
        cmd.arg("--flatten").path_arg(source_dir).path_arg(output);
        self.run(ctx, ArchiveOperation::BuildComponent, cmd, Some(output))
            .await
    }

    async fn build_product(
        &self,
        ctx: &PlatformContext,
        source_dir: &Path,
        package_dir: &Path,
        output: &Path,
    ) -> Result<ToolOutcome, Error> {
        let mut cmd = self.process.create_command(&self.productbuild);
        cmd.arg("--distribution")
            .path_arg(&source_dir.join(constants::DISTRIBUTION_FILE))
            .arg("--package-path")
            .path_arg(package_dir);

        let resources = source_dir.join(constants::RESOURCES_DIR);
        if tokio::fs::metadata(&resources)
            .await
            .is_ok_and(|m| m.is_dir())
        {
            cmd.arg("--resources").path_arg(&resources);
        }

        cmd.path_arg(output);
        self.run(ctx, ArchiveOperation::BuildProduct, cmd, Some(output))
            .await
    }

    async fn launch_installer(
        &self,
        ctx: &PlatformContext,
        package: &Path,
    ) -> Result<ToolOutcome, Error> {
        let mut cmd = self.process.create_command(&self.open);
        cmd.arg("-b")
            .arg(constants::INSTALLER_BUNDLE_ID)
            .arg("--args")
            .path_arg(package);
        self.run(ctx, ArchiveOperation::LaunchInstaller, cmd, None)
            .await
    }
}
