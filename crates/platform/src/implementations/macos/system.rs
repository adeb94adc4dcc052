//! macOS system queries

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use wdm_errors::{Error, PlatformError};

use crate::core::PlatformContext;
use crate::process::ProcessOperations;
use crate::system::SystemOperations;

/// `sysctl`-backed system queries
pub struct MacOSSystemOperations {
    process: Arc<dyn ProcessOperations>,
    sysctl: PathBuf,
}

impl MacOSSystemOperations {
    #[must_use]
    pub fn new(process: Arc<dyn ProcessOperations>, sysctl: PathBuf) -> Self {
        Self { process, sysctl }
    }
}

#[async_trait]
impl SystemOperations for MacOSSystemOperations {
    async fn sysctl(&self, ctx: &PlatformContext, name: &str) -> Result<String, Error> {
        let mut cmd = self.process.create_command(&self.sysctl);
        cmd.arg("-n").arg(name);

        let output = self.process.execute_command(ctx, cmd).await?;
        let value = output.stdout_lossy().trim().to_string();

        if !output.status.success() || value.is_empty() {
            return Err(PlatformError::HostInfoUnavailable {
                what: name.to_string(),
            }
            .into());
        }

        Ok(value)
    }
}
