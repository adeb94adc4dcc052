//! macOS-specific platform implementation

pub mod archive;
pub mod process;
pub mod system;

use std::sync::Arc;

use wdm_config::ToolsConfig;

use archive::MacOSArchiveOperations;
use process::MacOSProcessOperations;
use system::MacOSSystemOperations;

/// macOS platform implementation
pub struct MacOSPlatform;

impl MacOSPlatform {
    /// Wire the macOS implementations together using the configured tools
    #[must_use]
    pub fn create(tools: &ToolsConfig) -> crate::core::Platform {
        let process = Arc::new(MacOSProcessOperations::new());

        crate::core::Platform::new(
            process.clone(),
            Arc::new(MacOSArchiveOperations::new(process.clone(), tools)),
            Arc::new(MacOSSystemOperations::new(process, tools.sysctl.clone())),
        )
    }
}
