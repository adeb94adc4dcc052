//! Core platform abstractions and context management

use std::sync::Arc;

use wdm_config::ToolsConfig;
use wdm_events::{EventEmitter, EventSender};

use crate::archive::ArchiveOperations;
use crate::process::ProcessOperations;
use crate::system::SystemOperations;

/// Context for platform operations, providing event emission and
/// diagnostic settings
#[derive(Debug, Clone, Default)]
pub struct PlatformContext {
    event_sender: Option<EventSender>,
    diagnostics: bool,
}

impl PlatformContext {
    /// Create a new platform context with event emission capabilities
    #[must_use]
    pub fn new(event_sender: Option<EventSender>) -> Self {
        Self {
            event_sender,
            diagnostics: false,
        }
    }

    /// Surface captured tool output in the log
    #[must_use]
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Whether captured tool output should be logged
    #[must_use]
    pub fn diagnostics(&self) -> bool {
        self.diagnostics
    }
}

impl EventEmitter for PlatformContext {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

/// Main platform abstraction providing access to all platform operations
#[derive(Clone)]
pub struct Platform {
    process_ops: Arc<dyn ProcessOperations>,
    archive_ops: Arc<dyn ArchiveOperations>,
    system_ops: Arc<dyn SystemOperations>,
}

impl Platform {
    /// Create a new platform instance with the specified implementations
    #[must_use]
    pub fn new(
        process_ops: Arc<dyn ProcessOperations>,
        archive_ops: Arc<dyn ArchiveOperations>,
        system_ops: Arc<dyn SystemOperations>,
    ) -> Self {
        Self {
            process_ops,
            archive_ops,
            system_ops,
        }
    }

    /// Get the current platform (macOS) using the configured tool paths
    #[must_use]
    pub fn current(tools: &ToolsConfig) -> Self {
        crate::implementations::macos::MacOSPlatform::create(tools)
    }

    /// Shared handle to the process operations
    #[must_use]
    pub fn process(&self) -> Arc<dyn ProcessOperations> {
        Arc::clone(&self.process_ops)
    }

    /// Shared handle to the archive operations
    #[must_use]
    pub fn archive(&self) -> Arc<dyn ArchiveOperations> {
        Arc::clone(&self.archive_ops)
    }

    /// Shared handle to the system operations
    #[must_use]
    pub fn system(&self) -> Arc<dyn SystemOperations> {
        Arc::clone(&self.system_ops)
    }

    /// Create a platform context with event emission
    #[must_use]
    pub fn create_context(&self, event_sender: Option<EventSender>) -> PlatformContext {
        PlatformContext::new(event_sender)
    }
}
