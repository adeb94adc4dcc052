use serde::{Deserialize, Serialize};

use wdm_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code, when the error provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod general;
pub mod packager;
pub mod platform;
pub mod update;

pub use general::*;
pub use packager::*;
pub use platform::*;
pub use update::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, debug output)
    General(GeneralEvent),

    /// External process execution
    Platform(PlatformEvent),

    /// Package transformation pipeline
    Packager(PackagerEvent),

    /// Update checks, notifications and scheduling
    Update(UpdateEvent),
}

impl AppEvent {
    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(GeneralEvent::Error { .. })
            | Self::Platform(PlatformEvent::OperationFailed { .. })
            | Self::Packager(PackagerEvent::Failed { .. })
            | Self::Update(UpdateEvent::CheckFailed { .. }) => Level::ERROR,

            Self::General(GeneralEvent::Warning { .. })
            | Self::Packager(PackagerEvent::Rejected { .. } | PackagerEvent::Warning { .. }) => {
                Level::WARN
            }

            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Platform(_)
            | Self::Packager(PackagerEvent::StageStarted { .. } | PackagerEvent::ControlsRestored)
            | Self::Update(
                UpdateEvent::ControlsDisabled
                | UpdateEvent::ControlsEnabled
                | UpdateEvent::ScheduleCancelled,
            ) => Level::DEBUG,

            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "wdm::events::general",
            Self::Platform(_) => "wdm::events::platform",
            Self::Packager(_) => "wdm::events::packager",
            Self::Update(_) => "wdm::events::update",
        }
    }
}
