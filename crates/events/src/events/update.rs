use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;

/// Update feed, notification and scheduling events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateEvent {
    /// A check is about to run
    CheckStarted { on_demand: bool },

    /// The "check now" control must be disabled
    ControlsDisabled,

    /// The "check now" control may be re-enabled
    ControlsEnabled,

    /// Feed downloaded and parsed
    FeedFetched { url: String, entries: usize },

    /// The feed has no entry for the running OS build
    NoMatchingEntry { build: String },

    /// More than one feed entry matched the running OS build
    DuplicateEntries {
        build: String,
        count: usize,
        selected: String,
    },

    /// Remote version equals the installed driver
    AlreadyInstalled { version: String },

    /// Remote version was silenced by the user
    Suppressed { version: String },

    /// A newer driver is available
    UpdateAvailable {
        version: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        installed: Option<String>,
        build: String,
    },

    /// Notification handed to the notifier
    NotificationScheduled { identifier: String, delay_ms: u64 },

    /// The check could not complete
    CheckFailed { failure: FailureContext },

    /// A check finished
    CheckCompleted { notified: bool, duration_ms: u64 },

    /// Next automatic check armed
    NextCheckScheduled { in_secs: u64 },

    /// A pending timer was cancelled before it fired
    ScheduleCancelled,

    /// A version was persisted as suppressed
    SuppressionSet { version: String },

    /// Suppression was cleared
    SuppressionCleared,

    /// Driver package download began
    DownloadStarted { url: String },

    /// Driver package download finished
    DownloadCompleted { path: PathBuf, bytes: u64 },
}
