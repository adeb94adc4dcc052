//! Single update check

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wdm_config::{FeedMatch, PreferencesStore};
use wdm_errors::Error;
use wdm_events::{EventEmitter, EventSender, FailureContext, UpdateEvent};

use crate::feed::{self, FeedSource, RemoteUpdateEntry};
use crate::host::HostInfo;
use crate::notification::{Notifier, UpdateNotification};

/// Why a check did or did not notify
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The feed lists nothing for the running OS build
    NoMatchingEntry { build: String },
    /// The matching entry carries no version
    MissingVersion { build: String },
    AlreadyInstalled { version: String },
    Suppressed { version: String },
    /// A notification for `entry` was scheduled
    Notified {
        entry: RemoteUpdateEntry,
        installed: Option<String>,
    },
}

impl CheckOutcome {
    #[must_use]
    pub fn notified(&self) -> bool {
        matches!(self, Self::Notified { .. })
    }
}

/// Compares the vendor feed against the installed driver
#[derive(Clone)]
pub struct UpdateChecker {
    feed: Arc<dyn FeedSource>,
    host: Arc<dyn HostInfo>,
    notifier: Arc<dyn Notifier>,
    preferences: PreferencesStore,
    feed_match: FeedMatch,
    notification_delay: Duration,
    event_sender: Option<EventSender>,
}

impl EventEmitter for UpdateChecker {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl UpdateChecker {
    #[must_use]
    pub fn new(
        feed: Arc<dyn FeedSource>,
        host: Arc<dyn HostInfo>,
        notifier: Arc<dyn Notifier>,
        preferences: PreferencesStore,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            feed,
            host,
            notifier,
            preferences,
            feed_match: FeedMatch::default(),
            notification_delay: Duration::from_millis(
                wdm_config::constants::DEFAULT_NOTIFICATION_DELAY_MS,
            ),
            event_sender,
        }
    }

    /// Tie-break for several feed entries matching the OS build
    #[must_use]
    pub fn with_feed_match(mut self, feed_match: FeedMatch) -> Self {
        self.feed_match = feed_match;
        self
    }

    #[must_use]
    pub fn with_notification_delay(mut self, delay: Duration) -> Self {
        self.notification_delay = delay;
        self
    }

    #[must_use]
    pub fn preferences(&self) -> &PreferencesStore {
        &self.preferences
    }

    /// Run one check
    ///
    /// # Errors
    ///
    /// Returns an error if the feed cannot be fetched or parsed, the OS build
    /// cannot be read, or the notification cannot be delivered.
    pub async fn check(&self) -> Result<CheckOutcome, Error> {
        let entries = self.feed.fetch().await?;
        self.emit_update(UpdateEvent::FeedFetched {
            url: self.feed.location().to_string(),
            entries: entries.len(),
        });

        let build = self.host.os_build().await?;
        let selection = feed::select(&entries, &build, self.feed_match);
        let Some(entry) = selection.selected else {
            tracing::info!(%build, "no update entry for this OS build");
            self.emit_update(UpdateEvent::NoMatchingEntry {
                build: build.clone(),
            });
            return Ok(CheckOutcome::NoMatchingEntry { build });
        };

        let Some(remote) = entry.version.clone() else {
            tracing::warn!(%build, "matching update entry has no version");
            return Ok(CheckOutcome::MissingVersion { build });
        };

        if selection.matches > 1 {
            tracing::warn!(
                %build,
                count = selection.matches,
                selected = %remote,
                "feed lists several entries for this OS build"
            );
            self.emit_update(UpdateEvent::DuplicateEntries {
                build: build.clone(),
                count: selection.matches,
                selected: remote.clone(),
            });
        }

        let installed = self.host.installed_version().await;
        if installed.as_deref() == Some(remote.as_str()) {
            tracing::info!(version = %remote, "latest driver already installed");
            self.emit_update(UpdateEvent::AlreadyInstalled {
                version: remote.clone(),
            });
            return Ok(CheckOutcome::AlreadyInstalled { version: remote });
        }

        if self.preferences.suppressed_version().await.as_deref() == Some(remote.as_str()) {
            tracing::info!(version = %remote, "alerts suppressed for this version");
            self.emit_update(UpdateEvent::Suppressed {
                version: remote.clone(),
            });
            return Ok(CheckOutcome::Suppressed { version: remote });
        }

        tracing::info!(version = %remote, installed = ?installed, "driver update available");
        self.emit_update(UpdateEvent::UpdateAvailable {
            version: remote.clone(),
            installed: installed.clone(),
            build,
        });

        let notification = UpdateNotification::for_version(&remote, self.notification_delay);
        self.notifier.schedule(&notification).await?;
        self.emit_update(UpdateEvent::NotificationScheduled {
            identifier: notification.identifier.clone(),
            delay_ms: u64::try_from(notification.delay.as_millis()).unwrap_or(u64::MAX),
        });

        Ok(CheckOutcome::Notified {
            entry: entry.clone(),
            installed,
        })
    }

    /// Run one check, reducing the outcome to whether a notification was
    /// scheduled
    pub async fn check_for_updates(&self) -> bool {
        let start = Instant::now();
        let notified = match self.check().await {
            Ok(outcome) => outcome.notified(),
            Err(e) => {
                tracing::warn!(error = %e, "update check failed");
                self.emit_update(UpdateEvent::CheckFailed {
                    failure: FailureContext::from_error(&e),
                });
                false
            }
        };

        self.emit_update(UpdateEvent::CheckCompleted {
            notified,
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        });
        notified
    }
}
