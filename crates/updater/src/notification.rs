//! Update notifications

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use wdm_config::constants;
use wdm_errors::{Error, UpdateError};
use wdm_platform::{PlatformContext, ProcessOperations};

/// A user notification announcing an available driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateNotification {
    /// Remote version; the action handler persists it as suppressed
    pub identifier: String,
    pub title: String,
    pub body: String,
    pub action: String,
    pub sound: Option<String>,
    pub delay: Duration,
}

impl UpdateNotification {
    #[must_use]
    pub fn for_version(version: &str, delay: Duration) -> Self {
        Self {
            identifier: version.to_string(),
            title: constants::NOTIFICATION_TITLE.to_string(),
            body: format!("{version} available"),
            action: constants::NOTIFICATION_ACTION.to_string(),
            sound: Some("default".to_string()),
            delay,
        }
    }
}

/// Delivers notifications to the user
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `notification` after its delay
    async fn schedule(&self, notification: &UpdateNotification) -> Result<(), Error>;
}

/// Notification Center delivery through `osascript`
///
/// AppleScript notifications carry no action buttons; the action is named in
/// the subtitle together with the command that performs it.
pub struct OsascriptNotifier {
    process: Arc<dyn ProcessOperations>,
    ctx: PlatformContext,
    osascript: PathBuf,
}

impl OsascriptNotifier {
    #[must_use]
    pub fn new(
        process: Arc<dyn ProcessOperations>,
        ctx: PlatformContext,
        osascript: impl Into<PathBuf>,
    ) -> Self {
        Self {
            process,
            ctx,
            osascript: osascript.into(),
        }
    }
}

/// AppleScript statement displaying `notification`
#[must_use]
pub fn applescript(notification: &UpdateNotification) -> String {
    let subtitle = format!(
        "{}: wdm suppress {}",
        notification.action, notification.identifier
    );
    let mut script = format!(
        "display notification \"{}\" with title \"{}\" subtitle \"{}\"",
        escape_applescript(&notification.body),
        escape_applescript(&notification.title),
        escape_applescript(&subtitle),
    );
    if let Some(sound) = &notification.sound {
        script.push_str(&format!(" sound name \"{}\"", escape_applescript(sound)));
    }
    script
}

/// Escape a value for an AppleScript string literal
#[must_use]
pub fn escape_applescript(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[async_trait]
impl Notifier for OsascriptNotifier {
    async fn schedule(&self, notification: &UpdateNotification) -> Result<(), Error> {
        tokio::time::sleep(notification.delay).await;

        let mut cmd = self.process.create_command(&self.osascript);
        cmd.arg("-e").arg(applescript(notification));

        let output = self.process.execute_command(&self.ctx, cmd).await?;
        if !output.status.success() {
            return Err(UpdateError::NotificationFailed {
                message: output.stderr_lossy().trim().to_string(),
            }
            .into());
        }

        tracing::info!(identifier = %notification.identifier, "update notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_content() {
        let n = UpdateNotification::for_version("387.10.10.10.40.105", Duration::from_secs(1));
        assert_eq!(n.identifier, "387.10.10.10.40.105");
        assert_eq!(n.title, "NVIDIA Web Driver");
        assert_eq!(n.body, "387.10.10.10.40.105 available");
        assert_eq!(n.action, "Don't Show Again");

        assert_eq!(
            applescript(&n),
            "display notification \"387.10.10.10.40.105 available\" \
             with title \"NVIDIA Web Driver\" \
             subtitle \"Don't Show Again: wdm suppress 387.10.10.10.40.105\" \
             sound name \"default\""
        );
    }

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(escape_applescript(r#"a "b" \c"#), r#"a \"b\" \\c"#);
    }
}
