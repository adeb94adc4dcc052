#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Driver update checks for wdm
//!
//! Reads the vendor feed, matches it against the running OS build and the
//! installed driver, and notifies the user about new versions. The
//! [`UpdateScheduler`] re-runs the check periodically while automatic checks
//! are enabled.

mod checker;
mod feed;
mod host;
mod notification;
pub mod plist;
mod scheduler;

pub use checker::{CheckOutcome, UpdateChecker};
pub use feed::{parse_feed, select, FeedSource, HttpFeedSource, RemoteUpdateEntry, Selection};
pub use host::{version_from_info_string, HostInfo, SystemHostInfo, INFO_STRING_KEY};
pub use notification::{
    applescript, escape_applescript, Notifier, OsascriptNotifier, UpdateNotification,
};
pub use scheduler::UpdateScheduler;

use std::path::{Path, PathBuf};
use wdm_errors::{Error, NetworkError};
use wdm_events::{EventEmitter, UpdateEvent};
use wdm_net::NetClient;

/// Download the driver package of `entry` into `dir`
///
/// # Errors
///
/// Returns an error if the entry has no download URL, the URL is invalid, or
/// the download fails.
pub async fn download_update(
    client: &NetClient,
    entry: &RemoteUpdateEntry,
    dir: &Path,
    tx: &impl EventEmitter,
) -> Result<PathBuf, Error> {
    let url = entry.download_url.as_deref().ok_or_else(|| {
        NetworkError::InvalidUrl(format!("feed entry for {} has no download URL", entry.os))
    })?;
    let parsed = wdm_net::parse_url(url)?;
    let file_name = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or("WebDriver.pkg");
    let dest = dir.join(file_name);

    tx.emit_update(UpdateEvent::DownloadStarted {
        url: url.to_string(),
    });
    let result = wdm_net::download_file(client, url, &dest, tx).await?;
    tx.emit_update(UpdateEvent::DownloadCompleted {
        path: result.path.clone(),
        bytes: result.size,
    });

    Ok(result.path)
}
