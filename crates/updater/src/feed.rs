//! Vendor update feed
//!
//! The feed is a property list dictionary whose `updates` array holds one
//! dictionary per driver release: `OS` (the OS build it targets), `version`,
//! `downloadURL` and `checksum`.

use async_trait::async_trait;
use serde::Serialize;
use wdm_config::FeedMatch;
use wdm_errors::{Error, UpdateError};
use wdm_events::EventSender;
use wdm_net::NetClient;

use crate::plist::{self, PlistValue};

/// One release listed in the vendor feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteUpdateEntry {
    /// OS build identifier the release targets, e.g. `18A391`
    pub os: String,
    pub version: Option<String>,
    pub download_url: Option<String>,
    pub checksum: Option<String>,
}

/// Parse the feed document into its entries
///
/// Entries without an `OS` string are skipped; the other fields are optional.
///
/// # Errors
///
/// Returns `UpdateError::FeedMalformed` if the document is not a property
/// list dictionary with an `updates` array.
pub fn parse_feed(xml: &str) -> Result<Vec<RemoteUpdateEntry>, Error> {
    let root = plist::parse(xml).map_err(|e| UpdateError::FeedMalformed {
        message: e.to_string(),
    })?;
    let updates = root
        .get("updates")
        .and_then(PlistValue::as_array)
        .ok_or_else(|| UpdateError::FeedMalformed {
            message: "missing `updates` array".to_string(),
        })?;

    Ok(updates
        .iter()
        .filter_map(|update| {
            let os = update.get_str("OS")?;
            Some(RemoteUpdateEntry {
                os: os.to_string(),
                version: update.get_str("version").map(str::to_string),
                download_url: update.get_str("downloadURL").map(str::to_string),
                checksum: update.get_str("checksum").map(str::to_string),
            })
        })
        .collect())
}

/// Entries matching `build`, and the one selected according to `strategy`
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub selected: Option<&'a RemoteUpdateEntry>,
    pub matches: usize,
}

/// Select the entry for `build`
#[must_use]
pub fn select<'a>(
    entries: &'a [RemoteUpdateEntry],
    build: &str,
    strategy: FeedMatch,
) -> Selection<'a> {
    let mut matching = entries.iter().filter(|entry| entry.os == build);
    let matches = matching.clone().count();
    let selected = match strategy {
        FeedMatch::First => matching.next(),
        FeedMatch::Last => matching.last(),
    };
    Selection { selected, matches }
}

/// Where update entries come from
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Location shown in events and logs
    fn location(&self) -> &str;

    /// Fetch and parse the feed
    async fn fetch(&self) -> Result<Vec<RemoteUpdateEntry>, Error>;
}

/// The vendor feed over HTTP
pub struct HttpFeedSource {
    client: NetClient,
    url: String,
    event_sender: Option<EventSender>,
}

impl HttpFeedSource {
    #[must_use]
    pub fn new(
        client: NetClient,
        url: impl Into<String>,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            event_sender,
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    fn location(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Vec<RemoteUpdateEntry>, Error> {
        let body = wdm_net::fetch_text(&self.client, &self.url, &self.event_sender).await?;
        parse_feed(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
    <key>updates</key>
    <array>
        <dict>
            <key>OS</key><string>17G65</string>
            <key>version</key><string>387.10.10.10.40.105</string>
        </dict>
        <dict>
            <key>OS</key><string>18A391</string>
            <key>version</key><string>387.10.10.10.40.100</string>
            <key>downloadURL</key><string>https://example.invalid/100.pkg</string>
            <key>checksum</key><string>aaa</string>
        </dict>
        <dict>
            <key>version</key><string>no-os</string>
        </dict>
        <dict>
            <key>OS</key><string>18A391</string>
            <key>version</key><string>387.10.10.10.40.105</string>
        </dict>
    </array>
</dict>
</plist>"#;

    #[test]
    fn entries_without_os_are_skipped() {
        let entries = parse_feed(FEED).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[1].download_url.as_deref(),
            Some("https://example.invalid/100.pkg")
        );
        assert_eq!(entries[2].checksum, None);
    }

    #[test]
    fn duplicate_matches_follow_strategy() {
        let entries = parse_feed(FEED).unwrap();

        let last = select(&entries, "18A391", FeedMatch::Last);
        assert_eq!(last.matches, 2);
        assert_eq!(
            last.selected.and_then(|e| e.version.as_deref()),
            Some("387.10.10.10.40.105")
        );

        let first = select(&entries, "18A391", FeedMatch::First);
        assert_eq!(
            first.selected.and_then(|e| e.version.as_deref()),
            Some("387.10.10.10.40.100")
        );

        let none = select(&entries, "19A583", FeedMatch::Last);
        assert_eq!(none.matches, 0);
        assert!(none.selected.is_none());
    }

    #[test]
    fn feed_without_updates_is_malformed() {
        let err = parse_feed("<plist><dict/></plist>").unwrap_err();
        assert!(matches!(err, Error::Update(UpdateError::FeedMalformed { .. })));
        assert!(parse_feed("<html>").is_err());
    }
}
