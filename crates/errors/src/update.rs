//! Update check error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum UpdateError {
    #[error("malformed update feed: {message}")]
    FeedMalformed { message: String },

    #[error("malformed property list: {message}")]
    PlistMalformed { message: String },

    #[error("no update entry for OS build {build}")]
    NoMatchingEntry { build: String },

    #[error("notification failed: {message}")]
    NotificationFailed { message: String },
}

impl UserFacingError for UpdateError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::FeedMalformed { .. } => {
                Some("The vendor feed changed format or the feed URL is wrong.")
            }
            Self::NoMatchingEntry { .. } => {
                Some("Run `wdm updates --all` to see the builds the feed supports.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::FeedMalformed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::FeedMalformed { .. } => "update.feed_malformed",
            Self::PlistMalformed { .. } => "update.plist_malformed",
            Self::NoMatchingEntry { .. } => "update.no_match",
            Self::NotificationFailed { .. } => "update.notification",
        })
    }
}
