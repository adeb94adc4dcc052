#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for wdm
//!
//! This crate handles all HTTP operations: fetching the update feed and
//! downloading driver packages, with connection pooling and retry logic.

mod client;
mod download;

pub use client::{NetClient, NetConfig};
pub use download::DownloadResult;

use reqwest::Url;
use std::path::Path;
use wdm_errors::{Error, NetworkError};
use wdm_events::EventEmitter;

/// Download a file to `dest`
///
/// # Errors
///
/// Returns an error if the URL is invalid, the download fails, or there are
/// I/O errors while writing the file.
pub async fn download_file(
    client: &NetClient,
    url: &str,
    dest: &Path,
    tx: &impl EventEmitter,
) -> Result<DownloadResult, Error> {
    let url = parse_url(url)?;
    download::execute(client, &url, dest, tx).await
}

/// Fetch text content from a URL
///
/// # Errors
///
/// Returns an error if the HTTP request fails, the server returns an error status,
/// or the response body cannot be decoded as text.
pub async fn fetch_text(
    client: &NetClient,
    url: &str,
    tx: &impl EventEmitter,
) -> Result<String, Error> {
    tx.emit_debug(format!("Fetching text from {url}"));

    let response = client.get(url).await?;

    if !response.status().is_success() {
        return Err(NetworkError::HttpError {
            status: response.status().as_u16(),
            message: response.status().to_string(),
        }
        .into());
    }

    response
        .text()
        .await
        .map_err(|e| NetworkError::DownloadFailed(e.to_string()).into())
}

/// Parse and validate a URL
///
/// # Errors
///
/// Returns an error if the URL string is malformed or invalid according to RFC 3986.
pub fn parse_url(url: &str) -> Result<Url, Error> {
    Url::parse(url).map_err(|e| NetworkError::InvalidUrl(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        assert!(parse_url("https://gfestage.nvidia.com/mac-update").is_ok());
        assert!(parse_url("not a url").is_err());
    }
}
