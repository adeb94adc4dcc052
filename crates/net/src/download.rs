//! Streaming downloads to disk

use futures::StreamExt;
use reqwest::Url;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use wdm_errors::{Error, NetworkError};
use wdm_events::EventEmitter;

use crate::client::NetClient;

/// Outcome of a completed download
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub path: PathBuf,
    pub size: u64,
}

pub(crate) async fn execute(
    client: &NetClient,
    url: &Url,
    dest: &Path,
    tx: &impl EventEmitter,
) -> Result<DownloadResult, Error> {
    tx.emit_debug(format!("Downloading {url} to {}", dest.display()));

    let response = client.get(url.as_str()).await?;
    if !response.status().is_success() {
        return Err(NetworkError::HttpError {
            status: response.status().as_u16(),
            message: response.status().to_string(),
        }
        .into());
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io_with_path(&e, parent))?;
    }

    // A failed transfer never leaves a truncated file at `dest`.
    let partial = dest.with_extension("part");
    let result = stream_to(response, &partial).await;
    let size = match result {
        Ok(size) => size,
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
    };

    tokio::fs::rename(&partial, dest)
        .await
        .map_err(|e| Error::io_with_path(&e, dest))?;

    tracing::debug!(url = %url, path = %dest.display(), size, "download complete");
    Ok(DownloadResult {
        path: dest.to_path_buf(),
        size,
    })
}

async fn stream_to(response: reqwest::Response, path: &Path) -> Result<u64, Error> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| Error::io_with_path(&e, path))?;
    let mut stream = response.bytes_stream();
    let mut downloaded = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| NetworkError::DownloadFailed(e.to_string()))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
        downloaded += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| Error::io_with_path(&e, path))?;
    Ok(downloaded)
}
