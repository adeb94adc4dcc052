//! Filesystem convenience helpers for staging trees.
//!
//! These functions return `wdm_errors::Error` with the offending path attached
//! so failures can be reported without extra context.

use std::path::Path;
use tokio::fs;
use wdm_errors::Error;

/// Result type for filesystem operations
pub type Result<T> = std::result::Result<T, Error>;

/// Check whether a path exists
pub async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Create a directory with all parent directories
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub async fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| Error::io_with_path(&e, path))
}

/// Remove a directory tree, treating a missing directory as success
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be removed.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io_with_path(&e, path)),
    }
}

/// Remove whatever is at `path` (file or directory), if anything
///
/// # Errors
///
/// Returns an error if the entry exists but cannot be removed.
pub async fn remove_path(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => remove_dir_all(path).await,
        Ok(_) => fs::remove_file(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io_with_path(&e, path)),
    }
}

/// Recursively copy a directory
///
/// # Errors
///
/// Returns an error if:
/// - Creating the destination directory fails
/// - Reading the source directory fails
/// - Copying any file or subdirectory fails
pub async fn copy_directory(src: &Path, dst: &Path) -> Result<()> {
    create_dir_all(dst).await?;

    let mut entries = fs::read_dir(src)
        .await
        .map_err(|e| Error::io_with_path(&e, src))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io_with_path(&e, src))?
    {
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        let metadata = entry
            .metadata()
            .await
            .map_err(|e| Error::io_with_path(&e, &src_path))?;
        if metadata.is_dir() {
            Box::pin(copy_directory(&src_path, &dst_path)).await?;
        } else {
            fs::copy(&src_path, &dst_path)
                .await
                .map_err(|e| Error::io_with_path(&e, &dst_path))?;
        }
    }

    Ok(())
}

/// Copy a file or directory to `dst`, replacing anything already there
///
/// # Errors
///
/// Returns an error if the old entry cannot be removed or the copy fails.
pub async fn replace_with_copy(src: &Path, dst: &Path) -> Result<()> {
    remove_path(dst).await?;

    let metadata = fs::metadata(src)
        .await
        .map_err(|e| Error::io_with_path(&e, src))?;
    if metadata.is_dir() {
        copy_directory(src, dst).await
    } else {
        if let Some(parent) = dst.parent() {
            create_dir_all(parent).await?;
        }
        fs::copy(src, dst)
            .await
            .map(|_| ())
            .map_err(|e| Error::io_with_path(&e, dst))
    }
}
