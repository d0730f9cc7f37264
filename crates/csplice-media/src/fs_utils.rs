//! Filesystem helpers for pipeline artifacts.

use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Create a directory and its parents if missing.
pub async fn ensure_dir(path: impl AsRef<Path>) -> MediaResult<()> {
    fs::create_dir_all(path.as_ref()).await.map_err(MediaError::from)
}

/// Size of a file in bytes.
pub async fn file_size(path: impl AsRef<Path>) -> MediaResult<u64> {
    let path = path.as_ref();
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(MediaError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Remove a file, logging instead of failing.
///
/// Returns `true` when the file is gone afterwards.
pub async fn remove_file_best_effort(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed {}", path.display());
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!("Failed to remove {}: {}", path.display(), e);
            false
        }
    }
}

/// Remove several files best-effort. Returns how many could not be removed.
pub async fn remove_files_best_effort<I, P>(paths: I) -> usize
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut failed = 0;
    for path in paths {
        if !remove_file_best_effort(path).await {
            failed += 1;
        }
    }
    failed
}
