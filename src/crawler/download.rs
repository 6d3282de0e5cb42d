//! Download completion
//!
//! A download triggered through the browser finishes asynchronously. Instead of
//! sleeping a fixed time, the destination directory is polled until the expected
//! file is present, non-empty, and no longer has a `.crdownload` partial beside it.

use crate::browser::BrowserError;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors that can occur while downloading an artifact
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Timed out after {timeout:?} waiting for {path}")]
    Timeout { path: PathBuf, timeout: Duration },

    #[error("Cannot derive a file name from {0}")]
    NoFileName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What to wait for after a download was triggered
#[derive(Debug, Clone)]
pub struct DownloadWait {
    /// Name the finished file will have in the destination directory
    pub file_name: String,

    /// Ceiling for the whole wait
    pub timeout: Duration,

    /// Delay between directory checks
    pub poll_interval: Duration,
}

impl DownloadWait {
    /// Waits until `file_name` is complete inside `dir`
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - Path of the finished file
    /// * `Err(DownloadError::Timeout)` - The file did not complete in time
    pub async fn wait(&self, dir: &Path) -> Result<PathBuf, DownloadError> {
        let target = dir.join(&self.file_name);
        let start = Instant::now();

        loop {
            if is_complete(dir, &self.file_name)? {
                tracing::debug!("{} complete after {:?}", target.display(), start.elapsed());
                return Ok(target);
            }

            if start.elapsed() >= self.timeout {
                return Err(DownloadError::Timeout {
                    path: target,
                    timeout: self.timeout,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Returns true if `file_name` exists in `dir`, is non-empty and is not still being written
pub fn is_complete(dir: &Path, file_name: &str) -> Result<bool, std::io::Error> {
    let partial = dir.join(format!("{}.crdownload", file_name));
    if partial.exists() {
        return Ok(false);
    }

    match std::fs::metadata(dir.join(file_name)) {
        Ok(meta) => Ok(meta.is_file() && meta.len() > 0),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
