//! Headless browser access
//!
//! The repository website renders its listings client-side, so pages are loaded
//! through a real browser driven over WebDriver. Every step opens its own
//! session and closes it afterwards; nothing is shared between steps.
//!
//! - `Browser`: the seam the crawler talks to
//! - `WebDriverBrowser`: Chrome over the W3C WebDriver protocol
//! - `DriverProcess`: optionally spawns the driver executable itself

mod process;
mod webdriver;

pub use process::DriverProcess;
pub use webdriver::WebDriverBrowser;

use crate::crawler::{DownloadError, DownloadWait};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while driving the browser
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to start browser session: {0}")]
    Session(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out waiting for '{selector}' on {url}")]
    Timeout { url: String, selector: String },

    #[error("WebDriver command failed: {0}")]
    Command(String),

    #[error("WebDriver process error: {0}")]
    Driver(String),
}

impl BrowserError {
    /// Returns true if the page loaded but the awaited element never appeared
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// A browser able to render pages and trigger downloads
///
/// Implementations must use a fresh session for every call.
#[allow(async_fn_in_trait)]
pub trait Browser {
    /// Loads `url`, waits for `ready_selector` to match and returns the rendered page source
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The page source once the selector matched
    /// * `Err(BrowserError::Timeout)` - The selector never matched within the wait ceiling
    /// * `Err(BrowserError)` - Session or navigation failure
    async fn render(&self, url: &str, ready_selector: &str) -> Result<String, BrowserError>;

    /// Navigates to `url` with `dest_dir` as download directory and holds the
    /// session open until `completion` reports the file on disk
    async fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        completion: &DownloadWait,
    ) -> Result<PathBuf, DownloadError>;
}
