//! Chrome over WebDriver
//!
//! Sessions are created with capabilities that make headless Chrome behave like
//! a regular desktop browser and download files without prompting.

use crate::browser::{Browser, BrowserError};
use crate::config::BrowserConfig;
use crate::crawler::{DownloadError, DownloadWait};
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// WebDriver-backed browser
#[derive(Debug, Clone)]
pub struct WebDriverBrowser {
    config: BrowserConfig,
    wait_timeout: Duration,
}

impl WebDriverBrowser {
    /// Creates a browser that talks to the driver at `config.webdriver_url`
    ///
    /// # Arguments
    ///
    /// * `config` - Browser configuration
    /// * `wait_timeout` - Ceiling for waiting on page elements
    pub fn new(config: BrowserConfig, wait_timeout: Duration) -> Self {
        Self {
            config,
            wait_timeout,
        }
    }

    /// Builds the Chrome capabilities for a new session
    fn capabilities(&self, download_dir: Option<&Path>) -> Map<String, Value> {
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
            "--disable-gpu".to_string(),
            "--disable-extensions".to_string(),
            format!("--window-size={}", self.config.window_size.replace(' ', "")),
            format!("--user-agent={}", self.config.user_agent),
        ];
        if self.config.headless {
            args.push("--headless".to_string());
        }

        let mut prefs = json!({
            "safebrowsing.enabled": true,
            "profile.default_content_setting_values.automatic_downloads": 1,
        });
        if let Some(dir) = download_dir {
            let absolute = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
            prefs["download.default_directory"] = json!(absolute.to_string_lossy());
            prefs["download.prompt_for_download"] = json!(false);
        }

        let mut caps = Map::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": args,
                "prefs": prefs,
                "excludeSwitches": ["enable-automation"],
                "useAutomationExtension": false,
            }),
        );
        caps
    }

    /// Opens a fresh WebDriver session
    async fn open_session(&self, download_dir: Option<&Path>) -> Result<Client, BrowserError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities(download_dir));
        builder
            .connect(&self.config.webdriver_url)
            .await
            .map_err(|e| BrowserError::Session(e.to_string()))
    }

    async fn render_in(
        &self,
        client: &Client,
        url: &str,
        ready_selector: &str,
    ) -> Result<String, BrowserError> {
        client
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        match client
            .wait()
            .at_most(self.wait_timeout)
            .for_element(Locator::Css(ready_selector))
            .await
        {
            Ok(_) => {}
            Err(CmdError::WaitTimeout) => {
                return Err(BrowserError::Timeout {
                    url: url.to_string(),
                    selector: ready_selector.to_string(),
                })
            }
            Err(e) => return Err(BrowserError::Command(e.to_string())),
        }

        client
            .source()
            .await
            .map_err(|e| BrowserError::Command(e.to_string()))
    }
}

/// Closes a session, logging rather than failing when the driver already went away
async fn close_session(client: Client) {
    if let Err(e) = client.close().await {
        tracing::debug!("Failed to close browser session: {}", e);
    }
}

impl Browser for WebDriverBrowser {
    async fn render(&self, url: &str, ready_selector: &str) -> Result<String, BrowserError> {
        let client = self.open_session(None).await?;
        let result = self.render_in(&client, url, ready_selector).await;
        close_session(client).await;
        result
    }

    async fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        completion: &DownloadWait,
    ) -> Result<PathBuf, DownloadError> {
        let client = self.open_session(Some(dest_dir)).await?;

        if let Err(e) = client.goto(url).await {
            close_session(client).await;
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }
            .into());
        }

        // The browser must stay open until the file is complete.
        let result = completion.wait(dest_dir).await;
        close_session(client).await;
        result
    }
}
