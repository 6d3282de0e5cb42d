//! Spawning the WebDriver executable
//!
//! When `driver-path` is configured the harvester launches the driver itself on
//! the port named by `webdriver-url` and waits for its `/status` endpoint to
//! answer before any session is opened.

use crate::browser::BrowserError;
use crate::config::BrowserConfig;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use url::Url;

/// A driver process owned by the harvester; killed when dropped
#[derive(Debug)]
pub struct DriverProcess {
    child: Child,
    status_url: String,
}

impl DriverProcess {
    /// Spawns the driver at `config.driver_path` and waits until it is ready
    ///
    /// # Arguments
    ///
    /// * `config` - Browser configuration; `driver_path` must be set
    /// * `poll_interval` - Delay between readiness checks
    ///
    /// # Returns
    ///
    /// * `Ok(DriverProcess)` - The driver answered its status endpoint
    /// * `Err(BrowserError::Driver)` - Spawn failed, the process exited, or it never became ready
    pub async fn spawn(
        config: &BrowserConfig,
        poll_interval: Duration,
    ) -> Result<Self, BrowserError> {
        let path = config
            .driver_path
            .as_deref()
            .ok_or_else(|| BrowserError::Driver("driver-path is not configured".to_string()))?;

        let endpoint = Url::parse(&config.webdriver_url)
            .map_err(|e| BrowserError::Driver(format!("Invalid webdriver-url: {}", e)))?;
        let port = endpoint.port_or_known_default().ok_or_else(|| {
            BrowserError::Driver(format!("No port in webdriver-url {}", endpoint))
        })?;

        tracing::info!("Starting WebDriver {} on port {}", path, port);
        let child = Command::new(path)
            .arg(format!("--port={}", port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BrowserError::Driver(format!("Failed to spawn {}: {}", path, e)))?;

        let mut process = Self {
            child,
            status_url: format!("{}/status", config.webdriver_url.trim_end_matches('/')),
        };
        process
            .wait_until_ready(Duration::from_secs(config.startup_timeout), poll_interval)
            .await?;
        Ok(process)
    }

    /// Polls the driver's status endpoint until it answers with success
    async fn wait_until_ready(
        &mut self,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<(), BrowserError> {
        let client = reqwest::Client::builder()
            .timeout(poll_interval.max(Duration::from_secs(1)))
            .build()
            .map_err(|e| BrowserError::Driver(e.to_string()))?;
        let start = Instant::now();

        loop {
            if let Ok(Some(status)) = self.child.try_wait() {
                return Err(BrowserError::Driver(format!(
                    "WebDriver exited during startup ({})",
                    status
                )));
            }

            match client.get(&self.status_url).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!("WebDriver ready after {:?}", start.elapsed());
                    return Ok(());
                }
                Ok(response) => {
                    tracing::trace!("WebDriver status returned {}", response.status());
                }
                Err(e) => {
                    tracing::trace!("WebDriver not reachable yet: {}", e);
                }
            }

            if start.elapsed() >= timeout {
                return Err(BrowserError::Driver(format!(
                    "WebDriver not ready after {:?}",
                    timeout
                )));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Stops the driver process
    pub async fn shutdown(mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::debug!("Failed to stop WebDriver: {}", e);
        }
    }
}
