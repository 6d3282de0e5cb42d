use serde::Deserialize;

/// Main configuration structure for Jar-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Harvest behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Documentation page holding the table of popular packages
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    /// Base URL of the package repository website
    #[serde(rename = "repository-url")]
    pub repository_url: String,

    /// Glyph a table row's first cell must contain to be harvested
    pub marker: String,

    /// Ceiling for waiting on a page element (seconds)
    #[serde(rename = "wait-timeout")]
    pub wait_timeout: u64,

    /// Extra attempts for a listing page whose render fails
    #[serde(rename = "page-retries")]
    pub page_retries: u32,

    /// Ceiling for a download to land on disk (seconds)
    #[serde(rename = "download-timeout")]
    pub download_timeout: u64,

    /// Delay between polls of the download directory or driver (milliseconds)
    #[serde(rename = "poll-interval")]
    pub poll_interval: u64,

    /// Skip entries the ledger already records as downloaded
    #[serde(rename = "skip-downloaded")]
    pub skip_downloaded: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            seed_url: "https://github.com/sormuras/modules/blob/main/doc/Top1000-2023.txt.md"
                .to_string(),
            repository_url: "https://mvnrepository.com".to_string(),
            marker: "🧩".to_string(),
            wait_timeout: 20,
            page_retries: 0,
            download_timeout: 120,
            poll_interval: 500,
            skip_downloaded: true,
        }
    }
}

/// Headless browser configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Endpoint of the WebDriver server
    #[serde(rename = "webdriver-url")]
    pub webdriver_url: String,

    /// WebDriver executable to spawn; when absent a running driver is assumed
    #[serde(rename = "driver-path")]
    pub driver_path: Option<String>,

    /// Ceiling for a spawned driver to become ready (seconds)
    #[serde(rename = "startup-timeout")]
    pub startup_timeout: u64,

    /// Run the browser without a window
    pub headless: bool,

    /// User agent presented by the browser
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Browser window size as "width,height"
    #[serde(rename = "window-size")]
    pub window_size: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            driver_path: None,
            startup_timeout: 10,
            headless: true,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/85.0.4183.121 Safari/537.36"
                .to_string(),
            window_size: "1920,1080".to_string(),
        }
    }
}

/// CSS selectors matched against the repository website
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Anchors naming a client on a usages listing page
    #[serde(rename = "client-link")]
    pub client_link: String,

    /// "Latest release" version button on a client's profile page
    #[serde(rename = "latest-release")]
    pub latest_release: String,

    /// Artifact file anchor on a version page
    #[serde(rename = "artifact-link")]
    pub artifact_link: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            client_link: ".im .im-title a:not([href*='usages'])".to_string(),
            latest_release: ".grid .vbtn.release".to_string(),
            artifact_link: "a[href*='.jar']".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the JSON checkpoint file
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,

    /// Root directory for downloads; one sub-directory per group
    #[serde(rename = "download-dir")]
    pub download_dir: String,

    /// Path to the SQLite ledger
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: "progress.json".to_string(),
            download_dir: "jars".to_string(),
            database_path: "harvest.db".to_string(),
        }
    }
}
