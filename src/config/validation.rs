use crate::config::types::{BrowserConfig, Config, HarvestConfig, OutputConfig, SelectorConfig};
use crate::crawler::PageSelectors;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvest_config(&config.harvest)?;
    validate_browser_config(&config.browser)?;
    validate_selectors(&config.selectors)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates harvest configuration
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    validate_http_url("seed-url", &config.seed_url)?;
    validate_http_url("repository-url", &config.repository_url)?;

    if config.marker.is_empty() {
        return Err(ConfigError::Validation("marker cannot be empty".to_string()));
    }

    if config.wait_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "wait-timeout must be >= 1s, got {}s",
            config.wait_timeout
        )));
    }

    if config.download_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "download-timeout must be >= 1s, got {}s",
            config.download_timeout
        )));
    }

    if config.poll_interval < 10 {
        return Err(ConfigError::Validation(format!(
            "poll-interval must be >= 10ms, got {}ms",
            config.poll_interval
        )));
    }

    Ok(())
}

/// Validates browser configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    validate_http_url("webdriver-url", &config.webdriver_url)?;

    if let Some(path) = &config.driver_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "driver-path cannot be empty when set".to_string(),
            ));
        }
    }

    if config.startup_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "startup-timeout must be >= 1s, got {}s",
            config.startup_timeout
        )));
    }

    let mut dims = config.window_size.split(',');
    let valid_size = matches!(
        (dims.next(), dims.next(), dims.next()),
        (Some(w), Some(h), None) if w.trim().parse::<u32>().is_ok() && h.trim().parse::<u32>().is_ok()
    );
    if !valid_size {
        return Err(ConfigError::Validation(format!(
            "window-size must look like \"1920,1080\", got '{}'",
            config.window_size
        )));
    }

    Ok(())
}

/// Checks that every selector is parseable CSS
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    PageSelectors::compile(config).map(|_| ())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint-path cannot be empty".to_string(),
        ));
    }

    if config.download_dir.is_empty() {
        return Err(ConfigError::Validation(
            "download-dir cannot be empty".to_string(),
        ));
    }

    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a value is an absolute http(s) URL
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}
