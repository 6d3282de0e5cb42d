//! Compiled page selectors
//!
//! The configured CSS selectors are parsed once, when the harvester is built
//! or the configuration is validated.

use crate::config::SelectorConfig;
use crate::ConfigError;
use scraper::Selector;

/// Configured selectors compiled once for parsing rendered pages
#[derive(Debug, Clone)]
pub struct PageSelectors {
    pub client_link: Selector,
    pub latest_release: Selector,
    pub artifact_link: Selector,
}

impl PageSelectors {
    /// Compiles every selector in `config`
    pub fn compile(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client_link: compile_one("client-link", &config.client_link)?,
            latest_release: compile_one("latest-release", &config.latest_release)?,
            artifact_link: compile_one("artifact-link", &config.artifact_link)?,
        })
    }
}

fn compile_one(name: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", name, selector, e)))
}
