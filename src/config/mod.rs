//! Configuration module for Jar-Harvest
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file. Every key has a default, so a harvest can run without one.
//!
//! # Example
//!
//! ```no_run
//! use jar_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Downloads go to: {}", config.output.download_dir);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{BrowserConfig, Config, HarvestConfig, OutputConfig, SelectorConfig};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default, parse_config};
