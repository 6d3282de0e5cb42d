//! URL handling module for Jar-Harvest
//!
//! This module builds repository URLs from package coordinates and resolves
//! links scraped from rendered pages.

mod repository;
mod resolve;

// Re-export main functions
pub use repository::usages_url;
pub use resolve::{file_name_from_url, resolve_href};
