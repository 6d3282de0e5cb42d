//! Output module for harvest statistics and reports
//!
//! This module handles:
//! - Loading statistics from the download ledger
//! - Printing them to the terminal
//! - Rendering a markdown report

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_report, generate_markdown_report};
pub use stats::{load_statistics, print_statistics, HarvestStatistics};
