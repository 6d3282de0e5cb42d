//! State module for tracking harvest outcomes
//!
//! # Components
//!
//! - `DownloadState`: how processing a single client entry ended (downloaded, skipped, unresolved, ...)

mod download_state;

// Re-export main types
pub use download_state::DownloadState;
