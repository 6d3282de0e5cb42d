//! Checkpoint module for resuming an interrupted harvest
//!
//! The checkpoint is a three-field cursor into the nested
//! seed link → listing page → client entry loop. Exactly one checkpoint
//! exists; it is overwritten after every state-changing step and never deleted.

mod store;

pub use store::{CheckpointError, CheckpointStore};

use serde::{Deserialize, Serialize};

/// Position of the harvest in the seed link / page / entry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Index of the seed link being processed
    pub current_url_index: usize,

    /// Listing page to render next (1-based)
    pub page_num: u32,

    /// Index of the next entry to process on the current page
    pub jar_index: usize,
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self {
            current_url_index: 0,
            page_num: 1,
            jar_index: 0,
        }
    }
}

impl Checkpoint {
    /// Marks the entry at `entry_index` of the current page as processed
    pub fn advance_entry(&mut self, entry_index: usize) {
        self.jar_index = entry_index + 1;
    }

    /// Moves to the next listing page and rewinds the entry cursor
    pub fn advance_page(&mut self) {
        self.page_num += 1;
        self.jar_index = 0;
    }

    /// Moves past the seed link at `url_index` and restarts its nested loop
    pub fn advance_seed_link(&mut self, url_index: usize) {
        self.current_url_index = url_index + 1;
        self.page_num = 1;
        self.jar_index = 0;
    }
}
