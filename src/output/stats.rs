//! Statistics generation from the download ledger
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::checkpoint::Checkpoint;
use crate::state::DownloadState;
use crate::storage::{GroupSummary, RunRecord, Storage};
use crate::HarvestError;
use std::collections::HashMap;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Total number of client entries recorded
    pub total_clients: u64,

    /// Count of recorded outcomes by state
    pub downloads_by_state: HashMap<DownloadState, u64>,

    /// Per-group client and success counts
    pub groups: Vec<GroupSummary>,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,
}

impl HarvestStatistics {
    /// Number of clients whose artifact is on disk
    pub fn successful(&self) -> u64 {
        DownloadState::all_states()
            .into_iter()
            .filter(|s| s.is_success())
            .map(|s| self.downloads_by_state.get(&s).copied().unwrap_or(0))
            .sum()
    }

    /// Percentage of recorded clients whose artifact is on disk
    pub fn success_rate(&self) -> f64 {
        if self.total_clients == 0 {
            0.0
        } else {
            self.successful() as f64 / self.total_clients as f64 * 100.0
        }
    }
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> Result<HarvestStatistics, HarvestError> {
    let total_clients = storage.count_clients()?;

    let mut downloads_by_state = HashMap::new();
    for state in DownloadState::all_states() {
        let count = storage.count_downloads_by_state(state)?;
        if count > 0 {
            downloads_by_state.insert(state, count);
        }
    }

    let groups = storage.get_group_summaries()?;
    let latest_run = storage.get_latest_run()?;

    Ok(HarvestStatistics {
        total_clients,
        downloads_by_state,
        groups,
        latest_run,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics, checkpoint: Option<&Checkpoint>) {
    println!("=== Harvest Statistics ===\n");

    match checkpoint {
        Some(cp) => println!(
            "Checkpoint: seed link #{}, page {}, entry {}",
            cp.current_url_index, cp.page_num, cp.jar_index
        ),
        None => println!("Checkpoint: none"),
    }

    if let Some(run) = &stats.latest_run {
        println!(
            "Latest run: #{} started {} ({})",
            run.id,
            run.started_at,
            run.status.to_db_string()
        );
    }
    println!();

    println!("Clients recorded: {}", stats.total_clients);
    println!();

    println!("Outcomes by State:");
    let mut state_counts: Vec<_> = stats.downloads_by_state.iter().collect();
    state_counts.sort_by(|a, b| b.1.cmp(a.1));
    for (state, count) in state_counts {
        println!("  {}: {}", state, count);
    }
    println!();

    if !stats.groups.is_empty() {
        println!("Groups ({}):", stats.groups.len());
        for group in &stats.groups {
            println!(
                "  - {}: {} / {} downloaded",
                group.group_id, group.downloaded, group.clients
            );
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} clients)",
        stats.success_rate(),
        stats.successful(),
        stats.total_clients
    );
}
