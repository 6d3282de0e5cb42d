//! Markdown report generation
//!
//! This module renders harvest statistics as a human-readable markdown report.

use crate::checkpoint::Checkpoint;
use crate::output::stats::HarvestStatistics;
use crate::state::DownloadState;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown report for `stats` to `output_path`
pub fn generate_markdown_report(
    stats: &HarvestStatistics,
    checkpoint: Option<&Checkpoint>,
    output_path: &Path,
) -> std::io::Result<()> {
    let markdown = format_markdown_report(stats, checkpoint);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats harvest statistics as markdown
pub fn format_markdown_report(stats: &HarvestStatistics, checkpoint: Option<&Checkpoint>) -> String {
    let mut md = String::new();

    md.push_str("# Jar-Harvest Report\n\n");

    md.push_str("## Run Information\n\n");
    match &stats.latest_run {
        Some(run) => {
            md.push_str(&format!("- **Run ID**: {}\n", run.id));
            md.push_str(&format!("- **Started**: {}\n", run.started_at));
            if let Some(finished) = &run.finished_at {
                md.push_str(&format!("- **Finished**: {}\n", finished));
            }
            md.push_str(&format!("- **Status**: {}\n", run.status.to_db_string()));
        }
        None => md.push_str("- No runs recorded\n"),
    }
    if let Some(cp) = checkpoint {
        md.push_str(&format!(
            "- **Checkpoint**: seed link #{}, page {}, entry {}\n",
            cp.current_url_index, cp.page_num, cp.jar_index
        ));
    }
    md.push('\n');

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Clients Recorded**: {}\n", stats.total_clients));
    md.push_str(&format!("- **Artifacts On Disk**: {}\n", stats.successful()));
    md.push_str(&format!("- **Success Rate**: {:.2}%\n\n", stats.success_rate()));

    md.push_str("## Outcome Breakdown\n\n");
    md.push_str("| State | Count |\n");
    md.push_str("|-------|-------|\n");
    for state in DownloadState::all_states() {
        let count = stats.downloads_by_state.get(&state).copied().unwrap_or(0);
        md.push_str(&format!("| {} | {} |\n", state, count));
    }
    md.push('\n');

    if !stats.groups.is_empty() {
        md.push_str("## Groups\n\n");
        md.push_str("| Group | Clients | Downloaded |\n");
        md.push_str("|-------|---------|------------|\n");
        for group in &stats.groups {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                group.group_id, group.clients, group.downloaded
            ));
        }
        md.push('\n');
    }

    md
}
