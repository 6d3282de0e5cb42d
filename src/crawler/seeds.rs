//! Seed link extraction
//!
//! The seed page carries a table of popular packages. A row is harvested when
//! its first cell contains the marker glyph and its third cell holds a
//! `group:artifact` coordinate; every harvested row becomes the usages listing
//! URL of that package.

use crate::crawler::fetcher::fetch_page;
use crate::url::usages_url;
use crate::HarvestError;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

/// A usages listing to walk, derived from one seed table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedLink {
    /// Group identifier of the package
    pub group_id: String,

    /// Artifact identifier of the package
    pub artifact_id: String,

    /// Listing URL ending in the page-number parameter, e.g. `.../usages?p=`
    pub url: String,
}

impl SeedLink {
    /// Creates the seed link for a package on the given repository
    pub fn new(repository_url: &str, group_id: &str, artifact_id: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            url: usages_url(repository_url, group_id, artifact_id),
        }
    }

    /// URL of listing page `page_num`
    pub fn page_url(&self, page_num: u32) -> String {
        format!("{}{}", self.url, page_num)
    }
}

/// Extracts seed links from the first table of a seed page
///
/// # Arguments
///
/// * `html` - The seed page source
/// * `marker` - Glyph the first cell of a qualifying row must contain
/// * `repository_url` - Base URL the listing links are built on
///
/// # Returns
///
/// * `Some(links)` - Links in table order; rows failing either test are skipped
/// * `None` - The page has no table
pub fn parse_seed_table(html: &str, marker: &str, repository_url: &str) -> Option<Vec<SeedLink>> {
    let document = Html::parse_document(html);
    let table_selector = Selector::parse("table").ok()?;
    let row_selector = Selector::parse("tr").ok()?;
    let cell_selector = Selector::parse("td").ok()?;

    let table = document.select(&table_selector).next()?;

    let links = table
        .select(&row_selector)
        .filter_map(|row| {
            let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
            if cells.len() < 3 || !cell_text(&cells[0]).contains(marker) {
                return None;
            }

            let coordinate = cell_text(&cells[2]);
            let (group_id, artifact_id) = split_coordinate(coordinate.trim())?;
            Some(SeedLink::new(repository_url, group_id, artifact_id))
        })
        .collect();

    Some(links)
}

/// Splits `group:artifact`; anything without exactly one colon is rejected
///
/// The group names a download directory, so both halves must be plain path
/// segments.
fn split_coordinate(coordinate: &str) -> Option<(&str, &str)> {
    if coordinate.matches(':').count() != 1 {
        return None;
    }
    let (group_id, artifact_id) = coordinate.split_once(':')?;
    if is_path_segment(group_id) && is_path_segment(artifact_id) {
        Some((group_id, artifact_id))
    } else {
        None
    }
}

fn is_path_segment(part: &str) -> bool {
    !part.is_empty() && part != "." && part != ".." && !part.contains(['/', '\\'])
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect()
}

/// Fetches the seed page and extracts its seed links
///
/// Failures are reported in the log, never raised: an unreachable page, a
/// non-success status or a page without a table all yield an empty list, which
/// callers treat as "nothing to do".
pub async fn fetch_seed_links(
    client: &Client,
    seed_url: &str,
    marker: &str,
    repository_url: &str,
) -> Vec<SeedLink> {
    match try_fetch_seed_links(client, seed_url, marker, repository_url).await {
        Ok(links) => {
            tracing::info!("Found {} seed links on {}", links.len(), seed_url);
            links
        }
        Err(e) => {
            tracing::error!("Unable to read seed page: {}", e);
            Vec::new()
        }
    }
}

async fn try_fetch_seed_links(
    client: &Client,
    seed_url: &str,
    marker: &str,
    repository_url: &str,
) -> Result<Vec<SeedLink>, HarvestError> {
    let body = fetch_page(client, seed_url).await?;
    parse_seed_table(&body, marker, repository_url).ok_or_else(|| HarvestError::MissingTable {
        url: seed_url.to_string(),
    })
}
