//! Usages listing pages
//!
//! A listing page names the client projects that depend on a package. Entries
//! are read in document order; a page that shows none marks the end of the
//! listing.

use crate::browser::BrowserError;
use crate::url::resolve_href;
use scraper::{Html, Selector};

/// One dependent project found on a usages listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEntry {
    /// Display name of the client
    pub name: String,

    /// Absolute URL of the client's profile page
    pub profile_url: String,
}

/// What rendering one listing page produced
#[derive(Debug)]
pub enum PageOutcome {
    /// The page lists at least one client
    Entries(Vec<ClientEntry>),

    /// The page lists no clients: past the last page
    Empty,

    /// The page could not be rendered
    Failed(BrowserError),
}

impl PageOutcome {
    /// Classifies the result of rendering a listing page
    ///
    /// A wait timeout means the client selector never matched, which is how the
    /// site presents a page past the end. Any other browser error is a failure.
    pub fn from_render(
        rendered: Result<String, BrowserError>,
        page_url: &str,
        client_link: &Selector,
    ) -> Self {
        match rendered {
            Ok(html) => {
                let entries = parse_client_entries(&html, page_url, client_link);
                if entries.is_empty() {
                    Self::Empty
                } else {
                    Self::Entries(entries)
                }
            }
            Err(e) if e.is_timeout() => Self::Empty,
            Err(e) => Self::Failed(e),
        }
    }
}

/// Extracts client entries from a rendered listing page
///
/// Anchors without a usable href are skipped; names are trimmed.
pub fn parse_client_entries(html: &str, page_url: &str, client_link: &Selector) -> Vec<ClientEntry> {
    let document = Html::parse_document(html);

    document
        .select(client_link)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            let profile_url = resolve_href(page_url, href)?;
            let name = anchor.text().collect::<String>().trim().to_string();
            Some(ClientEntry { name, profile_url })
        })
        .collect()
}
