//! Version and artifact link resolution
//!
//! Resolving a client takes two rendered pages: the client's profile page,
//! whose "latest release" button leads to a version page, and that version page,
//! which links the artifact file.

use crate::url::resolve_href;
use scraper::{Html, Selector};

/// Finds the latest release version URL on a client profile page
pub fn parse_latest_version(html: &str, page_url: &str, latest_release: &Selector) -> Option<String> {
    first_link(html, page_url, latest_release)
}

/// Finds the artifact file URL on a version page
pub fn parse_artifact_link(html: &str, page_url: &str, artifact_link: &Selector) -> Option<String> {
    first_link(html, page_url, artifact_link)
}

/// Returns the resolved href of the first element matching `selector` that has one
fn first_link(html: &str, page_url: &str, selector: &Selector) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(selector)
        .filter_map(|element| element.value().attr("href"))
        .find_map(|href| resolve_href(page_url, href))
}
