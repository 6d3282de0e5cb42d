//! HTTP fetcher for static pages
//!
//! The seed documentation page is plain HTML and does not need a browser; it is
//! fetched with a regular HTTP client.

use crate::HarvestError;
use reqwest::Client;
use std::time::Duration;

/// Builds an HTTP client presenting `user_agent`
///
/// # Example
///
/// ```no_run
/// use jar_harvest::crawler::build_http_client;
///
/// let client = build_http_client("jar-harvest/1.0").unwrap();
/// ```
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page body with a GET request
///
/// # Returns
///
/// * `Ok(String)` - The body of a 2xx response
/// * `Err(HarvestError::Http)` - The request could not be sent or the body not read
/// * `Err(HarvestError::Status)` - The server answered with a non-success status
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, HarvestError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| HarvestError::Http {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(HarvestError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|source| HarvestError::Http {
        url: url.to_string(),
        source,
    })
}
