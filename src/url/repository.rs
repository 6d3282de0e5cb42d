//! Repository URL construction
//!
//! Usages listings live at `{repository}/artifact/{group}/{artifact}/usages?p=`,
//! with the page number appended when a page is rendered.

/// Builds the usages listing URL for a package, ready for a page number suffix
///
/// # Example
///
/// ```
/// use jar_harvest::url::usages_url;
///
/// assert_eq!(
///     usages_url("https://mvnrepository.com", "groupA", "artifactA"),
///     "https://mvnrepository.com/artifact/groupA/artifactA/usages?p="
/// );
/// ```
pub fn usages_url(repository_url: &str, group_id: &str, artifact_id: &str) -> String {
    format!(
        "{}/artifact/{}/{}/usages?p=",
        repository_url.trim_end_matches('/'),
        group_id,
        artifact_id
    )
}
