//! Integration tests for the harvester
//!
//! These tests serve the seed page with wiremock and replace the headless
//! browser with a scripted one that answers from an in-memory site and writes
//! downloaded files straight into the destination directory.

use jar_harvest::browser::{Browser, BrowserError};
use jar_harvest::checkpoint::{Checkpoint, CheckpointStore};
use jar_harvest::config::Config;
use jar_harvest::crawler::{DownloadError, DownloadWait, Harvester, SeedLink};
use jar_harvest::storage::{RunStatus, SqliteStorage, Storage};
use jar_harvest::{DownloadState, HarvestError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPO: &str = "https://repo.test";

/// A browser answering from a fixed set of rendered pages
///
/// Unknown URLs behave like a page whose awaited element never appears.
#[derive(Default)]
struct ScriptedBrowser {
    pages: HashMap<String, String>,
    failures: Mutex<HashMap<String, usize>>,
    rendered: Mutex<Vec<String>>,
    downloads: Mutex<Vec<String>>,
    checkpoint_path: Option<PathBuf>,
    checkpoints_seen: Mutex<HashMap<String, Checkpoint>>,
    checkpoint_blocker: Option<(String, PathBuf)>,
}

impl ScriptedBrowser {
    fn new() -> Self {
        Self::default()
    }

    /// Records the checkpoint on disk at the moment each page is rendered
    fn watching(mut self, checkpoint_path: &Path) -> Self {
        self.checkpoint_path = Some(checkpoint_path.to_path_buf());
        self
    }

    /// Replaces `dir` with a regular file when `url` is rendered
    fn block_checkpoint_dir_on(&mut self, url: impl Into<String>, dir: &Path) {
        self.checkpoint_blocker = Some((url.into(), dir.to_path_buf()));
    }

    fn page(&mut self, url: impl Into<String>, html: impl Into<String>) {
        self.pages.insert(url.into(), html.into());
    }

    /// Makes the next `times` renders of `url` fail with a navigation error
    fn fail(&mut self, url: impl Into<String>, times: usize) {
        self.failures.get_mut().unwrap().insert(url.into(), times);
    }

    /// Adds a listing page naming `clients`, each with a resolvable profile and version page
    fn listing(&mut self, url: impl Into<String>, clients: &[&str]) {
        self.page(url, listing_html(clients));
        for name in clients {
            self.page(profile_url(name), profile_html(name));
            self.page(version_url(name), version_html(name));
        }
    }

    fn rendered(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }

    fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    fn checkpoint_at(&self, url: &str) -> Option<Checkpoint> {
        self.checkpoints_seen.lock().unwrap().get(url).copied()
    }
}

impl<'a> Browser for &'a ScriptedBrowser {
    async fn render(&self, url: &str, ready_selector: &str) -> Result<String, BrowserError> {
        self.rendered.lock().unwrap().push(url.to_string());

        if let Some((trigger, dir)) = &self.checkpoint_blocker {
            if trigger == url && dir.is_dir() {
                std::fs::remove_dir_all(dir).unwrap();
                std::fs::write(dir, b"not a directory").unwrap();
            }
        }

        if let Some(path) = &self.checkpoint_path {
            if let Ok(checkpoint) = CheckpointStore::new(path).load() {
                self.checkpoints_seen
                    .lock()
                    .unwrap()
                    .insert(url.to_string(), checkpoint);
            }
        }

        if let Some(remaining) = self.failures.lock().unwrap().get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    message: "net::ERR_CONNECTION_RESET".to_string(),
                });
            }
        }

        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| BrowserError::Timeout {
                url: url.to_string(),
                selector: ready_selector.to_string(),
            })
    }

    async fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        completion: &DownloadWait,
    ) -> Result<PathBuf, DownloadError> {
        self.downloads.lock().unwrap().push(url.to_string());
        std::fs::write(dest_dir.join(&completion.file_name), b"PK\x03\x04")?;
        completion.wait(dest_dir).await
    }
}

fn profile_url(name: &str) -> String {
    format!("{}/artifact/clients/{}", REPO, name)
}

fn version_url(name: &str) -> String {
    format!("{}/artifact/clients/{}/1.0", REPO, name)
}

fn jar_name(name: &str) -> String {
    format!("{}-1.0.jar", name)
}

fn listing_html(clients: &[&str]) -> String {
    let items: String = clients
        .iter()
        .map(|name| {
            format!(
                r#"<div class="im"><div class="im-title">
                <a href="/artifact/clients/{name}">{name}</a>
                <a href="/artifact/clients/{name}/usages" class="im-usage">12 usages</a>
                </div></div>"#
            )
        })
        .collect();
    format!("<html><body><div id='maincontent'>{}</div></body></html>", items)
}

fn profile_html(name: &str) -> String {
    format!(
        r#"<html><body><table class="grid versions"><tbody>
        <tr><td><a class="vbtn release" href="/artifact/clients/{name}/1.0">1.0</a></td></tr>
        <tr><td><a class="vbtn release" href="/artifact/clients/{name}/0.9">0.9</a></td></tr>
        </tbody></table></body></html>"#
    )
}

fn version_html(name: &str) -> String {
    format!(
        r#"<html><body><table class="grid"><tr><th>Files</th><td>
        <a href="https://repo1.test/maven2/clients/{name}/1.0/{name}-1.0.pom">pom</a>
        <a href="https://repo1.test/maven2/clients/{name}/1.0/{name}-1.0.jar">jar</a>
        </td></tr></table></body></html>"#
    )
}

fn seed_table(coordinates: &[&str]) -> String {
    let rows: String = coordinates
        .iter()
        .enumerate()
        .map(|(idx, coordinate)| {
            format!(
                "<tr><td>🧩 {}</td><td>module.{}</td><td>{}</td></tr>",
                idx + 1,
                idx,
                coordinate
            )
        })
        .collect();
    format!(
        "<html><body><table><tr><th>#</th><th>Module</th><th>Maven</th></tr>{}\
         <tr><td>99</td><td>unmarked</td><td>skip:me</td></tr></table></body></html>",
        rows
    )
}

/// Starts a mock server serving the seed page at /top.md
async fn serve_seed_page(body: String) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/top.md"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;
    mock_server
}

/// Creates a test configuration with every output inside `dir`
fn create_test_config(dir: &TempDir, seed_url: &str) -> Config {
    let mut config = Config::default();
    config.harvest.seed_url = seed_url.to_string();
    config.harvest.repository_url = REPO.to_string();
    config.harvest.download_timeout = 2;
    config.harvest.poll_interval = 10;
    config.output.checkpoint_path = dir.path().join("progress.json").display().to_string();
    config.output.download_dir = dir.path().join("jars").display().to_string();
    config.output.database_path = dir.path().join("harvest.db").display().to_string();
    config
}

fn checkpoint_store(config: &Config) -> CheckpointStore {
    CheckpointStore::new(&config.output.checkpoint_path)
}

fn jar_path(config: &Config, group_id: &str, name: &str) -> PathBuf {
    Path::new(&config.output.download_dir)
        .join(group_id)
        .join(jar_name(name))
}

fn listing_page(group_id: &str, artifact_id: &str, page_num: u32) -> String {
    SeedLink::new(REPO, group_id, artifact_id).page_url(page_num)
}

#[tokio::test]
async fn test_full_harvest_two_seed_links() {
    let server = serve_seed_page(seed_table(&["g1:a1", "g2:a2"])).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &format!("{}/top.md", server.uri()));

    // Link 1 has one page of three clients, link 2 one page of one client.
    let mut browser = ScriptedBrowser::new().watching(Path::new(&config.output.checkpoint_path));
    browser.listing(listing_page("g1", "a1", 1), &["alpha", "beta", "gamma"]);
    browser.listing(listing_page("g2", "a2", 1), &["delta"]);

    let summary = {
        let mut harvester = Harvester::new(config.clone(), &browser).unwrap();
        harvester.run().await.unwrap()
    };

    assert_eq!(summary.seed_links, 2);
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.clients, 4);
    assert_eq!(summary.count(DownloadState::Downloaded), 4);

    // Link 1 is walked to its empty page 2 before link 2 starts.
    let rendered = browser.rendered();
    let link1_page2 = rendered
        .iter()
        .position(|u| *u == listing_page("g1", "a1", 2))
        .unwrap();
    let link2_page1 = rendered
        .iter()
        .position(|u| *u == listing_page("g2", "a2", 1))
        .unwrap();
    assert!(link1_page2 < link2_page1);
    assert!(!rendered.contains(&listing_page("g1", "a1", 3)));

    assert_eq!(
        browser.checkpoint_at(&listing_page("g2", "a2", 1)),
        Some(Checkpoint {
            current_url_index: 1,
            page_num: 1,
            jar_index: 0
        })
    );
    assert_eq!(
        checkpoint_store(&config).load().unwrap(),
        Checkpoint {
            current_url_index: 2,
            page_num: 1,
            jar_index: 0
        }
    );

    for name in ["alpha", "beta", "gamma"] {
        assert!(jar_path(&config, "g1", name).is_file());
    }
    assert!(jar_path(&config, "g2", "delta").is_file());
    assert_eq!(browser.downloads().len(), 4);
}

#[tokio::test]
async fn test_resume_from_page_and_entry() {
    let server = serve_seed_page(seed_table(&["g1:a1"])).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &format!("{}/top.md", server.uri()));

    checkpoint_store(&config)
        .save(&Checkpoint {
            current_url_index: 0,
            page_num: 3,
            jar_index: 5,
        })
        .unwrap();

    let clients = ["c0", "c1", "c2", "c3", "c4", "c5", "c6"];
    let mut browser = ScriptedBrowser::new();
    browser.listing(listing_page("g1", "a1", 1), &["early1"]);
    browser.listing(listing_page("g1", "a1", 2), &["early2"]);
    browser.listing(listing_page("g1", "a1", 3), &clients);

    let summary = {
        let mut harvester = Harvester::new(config.clone(), &browser).unwrap();
        harvester.run().await.unwrap()
    };

    let rendered = browser.rendered();
    assert!(!rendered.contains(&listing_page("g1", "a1", 1)));
    assert!(!rendered.contains(&listing_page("g1", "a1", 2)));
    for name in &clients[..5] {
        assert!(!rendered.contains(&profile_url(name)), "{} was revisited", name);
    }
    assert!(rendered.contains(&profile_url("c5")));
    assert!(rendered.contains(&profile_url("c6")));

    assert_eq!(summary.count(DownloadState::Downloaded), 2);
    assert_eq!(browser.downloads().len(), 2);
    assert!(!jar_path(&config, "g1", "c0").exists());
    assert!(jar_path(&config, "g1", "c6").is_file());

    assert_eq!(
        checkpoint_store(&config).load().unwrap(),
        Checkpoint {
            current_url_index: 1,
            page_num: 1,
            jar_index: 0
        }
    );
}

#[tokio::test]
async fn test_no_seed_links_leaves_checkpoint_alone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/top.md"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &format!("{}/top.md", server.uri()));
    let existing = Checkpoint {
        current_url_index: 4,
        page_num: 2,
        jar_index: 1,
    };
    checkpoint_store(&config).save(&existing).unwrap();

    let browser = ScriptedBrowser::new();
    let summary = {
        let mut harvester = Harvester::new(config.clone(), &browser).unwrap();
        harvester.run().await.unwrap()
    };

    assert_eq!(summary.seed_links, 0);
    assert!(browser.rendered().is_empty());
    assert_eq!(checkpoint_store(&config).load().unwrap(), existing);
}

#[tokio::test]
async fn test_seed_page_without_table() {
    let server = serve_seed_page("<html><body><p>moved</p></body></html>".to_string()).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &format!("{}/top.md", server.uri()));

    let browser = ScriptedBrowser::new();
    let summary = {
        let mut harvester = Harvester::new(config.clone(), &browser).unwrap();
        harvester.run().await.unwrap()
    };

    assert_eq!(summary.seed_links, 0);
    assert!(browser.rendered().is_empty());
    // The checkpoint is still created with its defaults.
    assert_eq!(
        checkpoint_store(&config).load().unwrap(),
        Checkpoint::default()
    );
}

#[tokio::test]
async fn test_failed_page_is_retried() {
    let server = serve_seed_page(seed_table(&["g1:a1"])).await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir, &format!("{}/top.md", server.uri()));
    config.harvest.page_retries = 1;

    let mut browser = ScriptedBrowser::new();
    browser.listing(listing_page("g1", "a1", 1), &["alpha"]);
    browser.fail(listing_page("g1", "a1", 1), 1);

    let summary = {
        let mut harvester = Harvester::new(config.clone(), &browser).unwrap();
        harvester.run().await.unwrap()
    };

    let page1_renders = browser
        .rendered()
        .iter()
        .filter(|u| **u == listing_page("g1", "a1", 1))
        .count();
    assert_eq!(page1_renders, 2);
    assert_eq!(summary.count(DownloadState::Downloaded), 1);
    assert!(jar_path(&config, "g1", "alpha").is_file());
}

#[tokio::test]
async fn test_failed_page_without_retries_ends_listing() {
    let server = serve_seed_page(seed_table(&["g1:a1", "g2:a2"])).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &format!("{}/top.md", server.uri()));

    let mut browser = ScriptedBrowser::new();
    browser.listing(listing_page("g1", "a1", 1), &["alpha"]);
    browser.fail(listing_page("g1", "a1", 1), 1);
    browser.listing(listing_page("g2", "a2", 1), &["delta"]);

    let summary = {
        let mut harvester = Harvester::new(config.clone(), &browser).unwrap();
        harvester.run().await.unwrap()
    };

    let rendered = browser.rendered();
    assert!(!rendered.contains(&profile_url("alpha")));
    assert!(!rendered.contains(&listing_page("g1", "a1", 2)));
    assert!(rendered.contains(&profile_url("delta")));

    assert_eq!(summary.seed_links, 2);
    assert_eq!(summary.count(DownloadState::Downloaded), 1);
}

#[tokio::test]
async fn test_unresolved_entries_still_advance() {
    let server = serve_seed_page(seed_table(&["g1:a1"])).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &format!("{}/top.md", server.uri()));

    let mut browser = ScriptedBrowser::new();
    browser.listing(listing_page("g1", "a1", 1), &["noversion", "nojar", "fine"]);
    // No latest release button on the first profile.
    browser.page(
        profile_url("noversion"),
        "<html><body><table class='grid'></table></body></html>",
    );
    // A version page linking only the pom.
    browser.page(
        version_url("nojar"),
        "<html><body><a href='https://repo1.test/nojar-1.0.pom'>pom</a></body></html>",
    );

    let summary = {
        let mut harvester = Harvester::new(config.clone(), &browser).unwrap();
        harvester.run().await.unwrap()
    };

    assert_eq!(summary.count(DownloadState::VersionUnresolved), 1);
    assert_eq!(summary.count(DownloadState::ArtifactUnresolved), 1);
    assert_eq!(summary.count(DownloadState::Downloaded), 1);
    assert_eq!(browser.downloads().len(), 1);
    assert!(!browser.rendered().contains(&version_url("noversion")));

    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    let state_of = |name: &str| {
        let client = storage
            .get_client("g1", &profile_url(name))
            .unwrap()
            .unwrap();
        storage.get_download(client.id).unwrap().unwrap()
    };

    assert_eq!(state_of("noversion").state, DownloadState::VersionUnresolved);
    let nojar = state_of("nojar");
    assert_eq!(nojar.state, DownloadState::ArtifactUnresolved);
    assert_eq!(nojar.version_url, Some(version_url("nojar")));
    assert_eq!(state_of("fine").state, DownloadState::Downloaded);

    assert_eq!(
        checkpoint_store(&config).load().unwrap(),
        Checkpoint {
            current_url_index: 1,
            page_num: 1,
            jar_index: 0
        }
    );
}

#[tokio::test]
async fn test_skip_downloaded_across_runs() {
    let server = serve_seed_page(seed_table(&["g1:a1"])).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &format!("{}/top.md", server.uri()));

    let mut first = ScriptedBrowser::new();
    first.listing(listing_page("g1", "a1", 1), &["alpha", "beta"]);
    {
        let mut harvester = Harvester::new(config.clone(), &first).unwrap();
        harvester.run().await.unwrap();
    }
    assert_eq!(first.downloads().len(), 2);

    // Start over: the ledger remembers what is already on disk.
    checkpoint_store(&config).reset().unwrap();
    let mut second = ScriptedBrowser::new();
    second.listing(listing_page("g1", "a1", 1), &["alpha", "beta"]);
    let summary = {
        let mut harvester = Harvester::new(config.clone(), &second).unwrap();
        harvester.run().await.unwrap()
    };

    assert_eq!(summary.count(DownloadState::Skipped), 2);
    assert!(second.downloads().is_empty());
    assert!(!second.rendered().contains(&profile_url("alpha")));

    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    let client = storage
        .get_client("g1", &profile_url("alpha"))
        .unwrap()
        .unwrap();
    assert_eq!(
        storage.get_download(client.id).unwrap().unwrap().state,
        DownloadState::Downloaded
    );
    assert_eq!(storage.count_clients().unwrap(), 2);
}

#[tokio::test]
async fn test_existing_file_is_not_downloaded_again() {
    let server = serve_seed_page(seed_table(&["g1:a1"])).await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir, &format!("{}/top.md", server.uri()));
    config.harvest.skip_downloaded = false;

    let existing = jar_path(&config, "g1", "alpha");
    std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
    std::fs::write(&existing, b"PK\x03\x04").unwrap();

    let mut browser = ScriptedBrowser::new();
    browser.listing(listing_page("g1", "a1", 1), &["alpha"]);

    let summary = {
        let mut harvester = Harvester::new(config.clone(), &browser).unwrap();
        harvester.run().await.unwrap()
    };

    assert_eq!(summary.count(DownloadState::AlreadyPresent), 1);
    assert!(browser.downloads().is_empty());
}

#[tokio::test]
async fn test_same_client_under_two_seed_links() {
    let server = serve_seed_page(seed_table(&["g1:a1", "g2:a2"])).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, &format!("{}/top.md", server.uri()));

    let mut browser = ScriptedBrowser::new();
    browser.listing(listing_page("g1", "a1", 1), &["shared"]);
    browser.listing(listing_page("g2", "a2", 1), &["shared"]);

    let summary = {
        let mut harvester = Harvester::new(config.clone(), &browser).unwrap();
        harvester.run().await.unwrap()
    };

    assert_eq!(summary.count(DownloadState::Downloaded), 2);
    assert_eq!(summary.count(DownloadState::Skipped), 0);
    assert!(jar_path(&config, "g1", "shared").is_file());
    assert!(jar_path(&config, "g2", "shared").is_file());

    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    for group_id in ["g1", "g2"] {
        let client = storage
            .get_client(group_id, &profile_url("shared"))
            .unwrap()
            .unwrap();
        let download = storage.get_download(client.id).unwrap().unwrap();
        assert_eq!(download.state, DownloadState::Downloaded);
        assert_eq!(
            download.file_path,
            Some(jar_path(&config, group_id, "shared").display().to_string())
        );
    }

    let groups = storage.get_group_summaries().unwrap();
    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|g| g.clients == 1 && g.downloaded == 1));
}

#[tokio::test]
async fn test_unwritable_checkpoint_fails_run() {
    let server = serve_seed_page(seed_table(&["g1:a1"])).await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir, &format!("{}/top.md", server.uri()));

    // The checkpoint's parent directory is a regular file.
    let blocker = dir.path().join("state");
    std::fs::write(&blocker, b"not a directory").unwrap();
    config.output.checkpoint_path = blocker.join("progress.json").display().to_string();

    let browser = ScriptedBrowser::new();
    let (result, run_id) = {
        let mut harvester = Harvester::new(config.clone(), &browser).unwrap();
        (harvester.run().await, harvester.run_id())
    };

    assert!(matches!(result, Err(HarvestError::Checkpoint(_))));
    assert!(browser.rendered().is_empty());

    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.id, run_id);
    assert_eq!(run.status, RunStatus::Failed);
}

#[tokio::test]
async fn test_checkpoint_save_failure_mid_listing_aborts() {
    let server = serve_seed_page(seed_table(&["g1:a1", "g2:a2"])).await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir, &format!("{}/top.md", server.uri()));
    let state_dir = dir.path().join("state");
    config.output.checkpoint_path = state_dir.join("progress.json").display().to_string();

    let mut browser = ScriptedBrowser::new();
    browser.listing(listing_page("g1", "a1", 1), &["alpha", "beta"]);
    browser.listing(listing_page("g2", "a2", 1), &["delta"]);
    browser.block_checkpoint_dir_on(listing_page("g1", "a1", 1), &state_dir);

    let (result, run_id) = {
        let mut harvester = Harvester::new(config.clone(), &browser).unwrap();
        (harvester.run().await, harvester.run_id())
    };

    assert!(matches!(result, Err(HarvestError::Checkpoint(_))));

    // The first entry completes; nothing runs after its checkpoint save fails.
    let rendered = browser.rendered();
    assert!(rendered.contains(&profile_url("alpha")));
    assert!(!rendered.contains(&profile_url("beta")));
    assert!(!rendered.contains(&listing_page("g2", "a2", 1)));
    assert_eq!(browser.downloads().len(), 1);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.id, run_id);
    assert_eq!(run.status, RunStatus::Failed);
}
