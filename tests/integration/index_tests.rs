//! End-to-end crawl, index build and lookup

use refindex::config::{load_config_with_hash, CrawlerConfig, UserAgentConfig};
use refindex::crawler::Crawler;
use refindex::index::{search, IndexBuilder};
use refindex::storage::{open_storage, IndexStore};
use refindex::{FollowMode, RefIndexError};
use std::io::Write;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestIndexer".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn create_crawler() -> Crawler {
    let config = CrawlerConfig {
        max_outstanding: 4,
        retry_backoff_ms: 10,
        fetch_timeout_secs: 5,
        follow_mode: FollowMode::SamePath,
        ..CrawlerConfig::default()
    };
    Crawler::new(config, &create_user_agent()).unwrap()
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!("<html><body>{}</body></html>", body),
            "text/html",
        ))
        .mount(server)
        .await;
}

/// A tiny reference site: an index page, two `at` members and a page
/// whose title is shared with another URL
async fn start_reference_site() -> MockServer {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/ref/",
        r#"<h1>Reference</h1>
           <a href="vector/at">vector::at</a>
           <a href="string/at">string::at</a>
           <a href="vector/begin">vector::begin</a>
           <a href="list/begin">list::begin</a>"#,
    )
    .await;
    mount_page(&server, "/ref/vector/at", "<h1>std::vector&lt;T&gt;::at</h1>").await;
    mount_page(
        &server,
        "/ref/string/at",
        "<h1>std::basic_string&lt;CharT&gt;::at</h1>",
    )
    .await;
    mount_page(&server, "/ref/vector/begin", "<h1>begin</h1>").await;
    mount_page(&server, "/ref/list/begin", "<h1>begin</h1>").await;

    server
}

#[tokio::test]
async fn test_rebuild_and_search() {
    let server = start_reference_site().await;
    let origin = format!("{}/ref/", server.uri());

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("index.db");
    let mut store = open_storage(&db_path).unwrap();

    let report = IndexBuilder::new("test-hash")
        .rebuild(&create_crawler(), &origin, None, &mut store)
        .await
        .unwrap();

    assert_eq!(report.crawl.succeeded, 5);
    assert!(report.crawl.failed.is_empty());
    assert_eq!(report.build.rows, 5);
    assert_eq!(store.count_rows().unwrap(), 5);

    let hits = search(&store, "vector::at").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "std::vector<T>::at");
    assert_eq!(hits[0].url, format!("{}/ref/vector/at", server.uri()));

    // shared title is split by distinguishing URL segment
    let begins: Vec<_> = search(&store, "begin")
        .unwrap()
        .into_iter()
        .map(|hit| hit.title)
        .collect();
    assert!(begins.contains(&"begin (list)".to_string()), "{:?}", begins);
    assert!(begins.contains(&"begin (vector)".to_string()), "{:?}", begins);

    assert!(search(&store, "unique_ptr").unwrap().is_empty());

    let build = store.latest_build().unwrap().unwrap();
    assert_eq!(build.id, report.build.build_id);
    assert_eq!(build.config_hash, "test-hash");
    assert_eq!(build.rows, 5);
}

#[tokio::test]
async fn test_rebuild_replaces_previous_index() {
    let server = start_reference_site().await;
    let origin = format!("{}/ref/", server.uri());

    let dir = TempDir::new().unwrap();
    let mut store = open_storage(&dir.path().join("index.db")).unwrap();
    let builder = IndexBuilder::new("hash");

    builder
        .rebuild(&create_crawler(), &origin, None, &mut store)
        .await
        .unwrap();
    let keywords = store.count_keywords().unwrap();

    let second = builder
        .rebuild(&create_crawler(), &origin, None, &mut store)
        .await
        .unwrap();

    assert_eq!(store.count_rows().unwrap(), 5);
    assert_eq!(store.count_keywords().unwrap(), keywords);
    assert_eq!(store.latest_build().unwrap().unwrap().id, second.build.build_id);
}

#[tokio::test]
async fn test_blacklisted_page_not_indexed() {
    let server = start_reference_site().await;
    let origin = format!("{}/ref/", server.uri());

    let dir = TempDir::new().unwrap();
    let mut store = open_storage(&dir.path().join("index.db")).unwrap();

    IndexBuilder::new("hash")
        .with_blacklist(vec![format!("{}/ref/string/at", server.uri())])
        .rebuild(&create_crawler(), &origin, None, &mut store)
        .await
        .unwrap();

    assert_eq!(store.count_rows().unwrap(), 4);
    assert!(search(&store, "basic_string::at").unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_rebuild_leaves_index_untouched() {
    let server = start_reference_site().await;
    let origin = format!("{}/ref/", server.uri());

    let dir = TempDir::new().unwrap();
    let mut store = open_storage(&dir.path().join("index.db")).unwrap();
    IndexBuilder::new("first")
        .rebuild(&create_crawler(), &origin, None, &mut store)
        .await
        .unwrap();

    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ref/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&slow)
        .await;

    let crawler = create_crawler();
    let cancel = crawler.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let result = IndexBuilder::new("second")
        .rebuild(&crawler, &format!("{}/ref/", slow.uri()), None, &mut store)
        .await;

    assert!(matches!(
        result,
        Err(RefIndexError::Crawl(refindex::CrawlError::Cancelled))
    ));
    assert_eq!(store.count_rows().unwrap(), 5);
    assert_eq!(store.latest_build().unwrap().unwrap().config_hash, "first");
}

#[test]
fn test_config_file_round_trip() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[crawler]
max-depth = 4
follow-mode = "same-path"

[user-agent]
crawler-name = "refindex"
crawler-version = "0.1.0"
contact-url = "https://example.com/about"
contact-email = "indexer@example.com"

[source]
origin = "https://en.cppreference.com/w/cpp"
path = "/w/cpp"

[output]
database-path = "index.db"
"#
    )
    .unwrap();

    let (config, hash) = load_config_with_hash(file.path()).unwrap();
    assert_eq!(config.crawler.max_depth, 4);
    assert_eq!(config.crawler.follow_mode, FollowMode::SamePath);
    assert_eq!(config.crawler.max_outstanding, 16);
    assert_eq!(config.source.path.as_deref(), Some("/w/cpp"));
    assert_eq!(hash.len(), 64);
}
