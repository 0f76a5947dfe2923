//! Crawler behavior against mock servers

use parking_lot::Mutex;
use refindex::config::{CrawlerConfig, UserAgentConfig};
use refindex::crawler::{Crawler, Document, DocumentHandler};
use refindex::{CrawlError, FollowMode, Target};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records every processed document as (url, depth)
#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(String, u32)>>,
}

impl Recorder {
    fn urls(&self) -> Vec<String> {
        let mut urls: Vec<_> = self.seen.lock().iter().map(|(u, _)| u.clone()).collect();
        urls.sort();
        urls
    }

    fn depth_of(&self, url: &str) -> Option<u32> {
        self.seen
            .lock()
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, d)| *d)
    }
}

impl DocumentHandler for Recorder {
    fn process_document(&self, document: Document, depth: u32) -> bool {
        self.seen.lock().push((document.url, depth));
        true
    }
}

fn create_test_config() -> CrawlerConfig {
    CrawlerConfig {
        max_outstanding: 4,
        max_failed_retries: 3,
        retry_backoff_ms: 10,
        fetch_timeout_secs: 5,
        follow_mode: FollowMode::SamePath,
        ..CrawlerConfig::default()
    }
}

fn create_user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestIndexer".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body),
        "text/html; charset=utf-8",
    )
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

async fn run_crawl(
    config: CrawlerConfig,
    origin: &str,
) -> (Result<refindex::CrawlReport, CrawlError>, Arc<Recorder>) {
    let crawler = Crawler::new(config, &create_user_agent()).unwrap();
    let recorder = Arc::new(Recorder::default());
    let result = crawler.crawl(origin, None, recorder.clone()).await;
    (result, recorder)
}

#[tokio::test]
async fn test_crawl_follows_links_breadth_first() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/docs/",
        r#"<a href="a">A</a> <a href="/docs/b">B</a> <a href="/other/x">outside</a>"#,
    )
    .await;
    mount_page(&server, "/docs/a", r#"<a href="/docs/">back</a> <a href="c">C</a>"#).await;
    mount_page(&server, "/docs/b", "<p>leaf</p>").await;
    mount_page(&server, "/docs/c", "<p>leaf</p>").await;
    Mock::given(method("GET"))
        .and(path("/other/x"))
        .respond_with(html("<p>never</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let (result, recorder) = run_crawl(create_test_config(), &format!("{}/docs/", base)).await;
    let report = result.unwrap();

    assert_eq!(report.succeeded, 4);
    assert_eq!(report.rounds, 1);
    assert!(report.failed.is_empty());
    assert_eq!(
        recorder.urls(),
        vec![
            format!("{}/docs/", base),
            format!("{}/docs/a", base),
            format!("{}/docs/b", base),
            format!("{}/docs/c", base),
        ]
    );
    assert_eq!(recorder.depth_of(&format!("{}/docs/", base)), Some(1));
    assert_eq!(recorder.depth_of(&format!("{}/docs/c", base)), Some(3));
}

#[tokio::test]
async fn test_redirect_followed_not_processed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/docs/", r#"<a href="old">old</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/docs/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/docs/new"))
        .mount(&server)
        .await;
    mount_page(&server, "/docs/new", "<p>moved here</p>").await;

    let (result, recorder) = run_crawl(create_test_config(), &format!("{}/docs/", base)).await;
    let report = result.unwrap();

    let urls = recorder.urls();
    assert!(urls.contains(&format!("{}/docs/new", base)));
    assert!(!urls.contains(&format!("{}/docs/old", base)));
    assert_eq!(recorder.depth_of(&format!("{}/docs/new", base)), Some(3));
    assert_eq!(report.succeeded, 2);
}

#[tokio::test]
async fn test_not_found_dropped_without_retry() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/docs/", r#"<a href="missing">gone</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/docs/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let (result, recorder) = run_crawl(create_test_config(), &format!("{}/docs/", base)).await;
    let report = result.unwrap();

    assert_eq!(report.rounds, 1);
    assert!(report.failed.is_empty());
    assert_eq!(recorder.urls(), vec![format!("{}/docs/", base)]);
}

#[tokio::test]
async fn test_content_type_mismatch_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/docs/", r#"<a href="diagram">diagram</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/docs/diagram"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x89, 0x50, 0x4e, 0x47], "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let (result, recorder) = run_crawl(create_test_config(), &format!("{}/docs/", base)).await;
    let report = result.unwrap();

    assert_eq!(report.succeeded, 1);
    assert!(report.failed.is_empty());
    assert!(!recorder.urls().contains(&format!("{}/docs/diagram", base)));
}

#[tokio::test]
async fn test_url_filters_skip_static_assets() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/docs/",
        r#"<img src="x.png"><a href="logo.png">logo</a><a href="style.css">css</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/docs/logo.png"))
        .respond_with(html("never"))
        .expect(0)
        .mount(&server)
        .await;

    let (result, _recorder) = run_crawl(create_test_config(), &format!("{}/docs/", base)).await;
    assert_eq!(result.unwrap().succeeded, 1);
}

#[tokio::test]
async fn test_depth_bound() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/docs/", r#"<a href="a">A</a>"#).await;
    mount_page(&server, "/docs/a", r#"<a href="b">B</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/docs/b"))
        .respond_with(html("too deep"))
        .expect(0)
        .mount(&server)
        .await;

    let config = CrawlerConfig {
        max_depth: 2,
        ..create_test_config()
    };
    let (result, recorder) = run_crawl(config, &format!("{}/docs/", base)).await;

    assert_eq!(result.unwrap().succeeded, 2);
    assert_eq!(
        recorder.urls(),
        vec![format!("{}/docs/", base), format!("{}/docs/a", base)]
    );
}

#[tokio::test]
async fn test_transient_failure_retried_until_success() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/docs/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_page(&server, "/docs/", "<p>finally</p>").await;

    let (result, recorder) = run_crawl(create_test_config(), &format!("{}/docs/", base)).await;
    let report = result.unwrap();

    assert_eq!(report.rounds, 3);
    assert_eq!(report.succeeded, 1);
    assert!(report.failed.is_empty());
    assert_eq!(recorder.urls(), vec![format!("{}/docs/", base)]);
}

#[tokio::test]
async fn test_retry_budget_exhausted() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/docs/", r#"<a href="flaky">flaky</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/docs/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = CrawlerConfig {
        max_failed_retries: 2,
        ..create_test_config()
    };
    let (result, _recorder) = run_crawl(config, &format!("{}/docs/", base)).await;
    let report = result.unwrap();

    // round 1 makes progress; the budget allows two retry rounds after it
    assert_eq!(report.rounds, 3);
    assert_eq!(report.failed, vec![Target::new(2, format!("{}/docs/flaky", base))]);
}

#[tokio::test]
async fn test_zero_retry_budget_runs_single_round() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/docs/", r#"<a href="flaky">flaky</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/docs/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let config = CrawlerConfig {
        max_failed_retries: 0,
        ..create_test_config()
    };
    let (result, _recorder) = run_crawl(config, &format!("{}/docs/", base)).await;
    let report = result.unwrap();

    assert_eq!(report.rounds, 1);
    assert_eq!(report.failed.len(), 1);
}

#[tokio::test]
async fn test_cancellation_aborts_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/docs/"))
        .respond_with(html("<p>slow</p>").set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let crawler = Crawler::new(create_test_config(), &create_user_agent()).unwrap();
    let cancel = crawler.cancellation_token();
    let recorder = Arc::new(Recorder::default());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let started = std::time::Instant::now();
    let result = crawler
        .crawl(&format!("{}/docs/", base), None, recorder.clone())
        .await;

    assert!(matches!(result, Err(CrawlError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(recorder.urls().is_empty());
}
