//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates:
//! - Seeding the frontier from the origin
//! - A self-replicating pool of fetch workers, bounded by `max-outstanding`
//! - Response classification (redirects, 404, content-type, transient failures)
//! - Sequential retry rounds with a fixed backoff
//! - Cancellation of every worker on an external interrupt

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::fetcher::{build_http_client, fetch_document, Document, FetchResult};
use crate::crawler::frontier::{Frontier, Target};
use crate::crawler::parser::extract_links;
use crate::url::{parse_origin, resolve_link, LinkPolicy, UrlFilters};
use crate::CrawlError;
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Callback invoked for every accepted document
///
/// Returning false excludes the page: its links are not followed.
pub trait DocumentHandler: Send + Sync {
    fn process_document(&self, document: Document, depth: u32) -> bool;
}

impl<F> DocumentHandler for F
where
    F: Fn(Document, u32) -> bool + Send + Sync,
{
    fn process_document(&self, document: Document, depth: u32) -> bool {
        self(document, depth)
    }
}

/// Outcome of a completed crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Documents handed to the handler
    pub succeeded: usize,
    /// Targets still failing after the last retry round
    pub failed: Vec<Target>,
    /// Number of passes run, including the first
    pub rounds: u32,
}

/// State shared by every worker across all rounds of one crawl
struct Shared {
    frontier: Arc<Frontier>,
    client: Client,
    handler: Arc<dyn DocumentHandler>,
    filters: UrlFilters,
    content_types: Vec<String>,
    keep_fragment: bool,
    max_outstanding: usize,
    cancel: CancellationToken,
}

/// One pass over the frontier
struct Pass {
    shared: Arc<Shared>,
    active: AtomicUsize,
    resolved: AtomicUsize,
    documents: AtomicUsize,
    spawn_tx: mpsc::UnboundedSender<()>,
}

impl Pass {
    /// Reserves a worker slot and asks the pass loop to fill it
    fn maybe_spawn(&self) {
        let max = self.shared.max_outstanding;
        let reserved = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < max).then_some(n + 1)
            })
            .is_ok();

        if reserved && self.spawn_tx.send(()).is_err() {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PassStats {
    resolved: usize,
    documents: usize,
}

/// Concurrent documentation crawler
pub struct Crawler {
    config: CrawlerConfig,
    client: Client,
    filters: UrlFilters,
    cancel: CancellationToken,
}

impl Crawler {
    /// Creates a crawler with its own HTTP client
    ///
    /// # Errors
    ///
    /// * `CrawlError::Client` - the HTTP client could not be built
    /// * `CrawlError::InvalidFilter` - a URL filter is not a valid regex
    pub fn new(config: CrawlerConfig, user_agent: &UserAgentConfig) -> Result<Self, CrawlError> {
        let client = build_http_client(
            user_agent,
            Duration::from_secs(config.fetch_timeout_secs),
        )?;
        let filters = UrlFilters::new(&config.url_filters)
            .map_err(|e| CrawlError::InvalidFilter(e.to_string()))?;
        if !filters.is_empty() {
            tracing::debug!("{} URL filters active", filters.len());
        }

        Ok(Self {
            config,
            client,
            filters,
            cancel: CancellationToken::new(),
        })
    }

    /// Replaces the cancellation token (e.g. one wired to Ctrl-C)
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that aborts the crawl when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Crawls from `origin`, handing every accepted document to `handler`
    ///
    /// `path_override` replaces the origin's directory as the base for
    /// same-path following.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - crawl finished; `failed` lists targets that
    ///   never succeeded within the retry budget
    /// * `Err(CrawlError::Cancelled)` - the cancellation token fired
    ///
    /// # Example
    ///
    /// ```no_run
    /// use refindex::config::load_config;
    /// use refindex::crawler::{Crawler, Document};
    /// use std::path::Path;
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = load_config(Path::new("refindex.toml"))?;
    /// let crawler = Crawler::new(config.crawler.clone(), &config.user_agent)?;
    /// let handler = Arc::new(|doc: Document, depth: u32| {
    ///     println!("GET {} {} (depth {})", doc.status, doc.url, depth);
    ///     true
    /// });
    /// let report = crawler.crawl(&config.source.origin, None, handler).await?;
    /// println!("{} documents, {} failed", report.succeeded, report.failed.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn crawl(
        &self,
        origin: &str,
        path_override: Option<&str>,
        handler: Arc<dyn DocumentHandler>,
    ) -> Result<CrawlReport, CrawlError> {
        let origin = parse_origin(origin)?;
        let policy = LinkPolicy::new(self.config.follow_mode, &origin, path_override);
        tracing::info!(
            "Crawling {} (mode {:?}, base path {})",
            origin,
            policy.mode(),
            policy.dir_path()
        );

        let frontier = Arc::new(Frontier::new(policy, self.config.max_depth));
        if !frontier.add(&origin, 1) {
            tracing::warn!("Origin {} is outside its own follow policy", origin);
        }

        let shared = Arc::new(Shared {
            frontier: frontier.clone(),
            client: self.client.clone(),
            handler,
            filters: self.filters.clone(),
            content_types: self.config.content_types.clone(),
            keep_fragment: self.config.include_fragment,
            max_outstanding: self.config.max_outstanding.max(1),
            cancel: self.cancel.clone(),
        });

        let backoff = Duration::from_millis(self.config.retry_backoff_ms);
        let mut retries_left = self.config.max_failed_retries;
        let mut report = CrawlReport::default();

        loop {
            report.rounds += 1;
            tracing::info!(
                "Round {}: {} targets pending",
                report.rounds,
                frontier.pending_len()
            );

            let stats = self.run_pass(shared.clone()).await?;
            report.succeeded += stats.documents;

            let failed = frontier.failed_len();
            tracing::info!(
                "Round {} finished: {} documents, {} resolved, {} failed",
                report.rounds,
                stats.documents,
                stats.resolved,
                failed
            );

            if failed == 0 {
                break;
            }

            // progress refills the budget; each retry round spends one
            if stats.resolved > 0 {
                retries_left = self.config.max_failed_retries;
            }
            if retries_left == 0 {
                tracing::warn!("Retry budget exhausted with {} failed targets", failed);
                break;
            }
            retries_left -= 1;

            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = self.cancel.cancelled() => return Err(CrawlError::Cancelled),
            }

            frontier.swap_round();
        }

        report.failed = frontier.failed_targets();
        tracing::info!(
            "Crawl complete: {} documents in {} rounds, {} queued, {} failed",
            report.succeeded,
            report.rounds,
            frontier.queued_len(),
            report.failed.len()
        );

        Ok(report)
    }

    /// Runs workers until the frontier drains
    async fn run_pass(&self, shared: Arc<Shared>) -> Result<PassStats, CrawlError> {
        let (spawn_tx, mut spawn_rx) = mpsc::unbounded_channel();
        let pass = Arc::new(Pass {
            shared,
            active: AtomicUsize::new(1),
            resolved: AtomicUsize::new(0),
            documents: AtomicUsize::new(0),
            spawn_tx,
        });

        let mut workers = JoinSet::new();
        let mut next_id = 1;
        workers.spawn(worker(pass.clone(), next_id));

        loop {
            tokio::select! {
                Some(()) = spawn_rx.recv() => {
                    next_id += 1;
                    workers.spawn(worker(pass.clone(), next_id));
                }
                joined = workers.join_next() => match joined {
                    Some(Ok(Ok(()))) => {}
                    Some(Ok(Err(e))) => {
                        workers.abort_all();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        workers.abort_all();
                        return Err(CrawlError::Worker(e.to_string()));
                    }
                    None => {
                        if spawn_rx.try_recv().is_ok() {
                            next_id += 1;
                            workers.spawn(worker(pass.clone(), next_id));
                            continue;
                        }
                        break;
                    }
                },
            }
        }

        tracing::debug!("Pass used {} workers", next_id);

        Ok(PassStats {
            resolved: pass.resolved.load(Ordering::SeqCst),
            documents: pass.documents.load(Ordering::SeqCst),
        })
    }
}

/// Worker loop: take, fetch, classify, expand
///
/// A worker exits only when the frontier is drained (nothing pending and
/// nothing in flight), so siblings still enqueuing links keep it alive.
async fn worker(pass: Arc<Pass>, id: usize) -> Result<(), CrawlError> {
    let shared = &pass.shared;
    let frontier = &shared.frontier;

    let result = loop {
        if shared.cancel.is_cancelled() {
            break Err(CrawlError::Cancelled);
        }

        let changed = frontier.changed();
        let Some(target) = frontier.take_batch() else {
            if frontier.is_drained() {
                break Ok(());
            }
            tokio::select! {
                _ = changed => continue,
                _ = shared.cancel.cancelled() => break Err(CrawlError::Cancelled),
            }
        };

        let fetched = tokio::select! {
            fetched = fetch_document(&shared.client, &target.url, &shared.content_types) => fetched,
            _ = shared.cancel.cancelled() => break Err(CrawlError::Cancelled),
        };

        match fetched {
            FetchResult::Failed { error } => {
                tracing::warn!("GET {} failed: {}", target.url, error);
                frontier.mark_failed(target);
                continue;
            }
            FetchResult::NotFound => {
                tracing::debug!("GET 404 {}", target.url);
            }
            FetchResult::ContentMismatch { content_type } => {
                tracing::debug!("Skipping {} ({})", target.url, content_type);
            }
            FetchResult::Redirect { location } => {
                tracing::debug!("Redirect {} -> {:?}", target.url, location);
                if let Some(next) = location.and_then(|loc| follow(shared, &target, &loc)) {
                    frontier.add(&next, target.depth + 1);
                }
            }
            FetchResult::Document(document) => {
                tracing::debug!("GET {} {} (worker {})", document.status, target.url, id);
                let body = document.body.clone();
                pass.documents.fetch_add(1, Ordering::SeqCst);

                if shared.handler.process_document(document, target.depth) {
                    expand(shared, &target, &body);
                }
                pass.maybe_spawn();
            }
        }

        pass.resolved.fetch_add(1, Ordering::SeqCst);
        frontier.resolve(&target);
    };

    pass.active.fetch_sub(1, Ordering::SeqCst);
    result
}

/// Resolves a redirect or link target, applying URL filters
fn follow(shared: &Shared, target: &Target, href: &str) -> Option<Url> {
    let base = Url::parse(&target.url).ok()?;
    let next = resolve_link(&base, href, shared.keep_fragment)?;
    if shared.filters.is_filtered(&next) {
        tracing::trace!("Filtered {}", next);
        return None;
    }
    Some(next)
}

/// Enqueues every followable link of a processed page at depth + 1
fn expand(shared: &Shared, target: &Target, body: &str) {
    let Ok(base) = Url::parse(&target.url) else {
        return;
    };

    let mut added = 0;
    for link in extract_links(body, &base, shared.keep_fragment) {
        if shared.filters.is_filtered(&link) {
            continue;
        }
        if shared.frontier.add(&link, target.depth + 1) {
            added += 1;
        }
    }
    tracing::trace!("{} new targets from {}", added, target.url);
}
