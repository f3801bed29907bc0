//! Traversal engine for the metadata tree.
//!
//! The tree has no declared schema. Structure is inferred from (a) the
//! trailing-slash convention in directory listings and (b) a small number of
//! fixed-name special cases (`user-data`, `public-keys/`). Each visited path
//! carries a [`NodeKind`] naming the response-interpretation rule; every
//! node emits exactly one route for its own path, so each reachable path is
//! visited exactly once.
//!
//! Scheduling is an explicit work queue: a visit completes, yields its
//! children, and the children are pushed back into a [`FuturesUnordered`]
//! drain loop. A semaphore caps in-flight fetches; the service is a
//! low-throughput local responder.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use metascrape_fetch::HttpClient;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::classify::{self, EntryKind};
use crate::config::ScrapeConfig;
use crate::error::{Error, Result};
use crate::route::{Route, ScrapeResult};
use crate::sanitize;

/// Response-interpretation rule for a visited path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    /// Root path `/`; verifies service identity, lists API versions.
    Apex,
    /// `/{version}`; lists the fixed data-type buckets.
    ApiVersion,
    /// `/{version}/user-data`; byte-stream leaf, never expanded.
    UserData,
    /// Any deeper path ending in `/`; generic listing.
    Directory,
    /// The `public-keys/` indexed-array directory.
    PublicKeyDir,
    /// Terminal path; no children.
    File,
}

/// Per-request traversal state.
///
/// `path` is the route path recorded in the output; `url_path` is what gets
/// fetched. They differ only at the version-bucket level, where the route
/// carries a trailing slash the listing entry does not. Sibling API versions
/// are traversed independently and share no state beyond these fields.
#[derive(Debug, Clone)]
struct CrawlContext {
    path: String,
    url_path: String,
    api_version: Option<String>,
    kind: NodeKind,
}

impl CrawlContext {
    fn apex() -> Self {
        Self {
            path: "/".to_string(),
            url_path: "/".to_string(),
            api_version: None,
            kind: NodeKind::Apex,
        }
    }
}

/// A recoverable per-path failure recorded during the crawl.
#[derive(Debug)]
pub struct CrawlFailure {
    pub path: String,
    pub error: Error,
}

/// Everything a finished crawl produced.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub result: ScrapeResult,
    pub failures: Vec<CrawlFailure>,
}

struct Visit {
    route: Route,
    children: Vec<CrawlContext>,
}

struct VisitOutcome {
    ctx: CrawlContext,
    result: Result<Visit>,
}

type VisitFuture<'a> = Pin<Box<dyn Future<Output = VisitOutcome> + Send + 'a>>;

/// The crawler, generic over its HTTP client.
pub struct Crawler<C: HttpClient> {
    client: C,
    base_url: String,
    config: ScrapeConfig,
}

impl<C: HttpClient> Crawler<C> {
    pub fn new(client: C, host: &str, port: u16, config: ScrapeConfig) -> Self {
        Self {
            client,
            base_url: format!("http://{host}:{port}"),
            config,
        }
    }

    fn url_for(&self, url_path: &str) -> String {
        format!("{}{}", self.base_url, url_path)
    }

    /// Walk the whole tree and return the sanitized routes.
    ///
    /// The apex is visited first, alone: a wrong-service response aborts the
    /// crawl before any other fetch is issued, and an apex fetch failure is
    /// equally fatal since without the root listing there is no tree. Every
    /// failure below the apex is recorded in the outcome and the path
    /// skipped; sibling branches continue independently.
    pub async fn crawl(&self) -> Result<CrawlOutcome> {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut result = ScrapeResult::new();
        let mut failures = Vec::new();

        debug!(base_url = %self.base_url, "starting to scrape the metadata service");

        let apex = self.visit(CrawlContext::apex(), Arc::clone(&permits)).await;
        let visit = apex.result?;

        let mut pending: FuturesUnordered<VisitFuture<'_>> = FuturesUnordered::new();
        result.insert(visit.route);
        for child in visit.children {
            pending.push(Box::pin(self.visit(child, Arc::clone(&permits))));
        }

        while let Some(outcome) = pending.next().await {
            match outcome.result {
                Ok(visit) => {
                    result.insert(visit.route);
                    for child in visit.children {
                        pending.push(Box::pin(self.visit(child, Arc::clone(&permits))));
                    }
                }
                Err(error) => {
                    warn!(path = %outcome.ctx.path, %error, "skipping path");
                    failures.push(CrawlFailure {
                        path: outcome.ctx.path,
                        error,
                    });
                }
            }
        }

        Ok(CrawlOutcome { result, failures })
    }

    async fn visit(&self, ctx: CrawlContext, permits: Arc<Semaphore>) -> VisitOutcome {
        let result = self.visit_inner(&ctx, permits).await;
        VisitOutcome { ctx, result }
    }

    async fn visit_inner(&self, ctx: &CrawlContext, permits: Arc<Semaphore>) -> Result<Visit> {
        // the permit bounds in-flight visits; classification and
        // sanitization are cheap synchronous work
        let _permit = permits.acquire().await.map_err(|e| Error::Fetch {
            path: ctx.path.clone(),
            reason: e.to_string(),
        })?;

        let url = self.url_for(&ctx.url_path);
        let response = self.client.get(&url).await.map_err(|e| Error::Fetch {
            path: ctx.path.clone(),
            reason: e.to_string(),
        })?;

        if ctx.kind == NodeKind::Apex {
            let server = response.header("Server").unwrap_or("(empty)");
            if server != self.config.identity_header_value {
                return Err(Error::WrongService {
                    expected: self.config.identity_header_value.clone(),
                    actual: server.to_string(),
                });
            }
            debug!("identified endpoint as the expected metadata service");
        }

        response.check_status(&url).map_err(|e| Error::Fetch {
            path: ctx.path.clone(),
            reason: e.to_string(),
        })?;

        // children are discovered from the raw listing; the emitted route is
        // the sanitized form
        let listing = String::from_utf8_lossy(&response.body).into_owned();
        let route = sanitize::sanitize_route(Route::from_response(ctx.path.clone(), &response))?;
        let children = self.children(ctx, &listing);

        Ok(Visit { route, children })
    }

    /// Compute the child contexts a node schedules, per its kind.
    fn children(&self, ctx: &CrawlContext, listing: &str) -> Vec<CrawlContext> {
        match ctx.kind {
            NodeKind::Apex => listing
                .lines()
                .filter(|line| !line.is_empty())
                .map(|version| {
                    debug!(version, "discovered API version");
                    CrawlContext {
                        path: format!("/{version}"),
                        url_path: format!("/{version}"),
                        api_version: Some(version.to_string()),
                        kind: NodeKind::ApiVersion,
                    }
                })
                .collect(),

            NodeKind::ApiVersion => listing
                .lines()
                .filter(|line| !line.is_empty())
                .map(|bucket| {
                    debug!(version = ctx.api_version.as_deref(), bucket, "discovered data type");
                    let url_path = format!("{}/{bucket}", ctx.path);

                    if bucket == "user-data" {
                        // byte-array leaf, never traversed as a directory
                        CrawlContext {
                            path: url_path.clone(),
                            url_path,
                            api_version: ctx.api_version.clone(),
                            kind: NodeKind::UserData,
                        }
                    } else {
                        // `dynamic` and `meta-data` today; an unknown future
                        // bucket degrades to generic directory traversal
                        CrawlContext {
                            path: format!("{url_path}/"),
                            url_path,
                            api_version: ctx.api_version.clone(),
                            kind: NodeKind::Directory,
                        }
                    }
                })
                .collect(),

            NodeKind::Directory => listing
                .lines()
                .filter_map(|entry| match classify::classify_entry(&ctx.path, entry) {
                    Some((EntryKind::Directory, child)) => Some(CrawlContext {
                        path: child.clone(),
                        url_path: child,
                        api_version: ctx.api_version.clone(),
                        kind: NodeKind::Directory,
                    }),
                    Some((EntryKind::PublicKeyDir, child)) => Some(CrawlContext {
                        path: child.clone(),
                        url_path: child,
                        api_version: ctx.api_version.clone(),
                        kind: NodeKind::PublicKeyDir,
                    }),
                    Some((EntryKind::File, child)) => Some(CrawlContext {
                        path: child.clone(),
                        url_path: child,
                        api_version: ctx.api_version.clone(),
                        kind: NodeKind::File,
                    }),
                    None => {
                        warn!(parent = %ctx.path, entry, "unclassifiable listing entry, skipping");
                        None
                    }
                })
                .collect(),

            NodeKind::PublicKeyDir => listing
                .lines()
                .filter(|line| !line.is_empty())
                .map(|entry| {
                    // each entry is `{index}={key_name}`; the index is
                    // traversed as a directory with a required trailing slash
                    let index = classify::public_key_index(entry);
                    let child = format!("{}/", classify::join_child(&ctx.path, index));

                    CrawlContext {
                        path: child.clone(),
                        url_path: child,
                        api_version: ctx.api_version.clone(),
                        kind: NodeKind::Directory,
                    }
                })
                .collect(),

            NodeKind::UserData | NodeKind::File => Vec::new(),
        }
    }
}
