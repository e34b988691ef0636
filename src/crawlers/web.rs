use futures::FutureExt;
use futures::future::join_all;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use url::Url;

use crate::config::CrawlConfig;
use crate::crawlers::observer::{CrawlObserver, PageEvent};
use crate::driver::{BrowserDriver, DriverFactory};
use crate::error::{CrawlError, PersistError};
use crate::filter::{LinkFilter, canonicalize};
use crate::frontier::{Admission, CrawlTask, Frontier, VisitedSet};
use crate::limiter::RateLimiter;
use crate::parsers::{Extractor, LinkFinder};
use crate::processor::{PageOutcome, PageProcessor};
use crate::results::{self, CrawlResult, ResultStore};
use crate::utils::format_elapsed;

/// Lifecycle of one crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Idle,
    Running,
    /// Working through every queued task at this depth
    Draining(usize),
    Finalizing,
    Done,
}

/// Per-run state. Created fresh by every [`CrawlEngine::run`].
struct CrawlContext {
    state: CrawlState,
    visited: Mutex<VisitedSet>,
    frontier: Frontier,
    store: ResultStore,
    /// Raised once the page cap is hit; workers stop taking tasks
    cancelled: AtomicBool,
    persist_failures: Vec<PersistError>,
}

impl CrawlContext {
    fn new(seed: &str) -> Self {
        Self {
            state: CrawlState::Idle,
            visited: Mutex::new(VisitedSet::new()),
            frontier: Frontier::seeded(seed),
            store: ResultStore::new(),
            cancelled: AtomicBool::new(false),
            persist_failures: Vec::new(),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

type LevelQueue = Mutex<VecDeque<(usize, CrawlTask)>>;

/// Breadth-first crawl orchestration over a pool of browser sessions
pub struct CrawlEngine {
    config: CrawlConfig,
    filter: LinkFilter,
    processor: PageProcessor,
    limiter: RateLimiter,
    factory: Arc<dyn DriverFactory>,
    observer: Option<Arc<dyn CrawlObserver>>,
}

impl CrawlEngine {
    pub fn new(
        config: CrawlConfig,
        factory: Arc<dyn DriverFactory>,
        extractor: Arc<dyn Extractor>,
        link_finder: Arc<dyn LinkFinder>,
        observer: Option<Arc<dyn CrawlObserver>>,
    ) -> Result<Self, CrawlError> {
        config.validate()?;
        let filter = LinkFilter::new(&config)?;
        let processor = PageProcessor::new(&config, extractor, link_finder);
        let limiter = RateLimiter::new(config.request_interval());

        Ok(Self {
            config,
            filter,
            processor,
            limiter,
            factory,
            observer,
        })
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawl from `seed` and persist the result.
    ///
    /// Browser sessions are released on every exit path, including a panic
    /// inside the crawl loop, which is resumed afterwards.
    pub async fn run(&self, seed: &str) -> Result<CrawlResult, CrawlError> {
        let seed = parse_seed(seed)?;
        let started = std::time::Instant::now();
        ::log::info!(
            "Starting crawl of {} (max_depth={}, max_pages={}, workers={})",
            seed,
            self.config.max_depth,
            self.config.max_pages,
            self.config.concurrency
        );

        let mut ctx = CrawlContext::new(&seed);
        let mut drivers = self.launch_drivers().await?;

        let crawl = AssertUnwindSafe(self.crawl_levels(&mut ctx, &mut drivers))
            .catch_unwind()
            .await;

        self.transition(&mut ctx, CrawlState::Finalizing);
        self.release(&mut drivers).await;
        if let Err(panic) = crawl {
            ::log::error!("Crawl of {} panicked; browser sessions released", seed);
            std::panic::resume_unwind(panic);
        }

        let urls_crawled = ctx.visited.get_mut().len();
        let result = std::mem::take(&mut ctx.store).finalize(urls_crawled, self.config.max_depth);
        if let Err(e) = results::persist(&result, &self.config.output_dir) {
            ::log::error!("Failed to save crawl data: {}", e);
            ctx.persist_failures.push(e);
        }
        if let Some(observer) = &self.observer {
            observer.on_finish(&result);
        }
        self.transition(&mut ctx, CrawlState::Done);

        ::log::info!(
            "Crawling complete - {} pages in {}",
            urls_crawled,
            format_elapsed(started.elapsed())
        );

        if ctx.persist_failures.is_empty() {
            Ok(result)
        } else {
            Err(CrawlError::Persistence {
                result: Box::new(result),
                failures: ctx.persist_failures,
            })
        }
    }

    fn transition(&self, ctx: &mut CrawlContext, next: CrawlState) {
        ::log::debug!("Crawl state {:?} -> {:?}", ctx.state, next);
        ctx.state = next;
        if let Some(observer) = &self.observer {
            observer.on_state(next);
        }
    }

    /// Open one session per worker. A failed launch closes the sessions
    /// already opened and aborts the run.
    async fn launch_drivers(&self) -> Result<Vec<Box<dyn BrowserDriver>>, CrawlError> {
        let mut drivers = Vec::with_capacity(self.config.concurrency);
        for worker_id in 0..self.config.concurrency {
            match self.factory.launch(&self.config).await {
                Ok(driver) => {
                    ::log::debug!("Worker {} connected to browser", worker_id);
                    drivers.push(driver);
                }
                Err(e) => {
                    ::log::error!("Worker {} failed to start a browser: {}", worker_id, e);
                    self.release(&mut drivers).await;
                    return Err(CrawlError::DriverLaunch(e));
                }
            }
        }
        Ok(drivers)
    }

    async fn release(&self, drivers: &mut [Box<dyn BrowserDriver>]) {
        for (worker_id, driver) in drivers.iter_mut().enumerate() {
            if let Err(e) = driver.close().await {
                ::log::warn!("Worker {} failed to close browser: {}", worker_id, e);
            }
        }
    }

    async fn crawl_levels(&self, ctx: &mut CrawlContext, drivers: &mut [Box<dyn BrowserDriver>]) {
        self.transition(ctx, CrawlState::Running);

        while let Some((depth, tasks)) = ctx.frontier.next_level() {
            if depth > self.config.max_depth {
                let discarded = tasks.len() + ctx.frontier.clear();
                ::log::debug!(
                    "Discarding {} tasks beyond max depth {}",
                    discarded,
                    self.config.max_depth
                );
                break;
            }

            self.transition(ctx, CrawlState::Draining(depth));
            ::log::debug!("Draining {} tasks at depth {}", tasks.len(), depth);

            let discover_links = depth < self.config.max_depth;
            let outcomes = self.drain_level(ctx, tasks, discover_links, drivers).await;
            for outcome in outcomes {
                self.absorb(ctx, outcome);
            }

            if ctx.is_cancelled() {
                let discarded = ctx.frontier.clear();
                ::log::info!(
                    "Page cap of {} reached, discarding {} queued tasks",
                    self.config.max_pages,
                    discarded
                );
                break;
            }
        }
    }

    /// Run every task of one depth across the workers. Outcomes come back in
    /// queue order whatever the worker count.
    async fn drain_level(
        &self,
        ctx: &CrawlContext,
        tasks: Vec<CrawlTask>,
        discover_links: bool,
        drivers: &mut [Box<dyn BrowserDriver>],
    ) -> Vec<PageOutcome> {
        let queue: LevelQueue = Mutex::new(tasks.into_iter().enumerate().collect());

        let workers = drivers
            .iter_mut()
            .enumerate()
            .map(|(worker_id, driver)| {
                self.worker(worker_id, driver.as_mut(), ctx, &queue, discover_links)
            });

        let mut outcomes: Vec<(usize, PageOutcome)> =
            join_all(workers).await.into_iter().flatten().collect();
        outcomes.sort_by_key(|(slot, _)| *slot);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn worker(
        &self,
        worker_id: usize,
        driver: &mut dyn BrowserDriver,
        ctx: &CrawlContext,
        queue: &LevelQueue,
        discover_links: bool,
    ) -> Vec<(usize, PageOutcome)> {
        let mut processed = Vec::new();

        loop {
            if ctx.is_cancelled() {
                ::log::trace!("Worker {} stopping, crawl cancelled", worker_id);
                break;
            }
            let Some((slot, task)) = queue.lock().await.pop_front() else {
                break;
            };

            // Marked visited before navigating, so a failure is never retried
            let admission = ctx
                .visited
                .lock()
                .await
                .claim(&task.url, self.config.max_pages);
            let sequence = match admission {
                Admission::Fresh(sequence) => sequence,
                Admission::Duplicate => {
                    ::log::trace!("Worker {} skipping already visited: {}", worker_id, task.url);
                    continue;
                }
                Admission::CapReached => {
                    ctx.cancel();
                    break;
                }
            };
            if sequence >= self.config.max_pages {
                ctx.cancel();
            }

            self.limiter.acquire().await;
            let outcome = self
                .processor
                .process(driver, &task, sequence, discover_links)
                .await;

            if let Some(observer) = &self.observer {
                observer.on_page(&PageEvent {
                    url: &task.url,
                    depth: task.depth,
                    sequence,
                    max_pages: self.config.max_pages,
                    error: outcome.record.extraction_error.as_deref(),
                    raw_links: outcome.links.len(),
                });
            }
            processed.push((slot, outcome));
        }

        processed
    }

    /// Store a page's record and queue its new links for the next depth
    fn absorb(&self, ctx: &mut CrawlContext, outcome: PageOutcome) {
        let PageOutcome {
            task,
            record,
            final_url,
            links,
            screenshot,
            ..
        } = outcome;

        if let Some(Err(e)) = screenshot {
            ctx.persist_failures.push(e);
        }

        if !links.is_empty() {
            // Relative links follow redirects; the origin stays the task's
            let served = final_url.as_deref().unwrap_or(task.url.as_str());
            match (Url::parse(served), Url::parse(&task.url)) {
                (Ok(page), Ok(origin)) => {
                    let visited = ctx.visited.get_mut();
                    for link in self.filter.admissible_links(&links, &page, &origin) {
                        if visited.contains(&link) {
                            ::log::debug!("Skipping already visited link: {}", link);
                        } else if ctx.frontier.push(CrawlTask::new(link.clone(), task.depth + 1)) {
                            ::log::debug!("Queuing link for crawling: {}", link);
                        }
                    }
                }
                (Err(e), _) | (_, Err(e)) => {
                    ::log::warn!("Cannot resolve links of {}: {}", task.url, e)
                }
            }
        }

        ctx.store.append(record);
    }
}

/// Validate the seed and bring it into canonical form
pub fn parse_seed(seed: &str) -> Result<String, CrawlError> {
    let url = Url::parse(seed.trim()).map_err(|source| CrawlError::InvalidSeed {
        url: seed.to_string(),
        source,
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(CrawlError::UnsupportedSeed(seed.to_string()));
    }
    Ok(canonicalize(url).to_string())
}
