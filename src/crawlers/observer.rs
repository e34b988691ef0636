use crate::crawlers::web::CrawlState;
use crate::results::CrawlResult;

/// Progress report sent after each processed page
#[derive(Debug, Clone)]
pub struct PageEvent<'a> {
    pub url: &'a str,
    pub depth: usize,
    /// 1-based visit sequence number
    pub sequence: usize,
    pub max_pages: usize,
    /// Set when the page produced an `extraction_error`
    pub error: Option<&'a str>,
    pub raw_links: usize,
}

/// Receives progress callbacks from the crawl loop.
///
/// Callbacks run on the crawl task; keep them short.
pub trait CrawlObserver: Send + Sync {
    fn on_page(&self, event: &PageEvent<'_>);

    fn on_state(&self, _state: CrawlState) {}

    fn on_finish(&self, _result: &CrawlResult) {}
}

/// Reports progress through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl CrawlObserver for LogObserver {
    fn on_page(&self, event: &PageEvent<'_>) {
        match event.error {
            Some(error) => ::log::info!(
                "[{}/{}] {} failed: {}",
                event.sequence,
                event.max_pages,
                event.url,
                error
            ),
            None => ::log::info!(
                "[{}/{}] {} (depth {}, {} links)",
                event.sequence,
                event.max_pages,
                event.url,
                event.depth,
                event.raw_links
            ),
        }
    }

    fn on_finish(&self, result: &CrawlResult) {
        ::log::info!(
            "Crawl finished: {} pages, {} failed",
            result.metadata.urls_crawled,
            result.failures().count()
        );
    }
}
