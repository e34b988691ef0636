use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{CrawlConfig, WaitPolicy};
use crate::driver::{BrowserDriver, PageHandle};
use crate::error::{DriverError, PersistError};
use crate::frontier::CrawlTask;
use crate::parsers::{Extractor, LinkFinder};
use crate::results::{self, ExtractedRecord};
use crate::utils::screenshot_filename;

/// Everything one navigate-extract-screenshot-discover cycle produced
#[derive(Debug)]
pub struct PageOutcome {
    pub task: CrawlTask,
    /// 1-based visit sequence number
    pub sequence: usize,
    pub record: ExtractedRecord,
    /// Where the browser ended up after redirects; `None` on failure
    pub final_url: Option<String>,
    /// Raw outbound links, relative to `final_url`; empty on failure
    pub links: Vec<String>,
    /// `None` when no screenshot was attempted
    pub screenshot: Option<Result<PathBuf, PersistError>>,
}

/// Runs one page through the browser
pub struct PageProcessor {
    extractor: Arc<dyn Extractor>,
    link_finder: Arc<dyn LinkFinder>,
    wait_policy: WaitPolicy,
    settle_delay: Duration,
    screenshot_dir: Option<PathBuf>,
}

impl PageProcessor {
    pub fn new(
        config: &CrawlConfig,
        extractor: Arc<dyn Extractor>,
        link_finder: Arc<dyn LinkFinder>,
    ) -> Self {
        Self {
            extractor,
            link_finder,
            wait_policy: config.wait_policy,
            settle_delay: config.settle_delay(),
            screenshot_dir: config.screenshots.then(|| config.screenshot_dir()),
        }
    }

    /// Process `task`. Never fails: navigation and extraction problems end
    /// up in the record's `extraction_error`.
    pub async fn process(
        &self,
        driver: &mut dyn BrowserDriver,
        task: &CrawlTask,
        sequence: usize,
        discover_links: bool,
    ) -> PageOutcome {
        let started = Instant::now();
        ::log::info!("Crawling: {} (depth: {})", task.url, task.depth);

        let page = match driver.navigate(&task.url, self.wait_policy).await {
            Ok(page) => page,
            Err(e) => {
                ::log::warn!("Error crawling {}: {}", task.url, e);
                return self.failed(task, sequence, e);
            }
        };

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let fields = match self.extractor.extract(driver, &page).await {
            Ok(fields) => fields,
            Err(e) => {
                ::log::warn!("Extraction failed for {}: {}", task.url, e);
                return self.failed(task, sequence, e);
            }
        };

        let record = ExtractedRecord {
            url: task.url.clone(),
            title: fields.title,
            timestamp: Utc::now(),
            body_text: fields.body_text,
            meta_tags: fields.meta_tags,
            extraction_error: None,
            extra: results::without_reserved_keys(fields.extra),
        };

        let screenshot = match &self.screenshot_dir {
            Some(dir) => Some(self.capture(driver, &page, dir, sequence).await),
            None => None,
        };

        let links = if discover_links {
            match self
                .link_finder
                .discover_links(driver, &page, &page.current_url)
                .await
            {
                Ok(links) => links,
                Err(e) => {
                    ::log::warn!("Link discovery failed for {}: {}", task.url, e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        ::log::debug!(
            "Processed {} in {:.2} seconds, {} raw links",
            task.url,
            started.elapsed().as_secs_f64(),
            links.len()
        );

        PageOutcome {
            task: task.clone(),
            sequence,
            record,
            final_url: Some(page.current_url),
            links,
            screenshot,
        }
    }

    async fn capture(
        &self,
        driver: &mut dyn BrowserDriver,
        page: &PageHandle,
        dir: &Path,
        sequence: usize,
    ) -> Result<PathBuf, PersistError> {
        let path = dir.join(screenshot_filename(sequence));
        let result = match tokio::fs::create_dir_all(dir).await {
            Ok(()) => driver.screenshot(page, &path).await,
            Err(e) => Err(DriverError::Io {
                path: dir.to_path_buf(),
                message: e.to_string(),
            }),
        };

        result.map(|()| path).map_err(|source| {
            ::log::warn!("Screenshot {} for {} failed: {}", sequence, page.requested_url, source);
            PersistError::Screenshot {
                sequence,
                url: page.requested_url.clone(),
                source,
            }
        })
    }

    fn failed(&self, task: &CrawlTask, sequence: usize, error: impl ToString) -> PageOutcome {
        PageOutcome {
            task: task.clone(),
            sequence,
            record: ExtractedRecord::failed(task.url.clone(), error),
            final_url: None,
            links: Vec::new(),
            screenshot: None,
        }
    }
}
