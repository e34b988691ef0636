pub mod config;
pub mod crawlers;
pub mod driver;
pub mod error;
pub mod filter;
pub mod frontier;
pub mod limiter;
pub mod parsers;
pub mod processor;
pub mod results;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{BrowserKind, CrawlConfig, ProxyConfig, WaitPolicy};
pub use crawlers::{CrawlEngine, CrawlObserver, CrawlState, LogObserver, PageEvent};
pub use driver::{BrowserDriver, DriverFactory, PageHandle, WebDriverFactory};
pub use error::{CrawlError, Result};
pub use parsers::{Extractor, LinkFinder, PageFields};
pub use results::{CrawlMetadata, CrawlResult, ExtractedRecord};

use std::path::PathBuf;
use std::sync::Arc;

use parsers::{ScriptExtractor, ScriptLinkFinder};

/// Main builder for a crawl run
pub struct Crawler {
    seed: String,
    config: CrawlConfig,
    extractor: Option<Arc<dyn Extractor>>,
    link_finder: Option<Arc<dyn LinkFinder>>,
    driver_factory: Option<Arc<dyn DriverFactory>>,
    observer: Option<Arc<dyn CrawlObserver>>,
}

impl Crawler {
    /// Create a crawler for `seed` with the default configuration
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            config: CrawlConfig::default(),
            extractor: None,
            link_finder: None,
            driver_factory: None,
            observer: None,
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: CrawlConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a JSON file
    pub fn with_config_file(self, path: impl AsRef<std::path::Path>) -> Result<Self> {
        let config = CrawlConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Minimum spacing between page visits, in seconds
    pub fn with_request_interval(mut self, secs: f64) -> Self {
        self.config.request_interval_secs = secs;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Number of browser sessions working in parallel
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Use a custom record extractor instead of the in-page script
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_link_finder(mut self, link_finder: Arc<dyn LinkFinder>) -> Self {
        self.link_finder = Some(link_finder);
        self
    }

    /// Use another browser backend than WebDriver
    pub fn with_driver_factory(mut self, factory: Arc<dyn DriverFactory>) -> Self {
        self.driver_factory = Some(factory);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn CrawlObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Build the engine without running it
    pub fn build(self) -> Result<(CrawlEngine, String)> {
        let extractor = self
            .extractor
            .unwrap_or_else(|| Arc::new(ScriptExtractor::new(self.config.body_text_limit)));
        let link_finder = self
            .link_finder
            .unwrap_or_else(|| Arc::new(ScriptLinkFinder));
        let factory = self
            .driver_factory
            .unwrap_or_else(|| Arc::new(WebDriverFactory));

        let engine = CrawlEngine::new(self.config, factory, extractor, link_finder, self.observer)?;
        Ok((engine, self.seed))
    }

    /// Crawl, persist the result and return it
    pub async fn run(self) -> Result<CrawlResult> {
        let (engine, seed) = self.build()?;
        engine.run(&seed).await
    }
}

/// Crawl `seed` with `config` using the WebDriver backend
pub async fn crawl(seed: &str, config: CrawlConfig) -> Result<CrawlResult> {
    Crawler::new(seed).with_config(config).run().await
}
