//! The browser capabilities the crawler relies on.
//!
//! The crawl engine only talks to [`BrowserDriver`]; [`webdriver`] provides
//! the implementation backed by a W3C WebDriver server.

pub mod webdriver;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

use crate::config::{CrawlConfig, WaitPolicy};
use crate::error::{DriverError, NavigationError};

pub use webdriver::{WebDriver, WebDriverFactory};

/// A page loaded by a driver session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHandle {
    /// URL that was requested
    pub requested_url: String,
    /// URL the browser ended up on after redirects
    pub current_url: String,
}

impl PageHandle {
    pub fn new(requested_url: impl Into<String>, current_url: impl Into<String>) -> Self {
        Self {
            requested_url: requested_url.into(),
            current_url: current_url.into(),
        }
    }
}

/// One browser session. Workers own their session exclusively.
#[async_trait]
pub trait BrowserDriver: Send {
    /// Load `url` and wait until `wait` is satisfied
    async fn navigate(&mut self, url: &str, wait: WaitPolicy) -> Result<PageHandle, NavigationError>;

    /// Run `script` as a function body in the page and return its result
    async fn evaluate(&mut self, page: &PageHandle, script: &str) -> Result<Value, DriverError>;

    /// Write a PNG screenshot of the viewport to `destination`
    async fn screenshot(&mut self, page: &PageHandle, destination: &Path) -> Result<(), DriverError>;

    /// End the session and release the browser
    async fn close(&mut self) -> Result<(), DriverError>;
}

/// Opens browser sessions for crawl workers
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn launch(&self, config: &CrawlConfig) -> Result<Box<dyn BrowserDriver>, DriverError>;
}
