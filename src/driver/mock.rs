//! In-memory browser used by the crawler tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{BrowserDriver, DriverFactory, PageHandle};
use crate::config::{CrawlConfig, WaitPolicy};
use crate::error::{DriverError, NavigationError};
use crate::parsers::{EXTRACT_SCRIPT, LINKS_SCRIPT, OUTER_HTML_SCRIPT};

/// Canned content for one URL
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    pub title: String,
    pub body_text: String,
    pub meta_tags: Vec<(String, String)>,
    /// Anchor targets as the DOM would report them
    pub links: Vec<String>,
    pub timeout: bool,
    pub script_error: bool,
    /// Where the browser lands after loading this URL
    pub redirect_to: Option<String>,
}

impl MockPage {
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            body_text: format!("{title} body"),
            ..Self::default()
        }
    }

    pub fn with_links(mut self, links: &[&str]) -> Self {
        self.links = links.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn redirecting_to(mut self, target: &str) -> Self {
        self.redirect_to = Some(target.to_string());
        self
    }

    pub fn timing_out() -> Self {
        Self {
            timeout: true,
            ..Self::default()
        }
    }

    fn outer_html(&self) -> String {
        let meta: String = self
            .meta_tags
            .iter()
            .map(|(k, v)| format!(r#"<meta name="{k}" content="{v}">"#))
            .collect();
        let anchors: String = self
            .links
            .iter()
            .map(|href| format!(r#"<a href="{href}">link</a>"#))
            .collect();
        format!(
            "<html><head><title>{}</title>{}</head><body><p>{}</p>{}</body></html>",
            self.title, meta, self.body_text, anchors
        )
    }
}

/// Everything the mock browser was asked to do, shared across sessions
#[derive(Debug, Default)]
pub struct MockLog {
    pub navigations: Vec<String>,
    pub screenshots: Vec<String>,
    pub launched: usize,
    pub closed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MockSite {
    pages: Arc<HashMap<String, MockPage>>,
    pub log: Arc<Mutex<MockLog>>,
    pub fail_launch_after: Option<usize>,
    pub fail_screenshots: bool,
}

impl MockSite {
    pub fn new(pages: Vec<(&str, MockPage)>) -> Self {
        Self {
            pages: Arc::new(pages.into_iter().map(|(u, p)| (u.to_string(), p)).collect()),
            ..Self::default()
        }
    }

    pub fn navigations(&self) -> Vec<String> {
        self.log.lock().unwrap().navigations.clone()
    }

    pub fn launched(&self) -> usize {
        self.log.lock().unwrap().launched
    }

    pub fn closed(&self) -> usize {
        self.log.lock().unwrap().closed
    }
}

#[async_trait]
impl DriverFactory for MockSite {
    async fn launch(&self, _config: &CrawlConfig) -> Result<Box<dyn BrowserDriver>, DriverError> {
        let mut log = self.log.lock().unwrap();
        if self.fail_launch_after.is_some_and(|n| log.launched >= n) {
            return Err(DriverError::Launch {
                endpoint: "mock://".to_string(),
                message: "browser binary not found".to_string(),
            });
        }
        log.launched += 1;
        Ok(Box::new(MockDriver {
            site: self.clone(),
            current: None,
        }))
    }
}

pub struct MockDriver {
    site: MockSite,
    current: Option<MockPage>,
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&mut self, url: &str, _wait: WaitPolicy) -> Result<PageHandle, NavigationError> {
        self.site.log.lock().unwrap().navigations.push(url.to_string());
        self.current = None;

        match self.site.pages.get(url) {
            Some(page) if page.timeout => Err(NavigationError::Timeout(Duration::from_secs(30))),
            Some(page) => {
                self.current = Some(page.clone());
                let landed = page.redirect_to.as_deref().unwrap_or(url);
                Ok(PageHandle::new(url, landed))
            }
            None => Err(NavigationError::Failed(format!(
                "net::ERR_NAME_NOT_RESOLVED at {url}"
            ))),
        }
    }

    async fn evaluate(&mut self, _page: &PageHandle, script: &str) -> Result<Value, DriverError> {
        let page = self
            .current
            .as_ref()
            .ok_or_else(|| DriverError::Command("no page loaded".to_string()))?;
        if page.script_error {
            return Err(DriverError::Command("javascript error: boom".to_string()));
        }

        if script == EXTRACT_SCRIPT {
            let meta: serde_json::Map<String, Value> = page
                .meta_tags
                .iter()
                .map(|(k, v)| (k.clone(), json!(v)))
                .collect();
            Ok(json!({
                "title": page.title,
                "body_text": page.body_text,
                "meta_tags": meta,
            }))
        } else if script == LINKS_SCRIPT {
            Ok(json!(page.links))
        } else if script == OUTER_HTML_SCRIPT {
            Ok(json!(page.outer_html()))
        } else {
            Err(DriverError::Command(format!("unexpected script: {script}")))
        }
    }

    async fn screenshot(&mut self, page: &PageHandle, destination: &Path) -> Result<(), DriverError> {
        if self.site.fail_screenshots {
            return Err(DriverError::Io {
                path: destination.to_path_buf(),
                message: "disk full".to_string(),
            });
        }
        std::fs::write(destination, b"\x89PNG").map_err(|e| DriverError::Io {
            path: destination.to_path_buf(),
            message: e.to_string(),
        })?;
        self.site
            .log
            .lock()
            .unwrap()
            .screenshots
            .push(page.requested_url.clone());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.site.log.lock().unwrap().closed += 1;
        Ok(())
    }
}
