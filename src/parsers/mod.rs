//! Pluggable page extraction and link discovery.
//!
//! The page processor calls an [`Extractor`] and a [`LinkFinder`] for every
//! loaded page. [`ScriptExtractor`] and [`ScriptLinkFinder`] are the
//! defaults and run small scripts inside the page; [`html`] offers the same
//! on the serialized DOM. Custom strategies can return extra fields through
//! [`PageFields::extra`].

pub mod html;
pub mod text;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::driver::{BrowserDriver, PageHandle};
use crate::error::ExtractionError;

pub use html::{HtmlExtractor, HtmlLinkFinder};

/// Title, visible text and meta tags of the loaded document
pub const EXTRACT_SCRIPT: &str = r#"
const metaTags = {};
document.querySelectorAll('meta').forEach(meta => {
    const key = meta.getAttribute('name') || meta.getAttribute('property');
    if (key) metaTags[key] = meta.getAttribute('content') || '';
});
return {
    title: document.title || '',
    body_text: document.body ? document.body.innerText : '',
    meta_tags: metaTags,
};
"#;

/// Every anchor target, resolved by the browser
pub const LINKS_SCRIPT: &str = r#"
return Array.from(document.querySelectorAll('a[href]')).map(a => a.href);
"#;

/// The rendered DOM as HTML
pub const OUTER_HTML_SCRIPT: &str = "return document.documentElement.outerHTML;";

/// Fields an extractor produces for one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageFields {
    pub title: String,
    pub body_text: String,
    pub meta_tags: BTreeMap<String, String>,
    /// Additional structured data, flattened into the persisted record
    pub extra: Map<String, Value>,
}

/// Turns a loaded page into record fields
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        driver: &mut dyn BrowserDriver,
        page: &PageHandle,
    ) -> Result<PageFields, ExtractionError>;
}

/// Lists the raw outbound links of a loaded page.
///
/// Results are not expected to be filtered; the crawler normalizes them
/// and drops anything off-site.
#[async_trait]
pub trait LinkFinder: Send + Sync {
    async fn discover_links(
        &self,
        driver: &mut dyn BrowserDriver,
        page: &PageHandle,
        base_url: &str,
    ) -> Result<Vec<String>, ExtractionError>;
}

#[derive(Debug, Deserialize)]
struct ScriptFields {
    #[serde(default)]
    title: String,
    #[serde(default)]
    body_text: String,
    #[serde(default)]
    meta_tags: BTreeMap<String, String>,
}

/// Default extractor: title, tidied and truncated visible text, meta tags
#[derive(Debug, Clone)]
pub struct ScriptExtractor {
    body_text_limit: usize,
}

impl ScriptExtractor {
    pub fn new(body_text_limit: usize) -> Self {
        Self { body_text_limit }
    }
}

#[async_trait]
impl Extractor for ScriptExtractor {
    async fn extract(
        &self,
        driver: &mut dyn BrowserDriver,
        page: &PageHandle,
    ) -> Result<PageFields, ExtractionError> {
        let value = driver.evaluate(page, EXTRACT_SCRIPT).await?;
        let fields: ScriptFields = serde_json::from_value(value)?;

        Ok(PageFields {
            title: fields.title,
            body_text: text::truncate(&text::tidy(&fields.body_text), self.body_text_limit),
            meta_tags: fields.meta_tags,
            extra: Map::new(),
        })
    }
}

/// Default link finder: every anchor in the rendered DOM
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptLinkFinder;

#[async_trait]
impl LinkFinder for ScriptLinkFinder {
    async fn discover_links(
        &self,
        driver: &mut dyn BrowserDriver,
        page: &PageHandle,
        _base_url: &str,
    ) -> Result<Vec<String>, ExtractionError> {
        let value = driver.evaluate(page, LINKS_SCRIPT).await?;
        let links: Vec<Option<String>> = serde_json::from_value(value)?;
        Ok(links.into_iter().flatten().collect())
    }
}
