//! Extraction from serialized page source, for sites where in-page scripts
//! returning structured values are restricted.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::BTreeMap;

use crate::driver::{BrowserDriver, PageHandle};
use crate::error::ExtractionError;
use crate::parsers::{Extractor, LinkFinder, OUTER_HTML_SCRIPT, PageFields, text};

/// What the source parser pulls out of a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    pub title: String,
    pub text: String,
    pub meta_tags: BTreeMap<String, String>,
    pub links: Vec<String>,
}

/// Parses HTML content to extract title, text, meta tags and links
pub fn parse(html: &str) -> ParsedDocument {
    let doc = Html::parse_document(html);

    ParsedDocument {
        title: extract_title(&doc),
        text: extract_text(&doc),
        meta_tags: extract_meta_tags(&doc),
        links: extract_links(&doc),
    }
}

fn extract_title(doc: &Html) -> String {
    let selector = Selector::parse("title").unwrap();
    doc.select(&selector)
        .next()
        .map(|title| text::normalize_whitespace_in_segment(&title.text().collect::<String>()))
        .unwrap_or_default()
}

fn extract_text(doc: &Html) -> String {
    let content_selector = Selector::parse("body").unwrap();
    doc.select(&content_selector)
        .flat_map(|n| n.text())
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_meta_tags(doc: &Html) -> BTreeMap<String, String> {
    let selector = Selector::parse("meta").unwrap();
    doc.select(&selector)
        .filter_map(|meta| {
            let element = meta.value();
            let key = element.attr("name").or_else(|| element.attr("property"))?;
            Some((
                key.to_string(),
                element.attr("content").unwrap_or_default().to_string(),
            ))
        })
        .collect()
}

fn extract_links(doc: &Html) -> Vec<String> {
    let link_selector = Selector::parse("a[href]").unwrap();
    let links = doc
        .select(&link_selector)
        .filter_map(|e| e.value().attr("href"))
        .map(|s| s.to_string())
        .collect::<Vec<String>>();

    ::log::debug!("HTML parser found {} links", links.len());
    links
}

async fn page_source(
    driver: &mut dyn BrowserDriver,
    page: &PageHandle,
) -> Result<String, ExtractionError> {
    let value = driver.evaluate(page, OUTER_HTML_SCRIPT).await?;
    Ok(serde_json::from_value(value)?)
}

/// Extractor that parses the rendered DOM with `scraper`
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    body_text_limit: usize,
}

impl HtmlExtractor {
    pub fn new(body_text_limit: usize) -> Self {
        Self { body_text_limit }
    }
}

#[async_trait]
impl Extractor for HtmlExtractor {
    async fn extract(
        &self,
        driver: &mut dyn BrowserDriver,
        page: &PageHandle,
    ) -> Result<PageFields, ExtractionError> {
        let source = page_source(driver, page).await?;
        let parsed = parse(&source);

        Ok(PageFields {
            title: parsed.title,
            body_text: text::truncate(&parsed.text, self.body_text_limit),
            meta_tags: parsed.meta_tags,
            ..PageFields::default()
        })
    }
}

/// Link finder that reads anchors from the rendered DOM with `scraper`
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlLinkFinder;

#[async_trait]
impl LinkFinder for HtmlLinkFinder {
    async fn discover_links(
        &self,
        driver: &mut dyn BrowserDriver,
        page: &PageHandle,
        _base_url: &str,
    ) -> Result<Vec<String>, ExtractionError> {
        let source = page_source(driver, page).await?;
        Ok(parse(&source).links)
    }
}
