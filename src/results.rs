use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PersistError;

/// What was extracted from one visited page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Canonical URL of the crawl task
    pub url: String,

    #[serde(default)]
    pub title: String,

    /// When the page was processed
    pub timestamp: DateTime<Utc>,

    /// Visible text, truncated
    #[serde(default)]
    pub body_text: String,

    /// Meta tag name/property to content
    #[serde(default)]
    pub meta_tags: BTreeMap<String, String>,

    /// Set when navigation or extraction failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_error: Option<String>,

    /// Fields added by custom extractors
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExtractedRecord {
    /// Record for a page that could not be loaded or read
    pub fn failed(url: impl Into<String>, error: impl ToString) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            timestamp: Utc::now(),
            body_text: String::new(),
            meta_tags: BTreeMap::new(),
            extraction_error: Some(error.to_string()),
            extra: Map::new(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.extraction_error.is_some()
    }
}

/// Keys an [`ExtractedRecord`] already serializes itself
pub const RESERVED_FIELDS: [&str; 6] = [
    "url",
    "title",
    "timestamp",
    "body_text",
    "meta_tags",
    "extraction_error",
];

/// Move custom fields that would clash with a record's own keys under an
/// `extra_` prefix, so the flattened JSON never repeats a key.
pub fn without_reserved_keys(extra: Map<String, Value>) -> Map<String, Value> {
    let mut clean = Map::with_capacity(extra.len());
    let mut clashing = Vec::new();
    for (key, value) in extra {
        if RESERVED_FIELDS.contains(&key.as_str()) {
            clashing.push((key, value));
        } else {
            clean.insert(key, value);
        }
    }

    for (key, value) in clashing {
        let mut renamed = format!("extra_{key}");
        while clean.contains_key(&renamed) || RESERVED_FIELDS.contains(&renamed.as_str()) {
            renamed.insert_str(0, "extra_");
        }
        ::log::warn!("Custom field '{}' clashes with a record field, stored as '{}'", key, renamed);
        clean.insert(renamed, value);
    }
    clean
}

/// Summary written next to the records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlMetadata {
    pub urls_crawled: usize,
    pub max_depth: usize,
    pub timestamp: DateTime<Utc>,
}

/// Everything a crawl run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub metadata: CrawlMetadata,
    pub data: Vec<ExtractedRecord>,
}

impl CrawlResult {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExtractedRecord> {
        self.data.iter().filter(|record| record.is_failure())
    }
}

/// Collects records in processing order until the run ends
#[derive(Debug, Default)]
pub struct ResultStore {
    records: Vec<ExtractedRecord>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: ExtractedRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Close the store and produce the run's result
    pub fn finalize(self, urls_crawled: usize, max_depth: usize) -> CrawlResult {
        CrawlResult {
            metadata: CrawlMetadata {
                urls_crawled,
                max_depth,
                timestamp: Utc::now(),
            },
            data: self.records,
        }
    }
}

/// File name for a run finished at `at` (UTC), e.g. `crawl_data_20240131_142501.json`
pub fn result_filename(at: DateTime<Utc>) -> String {
    format!("crawl_data_{}.json", at.format("%Y%m%d_%H%M%S"))
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    fs::create_dir_all(dir).map_err(|source| PersistError::OutputDir {
        path: dir.to_path_buf(),
        source,
    })?;
    if !dir.is_dir() {
        return Err(PersistError::OutputDir {
            path: dir.to_path_buf(),
            source: std::io::Error::other("path is not a directory"),
        });
    }
    Ok(())
}

/// Write `result` as pretty JSON into `dir`, returning the file path
pub fn persist(result: &CrawlResult, dir: &Path) -> Result<PathBuf, PersistError> {
    ensure_output_dir(dir)?;

    let path = dir.join(result_filename(result.metadata.timestamp));
    let json = result.to_json()?;
    fs::write(&path, json)?;

    ::log::info!("Saved {} crawled pages to {}", result.data.len(), path.display());
    Ok(path)
}
