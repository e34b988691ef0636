//! Error types shared across the crawler.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::results::CrawlResult;

/// Failure to bring a page into a loaded state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    /// The page did not reach the requested load state in time
    #[error("navigation timed out after {0:?}")]
    Timeout(Duration),

    /// DNS failure, refused connection, driver-side error, ...
    #[error("navigation failed: {0}")]
    Failed(String),
}

/// Failure of a driver command other than navigation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("could not start browser session at {endpoint}: {message}")]
    Launch { endpoint: String, message: String },

    #[error("driver command failed: {0}")]
    Command(String),

    #[error("could not write {path}: {message}")]
    Io { path: PathBuf, message: String },
}

/// Failure inside an extraction or link-discovery hook.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("in-page script failed: {0}")]
    Script(#[from] DriverError),

    #[error("unexpected script result: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

/// Failure to write part of the crawl output.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory {path} is not usable: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("screenshot {sequence} for {url} failed: {source}")]
    Screenshot {
        sequence: usize,
        url: String,
        #[source]
        source: DriverError,
    },
}

/// Configuration could not be loaded or is inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Top-level error returned by a crawl run.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid seed url '{url}': {source}")]
    InvalidSeed {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("seed url '{0}' is not an http(s) page")]
    UnsupportedSeed(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("browser driver failed to launch: {0}")]
    DriverLaunch(#[source] DriverError),

    /// The crawl finished but some output could not be written. The full
    /// in-memory result is carried along.
    #[error("crawl finished but {} output write(s) failed", failures.len())]
    Persistence {
        result: Box<CrawlResult>,
        failures: Vec<PersistError>,
    },
}

impl CrawlError {
    /// Recover the crawl data from a persistence failure.
    pub fn into_result(self) -> Option<CrawlResult> {
        match self {
            CrawlError::Persistence { result, .. } => Some(*result),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CrawlError>;
