use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Browser engine the WebDriver session is opened for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    #[serde(alias = "primary", alias = "chromium")]
    Chrome,
    #[serde(alias = "alt1")]
    Firefox,
    #[serde(alias = "alt2", alias = "webkit")]
    Safari,
}

impl BrowserKind {
    /// W3C `browserName` capability value
    pub fn browser_name(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Safari => "safari",
        }
    }
}

/// How far a navigation must get before it counts as loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitPolicy {
    /// DOMContentLoaded fired; sub-resources may still be loading
    #[default]
    DomContentLoaded,
    /// The full load event fired
    Load,
}

/// Outbound proxy for the browser session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy address, e.g. `http://10.0.0.1:3128` or `socks5://10.0.0.1:1080`
    pub server: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Configuration for a crawl run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Deepest link level that is still visited (seed is depth 0)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Upper bound on pages visited in one run
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Minimum spacing between the start of two navigations, in seconds
    #[serde(default = "default_request_interval_secs")]
    pub request_interval_secs: f64,

    #[serde(default)]
    pub browser: BrowserKind,

    /// Directory for the JSON result and the screenshots folder
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default)]
    pub user_agent: Option<String>,

    #[serde(default)]
    pub proxy: Option<ProxyConfig>,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Number of workers, each with its own browser session
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// Extra wait after load for client-side rendering, in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default)]
    pub wait_policy: WaitPolicy,

    /// Pause before every browser command, in milliseconds
    #[serde(default)]
    pub slow_mo_ms: u64,

    /// Characters of body text kept per page
    #[serde(default = "default_body_text_limit")]
    pub body_text_limit: usize,

    #[serde(default = "default_true")]
    pub screenshots: bool,

    /// Skip images, stylesheets, scripts, fonts and PDFs
    #[serde(default = "default_true")]
    pub skip_assets: bool,

    /// Regex patterns for URLs to include
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Regex patterns for URLs to exclude
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

fn default_max_depth() -> usize {
    3
}

fn default_max_pages() -> usize {
    100
}

fn default_request_interval_secs() -> f64 {
    1.0
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_headless() -> bool {
    true
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_concurrency() -> usize {
    1
}

fn default_navigation_timeout_secs() -> u64 {
    30
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_body_text_limit() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            request_interval_secs: default_request_interval_secs(),
            browser: BrowserKind::default(),
            output_dir: default_output_dir(),
            headless: default_headless(),
            user_agent: None,
            proxy: None,
            webdriver_url: default_webdriver_url(),
            concurrency: default_concurrency(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            wait_policy: WaitPolicy::default(),
            slow_mo_ms: 0,
            body_text_limit: default_body_text_limit(),
            screenshots: true,
            skip_assets: true,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl CrawlConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply `WEBDRIVER_URL`, `HEADLESS`, `USER_AGENT` and `SLOW_MO` from the
    /// environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("WEBDRIVER_URL").filter(|v| !v.is_empty()) {
            self.webdriver_url = url;
        }
        if let Some(headless) = lookup("HEADLESS") {
            self.headless = headless.trim().eq_ignore_ascii_case("true");
        }
        if let Some(agent) = lookup("USER_AGENT").filter(|v| !v.is_empty()) {
            self.user_agent = Some(agent);
        }
        match lookup("SLOW_MO").map(|v| v.trim().parse::<u64>()) {
            Some(Ok(ms)) => self.slow_mo_ms = ms,
            Some(Err(e)) => ::log::warn!("Ignoring SLOW_MO: {}", e),
            None => {}
        }
    }

    /// Reject settings the crawler cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pages == 0 {
            return Err(ConfigError::Invalid {
                field: "max_pages",
                message: "must be at least 1".to_string(),
            });
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "concurrency",
                message: "must be at least 1".to_string(),
            });
        }
        if self.navigation_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "navigation_timeout_secs",
                message: "must be at least 1".to_string(),
            });
        }
        if !self.request_interval_secs.is_finite() || self.request_interval_secs < 0.0 {
            return Err(ConfigError::Invalid {
                field: "request_interval_secs",
                message: format!("{} is not a non-negative number", self.request_interval_secs),
            });
        }
        for pattern in self.include_patterns.iter().chain(&self.exclude_patterns) {
            regex::Regex::new(pattern).map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_secs_f64(self.request_interval_secs.max(0.0))
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn slow_mo(&self) -> Duration {
        Duration::from_millis(self.slow_mo_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        self.output_dir.join("screenshots")
    }
}
