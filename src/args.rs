use clap::{Parser, ValueEnum};
use snapcrawl::{BrowserKind, CrawlConfig, ProxyConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "snapcrawl")]
#[command(about = "Breadth-first website crawler that records and screenshots every page")]
#[command(version)]
pub struct Args {
    /// Seed URL to start crawling from
    pub url: String,

    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Deepest link level to visit (seed is depth 0)
    #[arg(short = 'd', long)]
    pub max_depth: Option<usize>,

    /// Maximum number of pages to visit
    #[arg(short = 'p', long)]
    pub max_pages: Option<usize>,

    /// Seconds between page visits
    #[arg(short, long)]
    pub interval: Option<f64>,

    /// Browser engine
    #[arg(short, long, value_enum)]
    pub browser: Option<BrowserArg>,

    /// Output directory for crawl data and screenshots
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Override the browser user agent
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Proxy server, e.g. http://10.0.0.1:3128
    #[arg(long)]
    pub proxy: Option<String>,

    /// Number of browser sessions
    #[arg(long)]
    pub concurrency: Option<usize>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BrowserArg {
    Chrome,
    Firefox,
    Safari,
}

impl From<BrowserArg> for BrowserKind {
    fn from(arg: BrowserArg) -> Self {
        match arg {
            BrowserArg::Chrome => BrowserKind::Chrome,
            BrowserArg::Firefox => BrowserKind::Firefox,
            BrowserArg::Safari => BrowserKind::Safari,
        }
    }
}

impl Args {
    /// Apply the flags that were given on top of `config`
    pub fn apply(&self, config: &mut CrawlConfig) {
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(interval) = self.interval {
            config.request_interval_secs = interval;
        }
        if let Some(browser) = self.browser {
            config.browser = browser.into();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if self.headful {
            config.headless = false;
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = Some(user_agent.clone());
        }
        if let Some(server) = &self.proxy {
            config.proxy = Some(ProxyConfig {
                server: server.clone(),
                username: None,
                password: None,
            });
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "snapcrawl",
            "https://example.com",
            "--max-depth",
            "1",
            "--browser",
            "firefox",
            "--headful",
            "--proxy",
            "http://10.0.0.1:3128",
        ]);
        let mut config = CrawlConfig::default();
        args.apply(&mut config);

        assert_eq!(config.max_depth, 1);
        assert_eq!(config.max_pages, 100);
        assert_eq!(config.browser, BrowserKind::Firefox);
        assert!(!config.headless);
        assert_eq!(config.proxy.unwrap().server, "http://10.0.0.1:3128");
    }
}
