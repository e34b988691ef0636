use async_trait::async_trait;
use fantoccini::wd::{Capabilities, TimeoutConfiguration};
use fantoccini::{Client, ClientBuilder};
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

use super::{BrowserDriver, DriverFactory, PageHandle};
use crate::config::{BrowserKind, CrawlConfig, ProxyConfig, WaitPolicy};
use crate::error::{DriverError, NavigationError};

/// Ports WebDriver servers commonly listen on
const FALLBACK_WEBDRIVER_URLS: [&str; 3] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4444", // geckodriver / Selenium default
    "http://127.0.0.1:4444",
];

const READY_STATE_POLL: Duration = Duration::from_millis(100);

/// Opens a fresh WebDriver session per worker
#[derive(Debug, Default, Clone, Copy)]
pub struct WebDriverFactory;

#[async_trait]
impl DriverFactory for WebDriverFactory {
    async fn launch(&self, config: &CrawlConfig) -> Result<Box<dyn BrowserDriver>, DriverError> {
        let driver = WebDriver::connect(config).await?;
        Ok(Box::new(driver))
    }
}

/// A browser session driven over the WebDriver protocol
pub struct WebDriver {
    client: Option<Client>,
    endpoint: String,
    navigation_timeout: Duration,
    /// Pause before every command
    slow_mo: Duration,
}

impl WebDriver {
    /// Connect to the configured WebDriver server, falling back to common
    /// local endpoints.
    pub async fn connect(config: &CrawlConfig) -> Result<Self, DriverError> {
        let capabilities = build_capabilities(config);
        ::log::debug!("WebDriver capabilities: {}", Value::Object(capabilities.clone()));

        let mut last_error = None;
        let candidates = std::iter::once(config.webdriver_url.as_str()).chain(
            FALLBACK_WEBDRIVER_URLS
                .iter()
                .copied()
                .filter(|url| *url != config.webdriver_url),
        );

        for endpoint in candidates {
            let mut builder = ClientBuilder::native();
            builder.capabilities(capabilities.clone());
            match builder.connect(endpoint).await {
                Ok(client) => {
                    ::log::info!(
                        "Connected to WebDriver at {} ({})",
                        endpoint,
                        config.browser.browser_name()
                    );
                    let timeouts =
                        TimeoutConfiguration::new(None, Some(config.navigation_timeout()), None);
                    if let Err(e) = client.update_timeouts(timeouts).await {
                        ::log::warn!("Could not set page load timeout: {}", e);
                    }
                    return Ok(Self {
                        client: Some(client),
                        endpoint: endpoint.to_string(),
                        navigation_timeout: config.navigation_timeout(),
                        slow_mo: config.slow_mo(),
                    });
                }
                Err(e) => {
                    ::log::debug!("WebDriver at {} unavailable: {}", endpoint, e);
                    last_error = Some(DriverError::Launch {
                        endpoint: endpoint.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(last_error.unwrap_or_else(|| DriverError::Launch {
            endpoint: config.webdriver_url.clone(),
            message: "no endpoint to try".to_string(),
        }))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn client(&self) -> Result<&Client, DriverError> {
        self.client
            .as_ref()
            .ok_or_else(|| DriverError::Command("session already closed".to_string()))
    }

    async fn pause(&self) {
        if !self.slow_mo.is_zero() {
            tokio::time::sleep(self.slow_mo).await;
        }
    }

    async fn wait_for_load(&self, client: &Client) -> Result<(), fantoccini::error::CmdError> {
        loop {
            let state = client.execute("return document.readyState", Vec::new()).await?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            tokio::time::sleep(READY_STATE_POLL).await;
        }
    }
}

#[async_trait]
impl BrowserDriver for WebDriver {
    async fn navigate(&mut self, url: &str, wait: WaitPolicy) -> Result<PageHandle, NavigationError> {
        self.pause().await;
        let client = self
            .client()
            .map_err(|e| NavigationError::Failed(e.to_string()))?;

        let load = async {
            client.goto(url).await?;
            if wait == WaitPolicy::Load {
                self.wait_for_load(client).await?;
            }
            client.current_url().await
        };

        match timeout(self.navigation_timeout, load).await {
            Ok(Ok(current)) => Ok(PageHandle::new(url, current.to_string())),
            Ok(Err(e)) => {
                let message = e.to_string();
                if message.to_lowercase().contains("timeout") {
                    Err(NavigationError::Timeout(self.navigation_timeout))
                } else {
                    Err(NavigationError::Failed(message))
                }
            }
            Err(_) => Err(NavigationError::Timeout(self.navigation_timeout)),
        }
    }

    async fn evaluate(&mut self, _page: &PageHandle, script: &str) -> Result<Value, DriverError> {
        self.pause().await;
        self.client()?
            .execute(script, Vec::new())
            .await
            .map_err(|e| DriverError::Command(e.to_string()))
    }

    async fn screenshot(&mut self, _page: &PageHandle, destination: &Path) -> Result<(), DriverError> {
        self.pause().await;
        let png = self
            .client()?
            .screenshot()
            .await
            .map_err(|e| DriverError::Command(e.to_string()))?;

        tokio::fs::write(destination, png)
            .await
            .map_err(|e| DriverError::Io {
                path: destination.to_path_buf(),
                message: e.to_string(),
            })
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        match self.client.take() {
            Some(client) => {
                ::log::debug!("Closing WebDriver session at {}", self.endpoint);
                client
                    .close()
                    .await
                    .map_err(|e| DriverError::Command(e.to_string()))
            }
            None => Ok(()),
        }
    }
}

/// Translate the crawl configuration into W3C and vendor capabilities
pub fn build_capabilities(config: &CrawlConfig) -> Capabilities {
    let mut caps = Capabilities::new();
    caps.insert("browserName".to_string(), json!(config.browser.browser_name()));
    caps.insert(
        "pageLoadStrategy".to_string(),
        json!(match config.wait_policy {
            WaitPolicy::DomContentLoaded => "eager",
            WaitPolicy::Load => "normal",
        }),
    );

    let proxy = config.proxy.as_ref().and_then(proxy_endpoint);
    if let Some(proxy) = &config.proxy {
        if proxy.username.is_some() || proxy.password.is_some() {
            ::log::warn!(
                "Proxy credentials for {} cannot be passed through WebDriver; configure them on the proxy",
                proxy.server
            );
        }
    }

    match config.browser {
        BrowserKind::Chrome => {
            let mut args = Vec::new();
            if config.headless {
                args.push("--headless=new".to_string());
            }
            if let Some(agent) = &config.user_agent {
                args.push(format!("--user-agent={agent}"));
            }
            if let Some(proxy) = &proxy {
                args.push(format!("--proxy-server={}://{}", proxy.scheme, proxy.address));
            }
            caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        }
        BrowserKind::Firefox => {
            let args: Vec<&str> = if config.headless { vec!["-headless"] } else { Vec::new() };
            let mut options = json!({ "args": args });
            if let Some(agent) = &config.user_agent {
                options["prefs"] = json!({ "general.useragent.override": agent });
            }
            caps.insert("moz:firefoxOptions".to_string(), options);
        }
        BrowserKind::Safari => {
            if config.headless {
                ::log::warn!("Safari has no headless mode; running with a visible window");
            }
            if config.user_agent.is_some() {
                ::log::warn!("Safari does not accept a user agent override");
            }
        }
    }

    if let Some(proxy) = &proxy {
        if config.browser != BrowserKind::Chrome {
            caps.insert("proxy".to_string(), proxy.capability());
        }
    }

    caps
}

struct ProxyEndpoint {
    scheme: String,
    address: String,
}

impl ProxyEndpoint {
    fn capability(&self) -> Value {
        if self.scheme.starts_with("socks") {
            let version = if self.scheme == "socks4" { 4 } else { 5 };
            json!({
                "proxyType": "manual",
                "socksProxy": self.address,
                "socksVersion": version,
            })
        } else {
            json!({
                "proxyType": "manual",
                "httpProxy": self.address,
                "sslProxy": self.address,
            })
        }
    }
}

fn proxy_endpoint(proxy: &ProxyConfig) -> Option<ProxyEndpoint> {
    let server = if proxy.server.contains("://") {
        proxy.server.clone()
    } else {
        format!("http://{}", proxy.server)
    };

    let parsed = match Url::parse(&server) {
        Ok(parsed) => parsed,
        Err(e) => {
            ::log::warn!("Ignoring proxy '{}': {}", proxy.server, e);
            return None;
        }
    };
    let host = parsed.host_str()?;
    let address = match parsed.port_or_known_default() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Some(ProxyEndpoint {
        scheme: parsed.scheme().to_string(),
        address,
    })
}
