use regex::Regex;
use std::collections::HashSet;
use url::Url;

use crate::config::CrawlConfig;
use crate::error::ConfigError;

/// Static assets never worth opening in a browser tab
const ASSET_PATTERN: &str = r"(?i)\.(jpg|jpeg|png|gif|webp|css|js|ico|svg|woff|woff2|ttf|eot|pdf|zip)(?:$|\?)";

/// Canonicalize a link found on `base` and decide whether it may be crawled.
///
/// Relative links are resolved against `base`. Returns `None` for links that
/// do not parse, use a scheme other than http(s) (`javascript:`, `mailto:`,
/// `tel:`, ...), or point at a different network location (host and explicit
/// port) than `base`.
pub fn normalize_link(raw: &str, base: &Url) -> Option<String> {
    resolve_link(raw, base, base)
}

/// Like [`normalize_link`], but resolves against the address the page was
/// actually served from while still checking origin against `origin`.
///
/// After a redirect `page` and `origin` differ; relative links follow the
/// redirect target, but a redirect off-site never widens the crawl.
pub fn resolve_link(raw: &str, page: &Url, origin: &Url) -> Option<String> {
    let resolved = page.join(raw.trim()).ok()?;
    if !is_web_scheme(&resolved) {
        return None;
    }
    if !same_origin(&resolved, origin) {
        return None;
    }
    Some(canonicalize(resolved).to_string())
}

/// Strip everything that does not identify the page: fragment, userinfo and
/// an empty query. Scheme/host case and default ports are normalized by `Url`.
pub fn canonicalize(mut url: Url) -> Url {
    url.set_fragment(None);
    let _ = url.set_username("");
    let _ = url.set_password(None);
    if url.query() == Some("") {
        url.set_query(None);
    }
    url
}

fn is_web_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

fn same_origin(url: &Url, base: &Url) -> bool {
    url.host_str().is_some()
        && url.host_str() == base.host_str()
        && url.port() == base.port()
}

/// Pattern-based admission applied to canonical URLs
#[derive(Debug, Default)]
pub struct LinkFilter {
    include_regexes: Vec<Regex>,
    exclude_regexes: Vec<Regex>,
}

impl LinkFilter {
    /// Create a new link filter from configuration
    pub fn new(config: &CrawlConfig) -> Result<Self, ConfigError> {
        let mut include_regexes = Vec::with_capacity(config.include_patterns.len());
        for pattern in &config.include_patterns {
            include_regexes.push(compile(pattern)?);
        }

        let mut exclude_regexes = Vec::with_capacity(config.exclude_patterns.len() + 1);
        if config.skip_assets {
            exclude_regexes.push(compile(ASSET_PATTERN)?);
        }
        for pattern in &config.exclude_patterns {
            exclude_regexes.push(compile(pattern)?);
        }

        Ok(Self {
            include_regexes,
            exclude_regexes,
        })
    }

    /// Determine if a canonical URL passes the include/exclude rules
    pub fn allows(&self, url: &str) -> bool {
        // Exclusions take precedence
        if self.exclude_regexes.iter().any(|regex| regex.is_match(url)) {
            return false;
        }

        self.include_regexes.is_empty() || self.include_regexes.iter().any(|regex| regex.is_match(url))
    }

    /// Normalize and filter the raw links of one page.
    ///
    /// The result holds canonical URLs, each at most once, in the order they
    /// first appear on the page. `page` is where the links were found,
    /// `origin` the site being crawled.
    pub fn admissible_links(&self, raw_links: &[String], page: &Url, origin: &Url) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut admitted = Vec::new();

        for raw in raw_links {
            let Some(canonical) = resolve_link(raw, page, origin) else {
                ::log::trace!("Normalizer rejected: {}", raw);
                continue;
            };
            if !self.allows(&canonical) {
                ::log::debug!("Link filter rejected: {}", canonical);
                continue;
            }
            if seen.insert(canonical.clone()) {
                admitted.push(canonical);
            }
        }

        admitted
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/docs/index.html").unwrap()
    }

    #[test]
    fn test_relative_links_resolve_against_base() {
        assert_eq!(
            normalize_link("guide.html", &base()).as_deref(),
            Some("https://example.com/docs/guide.html")
        );
        assert_eq!(
            normalize_link("/about", &base()).as_deref(),
            Some("https://example.com/about")
        );
        assert_eq!(
            normalize_link("../blog?page=2#top", &base()).as_deref(),
            Some("https://example.com/blog?page=2")
        );
    }

    #[test]
    fn test_fragment_and_empty_query_are_stripped() {
        assert_eq!(
            normalize_link("https://example.com/a#section", &base()).as_deref(),
            Some("https://example.com/a")
        );
        assert_eq!(
            normalize_link("https://example.com/a?", &base()).as_deref(),
            Some("https://example.com/a")
        );
        assert_eq!(
            normalize_link("#only-a-fragment", &base()).as_deref(),
            Some("https://example.com/docs/index.html")
        );
    }

    #[test]
    fn test_off_origin_links_are_rejected() {
        assert_eq!(normalize_link("https://other.com/", &base()), None);
        assert_eq!(normalize_link("https://sub.example.com/", &base()), None);
        assert_eq!(normalize_link("//cdn.example.net/x", &base()), None);
        assert_eq!(normalize_link("https://example.com:8443/x", &base()), None);

        // Same host over plain http is still the same site
        assert_eq!(
            normalize_link("http://example.com/x", &base()).as_deref(),
            Some("http://example.com/x")
        );
    }

    #[test]
    fn test_pseudo_schemes_are_rejected() {
        assert_eq!(normalize_link("javascript:void(0)", &base()), None);
        assert_eq!(normalize_link("mailto:team@example.com", &base()), None);
        assert_eq!(normalize_link("tel:+123456", &base()), None);
        assert_eq!(normalize_link("data:text/html,hi", &base()), None);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = [
            "HTTPS://Example.COM:443/Docs/../a?x=1#frag",
            "/about",
            "https://user:pw@example.com/p?",
            "guide.html?b=2&a=1",
        ];
        for input in inputs {
            let once = normalize_link(input, &base()).unwrap();
            let twice = normalize_link(&once, &base()).unwrap();
            assert_eq!(once, twice, "not idempotent for {input}");
        }
        assert_eq!(
            normalize_link("https://user:pw@example.com/p?", &base()).as_deref(),
            Some("https://example.com/p")
        );
    }

    #[test]
    fn test_admissible_links_dedup_in_page_order() {
        let filter = LinkFilter::default();
        let raw = vec![
            "/b".to_string(),
            "/a".to_string(),
            "/b#again".to_string(),
            "https://other.com/".to_string(),
            "mailto:x@example.com".to_string(),
            "/a".to_string(),
        ];
        let links = filter.admissible_links(&raw, &base(), &base());
        assert_eq!(
            links,
            vec!["https://example.com/b", "https://example.com/a"]
        );
    }

    #[test]
    fn test_links_follow_the_redirect_target() {
        let origin = Url::parse("https://example.com/docs").unwrap();
        let served = Url::parse("https://example.com/docs/").unwrap();
        let raw = vec!["guide".to_string(), "../about".to_string()];

        let links = LinkFilter::default().admissible_links(&raw, &served, &origin);
        assert_eq!(
            links,
            vec!["https://example.com/docs/guide", "https://example.com/about"]
        );

        // Redirected off-site: relative links now point elsewhere and are dropped
        let elsewhere = Url::parse("https://other.com/landing/").unwrap();
        assert!(LinkFilter::default()
            .admissible_links(&raw, &elsewhere, &origin)
            .is_empty());
    }

    #[test]
    fn test_asset_and_pattern_filtering() {
        let config = CrawlConfig {
            include_patterns: vec![r"/docs/".to_string()],
            exclude_patterns: vec![r"/docs/draft/".to_string()],
            ..CrawlConfig::default()
        };
        let filter = LinkFilter::new(&config).unwrap();

        assert!(filter.allows("https://example.com/docs/page.html"));
        assert!(!filter.allows("https://example.com/blog/post"));
        assert!(!filter.allows("https://example.com/docs/draft/page.html"));
        assert!(!filter.allows("https://example.com/docs/logo.PNG"));
        assert!(!filter.allows("https://example.com/docs/logo.png?v=3"));
        assert!(!filter.allows("https://example.com/docs/report.pdf?dl=1"));
        assert!(filter.allows("https://example.com/docs/search?q=report.pdf&page=2"));

        let config = CrawlConfig {
            skip_assets: false,
            ..CrawlConfig::default()
        };
        let filter = LinkFilter::new(&config).unwrap();
        assert!(filter.allows("https://example.com/docs/logo.png"));
    }
}
