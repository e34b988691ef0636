use crate::config::{CrawlConfig, WaitPolicy};
use crate::driver::DriverFactory;
use crate::driver::mock::{MockPage, MockSite};
use crate::error::ExtractionError;
use crate::parsers::{
    Extractor, HtmlExtractor, HtmlLinkFinder, LinkFinder, ScriptExtractor, ScriptLinkFinder,
};

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/";

    fn site() -> MockSite {
        let mut page = MockPage::titled("Example").with_links(&["/about", "mailto:a@b.c"]);
        page.body_text = format!("Intro\n\n\n{}", "x".repeat(50));
        page.meta_tags = vec![("description".to_string(), "Example site".to_string())];
        MockSite::new(vec![(URL, page)])
    }

    #[tokio::test]
    async fn test_script_extractor_truncates_body() {
        let site = site();
        let mut driver = site.launch(&CrawlConfig::default()).await.unwrap();
        let page = driver.navigate(URL, WaitPolicy::DomContentLoaded).await.unwrap();

        let fields = ScriptExtractor::new(10)
            .extract(driver.as_mut(), &page)
            .await
            .unwrap();
        assert_eq!(fields.title, "Example");
        assert_eq!(fields.body_text, "Intro\n\nxxx...");
        assert_eq!(fields.meta_tags["description"], "Example site");
        assert!(fields.extra.is_empty());
    }

    #[tokio::test]
    async fn test_script_link_finder_returns_raw_links() {
        let site = site();
        let mut driver = site.launch(&CrawlConfig::default()).await.unwrap();
        let page = driver.navigate(URL, WaitPolicy::DomContentLoaded).await.unwrap();

        let links = ScriptLinkFinder
            .discover_links(driver.as_mut(), &page, URL)
            .await
            .unwrap();
        assert_eq!(links, vec!["/about", "mailto:a@b.c"]);
    }

    #[tokio::test]
    async fn test_html_strategies_read_the_dom() {
        let site = site();
        let mut driver = site.launch(&CrawlConfig::default()).await.unwrap();
        let page = driver.navigate(URL, WaitPolicy::DomContentLoaded).await.unwrap();

        let fields = HtmlExtractor::new(1000)
            .extract(driver.as_mut(), &page)
            .await
            .unwrap();
        assert_eq!(fields.title, "Example");
        assert!(fields.body_text.starts_with("Intro xxx"));
        assert_eq!(fields.meta_tags["description"], "Example site");

        let links = HtmlLinkFinder
            .discover_links(driver.as_mut(), &page, URL)
            .await
            .unwrap();
        assert_eq!(links, vec!["/about", "mailto:a@b.c"]);
    }

    #[tokio::test]
    async fn test_script_failure_is_an_extraction_error() {
        let mut page = MockPage::titled("Broken");
        page.script_error = true;
        let site = MockSite::new(vec![(URL, page)]);
        let mut driver = site.launch(&CrawlConfig::default()).await.unwrap();
        let page = driver.navigate(URL, WaitPolicy::DomContentLoaded).await.unwrap();

        let err = ScriptExtractor::new(1000)
            .extract(driver.as_mut(), &page)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Script(_)));
    }
}
