use crate::parsers::html;

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html>
        <head>
            <title>  Example
                Domain </title>
            <meta name="description" content="An example page">
            <meta property="og:title" content="Example OG">
            <meta charset="utf-8">
            <meta name="robots">
        </head>
        <body>
            <p>Hello, world!</p>
            <a href="/about">About</a>
            <a href="https://other.com/">Other</a>
            <a name="anchor-without-href">Nothing</a>
        </body>
    </html>"#;

    #[test]
    fn test_parse_title_and_text() {
        let result = html::parse(PAGE);
        assert_eq!(result.title, "Example Domain");
        assert_eq!(result.text, "Hello, world! About Other Nothing");
    }

    #[test]
    fn test_parse_meta_tags() {
        let result = html::parse(PAGE);
        assert_eq!(result.meta_tags.len(), 3);
        assert_eq!(result.meta_tags["description"], "An example page");
        assert_eq!(result.meta_tags["og:title"], "Example OG");
        assert_eq!(result.meta_tags["robots"], "");
    }

    #[test]
    fn test_parse_links_keeps_raw_targets() {
        let result = html::parse(PAGE);
        assert_eq!(result.links, vec!["/about", "https://other.com/"]);
    }

    #[test]
    fn test_parse_empty_document() {
        let result = html::parse("");
        assert_eq!(result, html::ParsedDocument::default());
    }
}
