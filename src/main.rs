use clap::Parser;
use snapcrawl::{CrawlConfig, CrawlError, CrawlResult, Crawler, LogObserver};
use std::process::ExitCode;
use std::sync::Arc;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match CrawlConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                ::log::error!("Failed to load config {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => CrawlConfig::default(),
    };
    config.apply_env();
    args.apply(&mut config);

    println!("Note: crawling requires a WebDriver server (e.g. chromedriver --port=4444).");
    println!("Using {} (set WEBDRIVER_URL to change it)", config.webdriver_url);

    let crawler = Crawler::new(args.url.as_str())
        .with_config(config)
        .with_observer(Arc::new(LogObserver));

    match crawler.run().await {
        Ok(result) => {
            print_summary(&result);
            ExitCode::SUCCESS
        }
        Err(CrawlError::Persistence { result, failures }) => {
            for failure in &failures {
                ::log::error!("{}", failure);
            }
            print_summary(&result);
            ExitCode::from(2)
        }
        Err(e) => {
            ::log::error!("Crawl failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_summary(result: &CrawlResult) {
    println!(
        "Crawled {} pages (max depth {}), {} failed",
        result.metadata.urls_crawled,
        result.metadata.max_depth,
        result.failures().count()
    );
    for record in &result.data {
        match &record.extraction_error {
            Some(error) => println!("  ! {} ({})", record.url, error),
            None => println!("  - {} {}", record.url, record.title),
        }
    }
}
