pub mod observer;
pub mod web;


pub use observer::{CrawlObserver, LogObserver, PageEvent};
pub use web::{CrawlEngine, CrawlState};
