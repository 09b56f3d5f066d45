//! Crawl engine: fetching, extraction pipeline, and the crawl loop

mod engine;
mod fetcher;
pub mod pipeline;

pub use engine::{CrawlEngine, CrawlHandle, EngineState};
pub use fetcher::{FetchedPage, HttpFetcher, PageFetcher};
