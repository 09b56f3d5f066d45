//! Rulespider: a rule-driven web crawler
//!
//! This crate implements a crawl engine that matches URLs against a declarative
//! rule set, runs each rule's ordered extraction pipeline over the fetched page,
//! persists the resulting records, and feeds discovered links back into the
//! crawl frontier.

pub mod config;
pub mod counter;
pub mod crawler;
pub mod dedup;
pub mod frontier;
pub mod output;
pub mod rules;
pub mod url;

use thiserror::Error;

/// Main error type for Rulespider operations
#[derive(Debug, Error)]
pub enum SpiderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Visit counter error: {0}")]
    Counter(#[from] CounterError),

    #[error("Sink error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid path pattern in rule {rule}: {source}")]
    InvalidPattern { rule: String, source: regex::Error },

    #[error("Invalid selector in rule {rule}: {message}")]
    InvalidSelector { rule: String, message: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL has no host: {0}")]
    MissingHost(String),
}

/// Errors raised by the page-fetch capability
///
/// Script errors and non-success HTTP statuses do not surface here; the
/// fetcher returns a best-effort page for those. Only a failure to obtain any
/// usable response body is an error.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url} with unreadable body")]
    HttpStatus { url: String, status: u16 },
}

/// Errors raised while loading or persisting the visit counter
#[derive(Debug, Error)]
pub enum CounterError {
    #[error("Failed to read counter file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write counter file {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("Counter file {path} holds a non-numeric value: {value:?}")]
    Corrupt { path: String, value: String },
}

/// Result type alias for Rulespider operations
pub type Result<T> = std::result::Result<T, SpiderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, CrawlHandle, EngineState};
pub use dedup::DedupFilter;
pub use frontier::Frontier;
pub use output::{Record, RecordSink};
pub use rules::{Rule, RuleKey, RuleSet};
pub use url::normalize;
