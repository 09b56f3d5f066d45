//! Configuration loading and validation
//!
//! The configuration is a TOML file declaring the crawler settings, the seed
//! URLs, and the rule set: each `[[rule]]` binds a URL shape (scheme, host,
//! port, path pattern) to an ordered list of `[[rule.processor]]` extraction
//! steps and a record sink.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{Config, CrawlerConfig, OutputConfig, ProcessorConfig, RuleConfig};
pub use validation::validate;
